/// Application name
pub const APP_NAME: &str = "Scribe";

/// Backend config keys persisted through `save_config` / `get_config_value`
pub const KEY_SELECTED_TEXT_MODEL: &str = "selected_text_model";
pub const KEY_SELECTED_IMAGE_MODEL: &str = "selected_image_model";
pub const KEY_IMAGE_SIZE: &str = "image_size";
pub const KEY_THEME_MODE: &str = "theme_mode";
pub const KEY_CUSTOM_PROMPTS: &str = "custom_prompts";
pub const KEY_ANALYTICS_AI_MODEL: &str = "analytics_ai_model";
pub const KEY_HEADLESS_MODE: &str = "headless_mode";

/// Every key the client loads on startup.
pub const CONFIG_KEYS: [&str; 7] = [
    KEY_SELECTED_TEXT_MODEL,
    KEY_SELECTED_IMAGE_MODEL,
    KEY_IMAGE_SIZE,
    KEY_THEME_MODE,
    KEY_CUSTOM_PROMPTS,
    KEY_ANALYTICS_AI_MODEL,
    KEY_HEADLESS_MODE,
];

/// Keys kept in the local store only; they never go through `save_config`.
pub const LOCAL_KEY_MCP_AUTO_START: &str = "mcp_auto_start";
pub const LOCAL_KEY_MCP_PORT: &str = "mcp_port";

/// Default automation-protocol (MCP) server port
pub const DEFAULT_MCP_PORT: u16 = 8001;

/// Default HTTP API server port
pub const DEFAULT_API_PORT: u16 = 8080;

/// MCP status poll interval in milliseconds
pub const MCP_POLL_INTERVAL_MS: u64 = 5_000;

/// API status poll interval in milliseconds
pub const API_POLL_INTERVAL_MS: u64 = 2_000;

/// Bounds for each dimension of a generated image, in pixels
pub const IMAGE_DIMENSION_MIN: u32 = 256;
pub const IMAGE_DIMENSION_MAX: u32 = 2048;

/// Dimension used when custom size input cannot be parsed
pub const IMAGE_DIMENSION_FALLBACK: u32 = 1024;

/// Image sizes offered as presets
pub const PRESET_IMAGE_SIZES: [&str; 5] = [
    "256x256",
    "512x512",
    "1024x1024",
    "1024x1792",
    "1792x1024",
];

/// Maximum number of images attached to one post
pub const MAX_POST_IMAGES: usize = 9;

/// Prefix of the `start_login_process` reply when the account is still signed in
pub const ALREADY_LOGGED_IN_PREFIX: &str = "already_logged_in:";

/// Success code in the trends envelope
pub const TRENDS_OK_CODE: i64 = 200;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    IMAGE_DIMENSION_FALLBACK, IMAGE_DIMENSION_MAX, IMAGE_DIMENSION_MIN, PRESET_IMAGE_SIZES,
};
use crate::error::ParseError;

/// A bound publishing-platform account. `phone` is the natural key used by
/// most remote operations; `id` scopes drafts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub nickname: String,
    pub phone: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Text,
    Image,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            other => Err(ParseError::ModelType(other.to_string())),
        }
    }
}

/// A model offered by a provider. Unique by `name` within its provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub model_type: ModelType,
}

impl AiModel {
    pub fn new(name: impl Into<String>, model_type: ModelType) -> Self {
        Self {
            id: None,
            name: name.into(),
            model_type,
        }
    }
}

/// An AI provider and the models it owns. `id` is assigned by the backend.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiProvider {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub models: Vec<AiModel>,
}

impl AiProvider {
    pub fn new(name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            api_key: api_key.into(),
            base_url: None,
            models: Vec::new(),
        }
    }

    pub fn with_model(mut self, name: impl Into<String>, model_type: ModelType) -> Self {
        self.models.push(AiModel::new(name, model_type));
        self
    }

    /// Find a model by exact name, whatever its type.
    pub fn model(&self, name: &str) -> Option<&AiModel> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn has_model_of_type(&self, model_type: ModelType) -> bool {
        self.models.iter().any(|m| m.model_type == model_type)
    }
}

// api_key never reaches logs
impl fmt::Debug for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiProvider")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .finish()
    }
}

/// A stored reference to a provider/model pair. It is not validated on
/// write; whether it still points at a live model is decided on every read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ModelSelection {
    pub provider_id: i64,
    pub model_name: String,
}

impl ModelSelection {
    pub fn new(provider_id: i64, model_name: impl Into<String>) -> Self {
        Self {
            provider_id,
            model_name: model_name.into(),
        }
    }
}

/// A post. With `id == None` it has never been saved; otherwise it aliases a
/// persisted draft.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, rename = "coverImage")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Post {
    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    /// Merge every field present in `patch` into this post.
    pub fn apply(&mut self, patch: PostPatch) {
        if let Some(id) = patch.id {
            self.id = id;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
        if let Some(cover) = patch.cover_image {
            self.cover_image = cover;
        }
    }
}

/// Partial update for the current post. Outer `None` leaves a field alone;
/// for the optional fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    pub id: Option<Option<i64>>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub images: Option<Vec<String>>,
    pub cover_image: Option<Option<String>>,
}

impl PostPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn images(mut self, images: Vec<String>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn cover_image(mut self, cover: Option<String>) -> Self {
        self.cover_image = Some(cover);
        self
    }

    pub fn id(mut self, id: Option<i64>) -> Self {
        self.id = Some(id);
        self
    }

    /// A patch that copies every editable field of `post`, including its id.
    pub fn from_post(post: &Post) -> Self {
        Self {
            id: Some(post.id),
            title: Some(post.title.clone()),
            content: Some(post.content.clone()),
            images: Some(post.images.clone()),
            cover_image: Some(post.cover_image.clone()),
        }
    }
}

/// A reusable user-defined instruction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prompt {
    pub id: String,
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptPatch {
    pub name: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(ParseError::ThemeMode(other.to_string())),
        }
    }
}

/// Requested size for generated images, serialized as `WIDTHxHEIGHT`.
///
/// Every constructor clamps each dimension to
/// [`IMAGE_DIMENSION_MIN`, `IMAGE_DIMENSION_MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    width: u32,
    height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: clamp_dimension(width),
            height: clamp_dimension(height),
        }
    }

    /// Build a size from raw text inputs. Each input's leading integer is
    /// clamped; input with no number, or zero, falls back to
    /// [`IMAGE_DIMENSION_FALLBACK`].
    pub fn from_inputs(width: &str, height: &str) -> Self {
        Self::new(parse_dimension(width), parse_dimension(height))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_preset(&self) -> bool {
        let text = self.to_string();
        PRESET_IMAGE_SIZES.contains(&text.as_str())
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::new(IMAGE_DIMENSION_FALLBACK, IMAGE_DIMENSION_FALLBACK)
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ImageSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once('x')
            .ok_or_else(|| ParseError::ImageSize(s.to_string()))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| ParseError::ImageSize(s.to_string()))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| ParseError::ImageSize(s.to_string()))?;
        Ok(Self::new(width, height))
    }
}

fn clamp_dimension(value: u32) -> u32 {
    value.clamp(IMAGE_DIMENSION_MIN, IMAGE_DIMENSION_MAX)
}

/// Read the leading integer of `input`, saturating on overflow. No number,
/// or zero, gives the fallback; anything else is clamped.
fn parse_dimension(input: &str) -> u32 {
    let input = input.trim();
    let (negative, rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit);

    let mut seen = false;
    let mut value: i64 = 0;
    for d in digits {
        seen = true;
        value = value.saturating_mul(10).saturating_add(i64::from(d - b'0'));
    }
    if negative {
        value = -value;
    }

    match value {
        _ if !seen => IMAGE_DIMENSION_FALLBACK,
        0 => IMAGE_DIMENSION_FALLBACK,
        n => n.clamp(i64::from(IMAGE_DIMENSION_MIN), i64::from(IMAGE_DIMENSION_MAX)) as u32,
    }
}

/// The two backend-owned background services the client can start and stop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Automation-protocol server
    Mcp,
    /// HTTP API server
    Api,
}

impl ServiceKind {
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Mcp => crate::constants::DEFAULT_MCP_PORT,
            Self::Api => crate::constants::DEFAULT_API_PORT,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mcp => f.write_str("mcp"),
            Self::Api => f.write_str("api"),
        }
    }
}

/// Client mirror of a backend service's process state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceStatus {
    pub is_running: bool,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ServiceStatus {
    pub fn stopped(port: u16) -> Self {
        Self {
            is_running: false,
            port,
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendItem {
    #[serde(default)]
    pub id: Option<String>,
    pub index: i64,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub user_face: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub sorting: Option<serde_json::Value>,
    #[serde(default)]
    pub time: Option<String>,
}

/// Trend lists keyed by source platform.
pub type TrendData = BTreeMap<String, Vec<TrendItem>>;

/// Envelope returned by the trends aggregation fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendsEnvelope {
    pub code: i64,
    #[serde(default)]
    pub data: Option<TrendData>,
}

/// Outcome of a per-model check. A failed check is still a reply, with
/// `success` false and the provider's message in `error_message`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelTestResult {
    pub model_name: String,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

/// Creator dashboard figures of one account over the last statistics
/// period. Rates are percentages.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserAnalytics {
    pub following_count: i32,
    pub followers_count: i32,
    pub likes_and_collections: i32,

    pub exposure_count: i32,
    pub view_count: i32,
    pub cover_click_rate: f32,
    pub video_completion_rate: f32,

    pub like_count: i32,
    pub comment_count: i32,
    pub collection_count: i32,
    pub share_count: i32,

    pub net_follower_growth: i32,
    pub new_followers: i32,
    pub unfollowers: i32,
    pub profile_visitors: i32,

    /// Statistics window as displayed, e.g. `01-08 to 02-06`.
    pub period: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_size_clamps_each_dimension() {
        assert_eq!(ImageSize::new(100, 5000).to_string(), "256x2048");
        assert_eq!(ImageSize::from_inputs("100", "1024").width(), 256);
        assert_eq!(ImageSize::from_inputs("5000", "1024").width(), 2048);
    }

    #[test]
    fn image_size_unparsable_input_falls_back() {
        let size = ImageSize::from_inputs("abc", "");
        assert_eq!(size.to_string(), "1024x1024");
        assert_eq!(ImageSize::from_inputs("0", "-").to_string(), "1024x1024");
    }

    #[test]
    fn image_size_clamps_negative_and_huge_input() {
        let size = ImageSize::from_inputs("5000000000", "-5");
        assert_eq!(size.to_string(), "2048x256");
        assert_eq!(
            ImageSize::from_inputs("99999999999999999999999", " 640px ").to_string(),
            "2048x640"
        );
    }

    #[test]
    fn image_size_parses_and_prints_unchanged() {
        let size: ImageSize = "1024x1024".parse().unwrap();
        assert_eq!(size.to_string(), "1024x1024");
        assert!(size.is_preset());

        let custom: ImageSize = "768x1280".parse().unwrap();
        assert!(!custom.is_preset());
        assert!("1024".parse::<ImageSize>().is_err());
    }

    #[test]
    fn selection_uses_camel_case_on_the_wire() {
        let json = serde_json::to_string(&ModelSelection::new(3, "gpt-x")).unwrap();
        assert_eq!(json, r#"{"providerId":3,"modelName":"gpt-x"}"#);
    }

    #[test]
    fn post_patch_clears_cover() {
        let mut post = Post {
            cover_image: Some("a.png".into()),
            ..Default::default()
        };
        post.apply(PostPatch::default().title("t").cover_image(None));
        assert_eq!(post.title, "t");
        assert_eq!(post.cover_image, None);
    }

    #[test]
    fn provider_debug_redacts_key() {
        let provider = AiProvider::new("openai", "sk-secret");
        assert!(!format!("{provider:?}").contains("sk-secret"));
    }

    #[test]
    fn theme_mode_round_trips_through_str() {
        for mode in [ThemeMode::Light, ThemeMode::Dark, ThemeMode::System] {
            assert_eq!(mode.as_str().parse::<ThemeMode>().unwrap(), mode);
        }
        assert!("sepia".parse::<ThemeMode>().is_err());
    }
}

//! User preferences, each persisted under its own config key.

use scribe_shared::constants::PRESET_IMAGE_SIZES;
use scribe_shared::{ImageSize, ThemeMode};

use crate::providers::{Selection, SelectionSlot};
use crate::state::Store;
use crate::sync::{keys, PendingWrite};

/// The image sizes offered without custom input.
pub fn preset_image_sizes() -> Vec<ImageSize> {
    PRESET_IMAGE_SIZES
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}

impl Store {
    pub fn theme_mode(&self) -> ThemeMode {
        self.config().get(&keys::THEME_MODE)
    }

    pub fn set_theme_mode(&self, mode: ThemeMode) -> PendingWrite {
        self.config().set(&keys::THEME_MODE, &mode)
    }

    pub fn image_size(&self) -> ImageSize {
        self.config().get(&keys::IMAGE_SIZE)
    }

    pub fn set_image_size(&self, size: ImageSize) -> PendingWrite {
        self.config().set(&keys::IMAGE_SIZE, &size)
    }

    /// Set a custom size from raw text inputs. Unparsable input becomes the
    /// fallback dimension; everything is clamped.
    pub fn set_custom_image_size(&self, width: &str, height: &str) -> PendingWrite {
        self.set_image_size(ImageSize::from_inputs(width, height))
    }

    /// Whether the automation browser runs without a window.
    pub fn headless_mode(&self) -> bool {
        self.config().get(&keys::HEADLESS_MODE)
    }

    pub fn set_headless_mode(&self, headless: bool) -> PendingWrite {
        self.config().set(&keys::HEADLESS_MODE, &headless)
    }

    pub fn analytics_model(&self) -> Selection {
        self.selection(SelectionSlot::Analytics)
    }
}

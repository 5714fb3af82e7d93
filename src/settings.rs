//! Game settings
//!
//! Read-only configuration for timing and grid size. Nothing here is saved
//! between sessions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::game::{SequenceError, TileSet};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tile_count must be at least 1")]
    NoTiles,
    #[error("initial_length must be at least 1")]
    ZeroInitialLength,
    #[error("highlight_ms ({highlight_ms}) must be shorter than slot_ms ({slot_ms})")]
    HighlightTooLong { highlight_ms: u64, slot_ms: u64 },
    #[error("{field} ({value} ms) exceeds the {max} ms limit")]
    DurationTooLong { field: &'static str, value: u64, max: u64 },
}

/// Game configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tiles in the grid, numbered from 1
    pub tile_count: u8,
    /// Sequence length for the first round and after a loss
    pub initial_length: usize,

    // === Timing (ms) ===
    /// Playback slot per tile
    pub slot_ms: u64,
    /// Lit portion of a slot
    pub highlight_ms: u64,
    /// Click feedback duration
    pub feedback_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tile_count: DEFAULT_TILE_COUNT,
            initial_length: DEFAULT_INITIAL_LENGTH,
            slot_ms: DEFAULT_SLOT_MS,
            highlight_ms: DEFAULT_HIGHLIGHT_MS,
            feedback_ms: DEFAULT_FEEDBACK_MS,
        }
    }
}

impl Settings {
    /// Parse from JSON (missing fields take defaults) and validate
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tile_count == 0 {
            return Err(SettingsError::NoTiles);
        }
        if self.initial_length == 0 {
            return Err(SettingsError::ZeroInitialLength);
        }
        if self.highlight_ms >= self.slot_ms {
            return Err(SettingsError::HighlightTooLong {
                highlight_ms: self.highlight_ms,
                slot_ms: self.slot_ms,
            });
        }
        for (field, value) in [("slot_ms", self.slot_ms), ("feedback_ms", self.feedback_ms)] {
            if value > MAX_DURATION_MS {
                return Err(SettingsError::DurationTooLong {
                    field,
                    value,
                    max: MAX_DURATION_MS,
                });
            }
        }
        Ok(())
    }

    /// Tile set described by `tile_count`
    pub fn tile_set(&self) -> Result<TileSet, SequenceError> {
        TileSet::numbered(self.tile_count)
    }

    /// DOM element holding inline settings JSON
    #[cfg(target_arch = "wasm32")]
    const ELEMENT_ID: &'static str = "memgame-settings";

    /// Load settings from an inline `<script type="application/json">` element (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let json = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(Self::ELEMENT_ID))
            .and_then(|el| el.text_content());

        if let Some(json) = json {
            match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from #{}", Self::ELEMENT_ID);
                    return settings;
                }
                Err(e) => log::warn!("Ignoring #{}: {}", Self::ELEMENT_ID, e),
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Load settings from a JSON file, or defaults when no path is given
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: Option<&std::path::Path>) -> Result<Self, Box<dyn std::error::Error>> {
        match path {
            Some(path) => {
                let json = std::fs::read_to_string(path)?;
                let settings = Self::from_json(&json)?;
                log::info!("Loaded settings from {}", path.display());
                Ok(settings)
            }
            None => {
                log::info!("Using default settings");
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.tile_count, 9);
        assert_eq!(settings.initial_length, 3);
        assert_eq!(settings.slot_ms, 1100);
        assert_eq!(settings.highlight_ms, 1000);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(r#"{"tile_count": 4, "slot_ms": 600, "highlight_ms": 500}"#).unwrap();
        assert_eq!(settings.tile_count, 4);
        assert_eq!(settings.slot_ms, 600);
        assert_eq!(settings.initial_length, 3);
        assert_eq!(settings.tile_set().unwrap().len(), 4);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(
            Settings::from_json(r#"{"tile_count": 0}"#),
            Err(SettingsError::NoTiles)
        ));
        assert!(matches!(
            Settings::from_json(r#"{"initial_length": 0}"#),
            Err(SettingsError::ZeroInitialLength)
        ));
        assert!(matches!(
            Settings::from_json(r#"{"highlight_ms": 1100}"#),
            Err(SettingsError::HighlightTooLong { .. })
        ));
        assert!(matches!(Settings::from_json("not json"), Err(SettingsError::Json(_))));
    }

    #[test]
    fn test_oversized_durations_rejected() {
        let huge_slot = Settings {
            slot_ms: u64::MAX / 2,
            highlight_ms: 1,
            ..Default::default()
        };
        assert!(matches!(
            huge_slot.validate(),
            Err(SettingsError::DurationTooLong { field: "slot_ms", .. })
        ));

        let huge_feedback = Settings {
            feedback_ms: MAX_DURATION_MS + 1,
            ..Default::default()
        };
        assert!(matches!(
            huge_feedback.validate(),
            Err(SettingsError::DurationTooLong { field: "feedback_ms", .. })
        ));

        let at_limit = Settings {
            slot_ms: MAX_DURATION_MS,
            feedback_ms: MAX_DURATION_MS,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());
    }
}

//! Mem Game - A Simon-style tile memory game
//!
//! Core modules:
//! - `game`: Deterministic round state machine (sequence, timeline, controller)
//! - `settings`: Timing and grid configuration

pub mod game;
pub mod settings;

pub use game::{GameEvent, Phase, RoundController, Tile, TileSet};
pub use settings::{Settings, SettingsError};

/// Game configuration constants
pub mod consts {
    /// Tiles in the default grid (`box-1` .. `box-9`)
    pub const DEFAULT_TILE_COUNT: u8 = 9;
    /// Sequence length of the first round and after any loss
    pub const DEFAULT_INITIAL_LENGTH: usize = 3;

    /// Playback slot per tile (ms)
    pub const DEFAULT_SLOT_MS: u64 = 1100;
    /// Time a tile stays lit inside its slot (ms), must be < slot
    pub const DEFAULT_HIGHLIGHT_MS: u64 = 1000;
    /// Correct/incorrect feedback duration after a click (ms)
    pub const DEFAULT_FEEDBACK_MS: u64 = 1000;
    /// Upper bound for any configured duration (ms)
    pub const MAX_DURATION_MS: u64 = 60_000;

    /// DOM id prefix for tiles
    pub const TILE_ID_PREFIX: &str = "box-";
}

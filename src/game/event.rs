//! Events emitted by the round controller for the presentation layer

use serde::Serialize;

use super::tile::Tile;

/// Presentation-facing outcome of a controller step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum GameEvent {
    /// Light a tile during playback
    Highlight { tile: Tile, slot: usize },
    /// Turn a playback tile back off
    Unhighlight { tile: Tile, slot: usize },
    /// Player clicked the expected tile
    CorrectFeedback { tile: Tile },
    /// Player clicked the wrong tile
    IncorrectFeedback { tile: Tile },
    /// Feedback highlight expired
    FeedbackCleared { tile: Tile },
    RoundWon { streak: u32, best_streak: u32 },
    RoundLost,
    /// Tiles are clickable
    InputEnabled,
    InputDisabled,
    /// Start control disabled for the duration of a round
    StartDisabled,
    /// Start control re-armed
    StartEnabled,
}

impl GameEvent {
    /// One JSON object per event, for log lines
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"kind":"Error","error":"{e}"}}"#))
    }
}

/// Receiver for controller events
pub trait EventSink {
    fn emit(&mut self, event: GameEvent);
}

impl EventSink for Vec<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        self.push(event);
    }
}

//! Deterministic game core
//!
//! All gameplay logic lives here. This module must stay pure:
//! - Virtual time only (callers advance the clock)
//! - Seeded RNG only
//! - No DOM or platform dependencies

pub mod controller;
pub mod event;
pub mod sequence;
pub mod tile;
pub mod timeline;

pub use controller::{GameState, Phase, RoundController, RoundState};
pub use event::{EventSink, GameEvent};
pub use sequence::{Sequence, SequenceError, generate, random_int_inclusive};
pub use tile::{Tile, TileSet};
pub use timeline::{ScheduledAction, TimerAction, TimerId, Timeline};

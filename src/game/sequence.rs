//! Random tile sequence generation

use rand::Rng;
use thiserror::Error;

use super::tile::{Tile, TileSet};

/// Ordered tiles the player must reproduce
pub type Sequence = Vec<Tile>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("sequence length must be at least 1")]
    EmptyLength,
    #[error("tile set must contain at least one tile")]
    EmptyTileSet,
}

/// Uniform integer in `[min, max]`, both ends inclusive
pub fn random_int_inclusive<R: Rng>(rng: &mut R, min: usize, max: usize) -> usize {
    rng.random_range(min..=max)
}

/// Draw `length` tiles independently and uniformly from `tiles` (repeats allowed)
pub fn generate<R: Rng>(
    length: usize,
    tiles: &TileSet,
    rng: &mut R,
) -> Result<Sequence, SequenceError> {
    if length == 0 {
        return Err(SequenceError::EmptyLength);
    }
    let last = tiles.len().checked_sub(1).ok_or(SequenceError::EmptyTileSet)?;

    let sequence = (0..length)
        .map(|_| {
            let index = random_int_inclusive(rng, 0, last);
            tiles.get(index).ok_or(SequenceError::EmptyTileSet)
        })
        .collect::<Result<Sequence, _>>()?;

    log::debug!("Generated sequence: {:?}", sequence);
    Ok(sequence)
}

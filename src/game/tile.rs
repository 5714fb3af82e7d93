//! Tile identifiers and the fixed set a game draws from

use std::fmt;

use serde::{Deserialize, Serialize};

use super::sequence::SequenceError;
use crate::consts::TILE_ID_PREFIX;

/// One clickable target in the grid, numbered from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tile(pub u8);

impl Tile {
    pub fn number(self) -> u8 {
        self.0
    }

    /// DOM element id for this tile (`box-N`)
    pub fn element_id(self) -> String {
        format!("{}{}", TILE_ID_PREFIX, self.0)
    }

    /// Parse a `box-N` element id back into a tile
    pub fn from_element_id(id: &str) -> Option<Self> {
        id.strip_prefix(TILE_ID_PREFIX)?.parse().ok().map(Tile)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", TILE_ID_PREFIX, self.0)
    }
}

/// Non-empty set of distinct tiles, in a stable order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileSet {
    tiles: Vec<Tile>,
}

impl TileSet {
    /// Build a set from arbitrary tiles (duplicates are dropped, order kept)
    pub fn new(tiles: impl IntoIterator<Item = Tile>) -> Result<Self, SequenceError> {
        let mut unique: Vec<Tile> = Vec::new();
        for tile in tiles {
            if !unique.contains(&tile) {
                unique.push(tile);
            }
        }
        if unique.is_empty() {
            return Err(SequenceError::EmptyTileSet);
        }
        Ok(Self { tiles: unique })
    }

    /// Tiles numbered `1..=count`
    pub fn numbered(count: u8) -> Result<Self, SequenceError> {
        Self::new((1..=count).map(Tile))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, tile: Tile) -> bool {
        self.tiles.contains(&tile)
    }

    /// Tile at `index` in set order
    pub fn get(&self, index: usize) -> Option<Tile> {
        self.tiles.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Tile> + '_ {
        self.tiles.iter().copied()
    }
}

impl Default for TileSet {
    fn default() -> Self {
        Self {
            tiles: (1..=crate::consts::DEFAULT_TILE_COUNT).map(Tile).collect(),
        }
    }
}

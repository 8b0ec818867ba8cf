//! Battle grid with hex tiles, occupancy and line of sight
//!
//! The grid owns a position -> tile index built at construction. The index
//! is rebuilt explicitly whenever tiles are added or removed; occupancy and
//! terrain edits never touch it.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::hex::HexPosition;
use crate::battle::terrain::Terrain;
use crate::core::error::{BattleError, Result};
use crate::core::types::UnitId;

/// A single hex on the battle grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HexTile {
    pub position: HexPosition,
    pub terrain: Terrain,
    pub elevation: i32,
    pub passable: bool,
    pub occupant: Option<UnitId>,
    pub cover: i32,
}

impl HexTile {
    pub fn new(position: HexPosition, terrain: Terrain) -> Self {
        Self {
            position,
            terrain,
            elevation: 0,
            passable: true,
            occupant: None,
            cover: terrain.cover_value(),
        }
    }

    /// Movement cost to enter, or None when the tile can't be entered at all
    pub fn movement_cost(&self) -> Option<u32> {
        self.passable.then(|| self.terrain.movement_cost())
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    /// Does this tile block sight for a line passing over it?
    pub fn blocks_sight(&self, elevation_threshold: i32) -> bool {
        !self.passable || self.elevation > elevation_threshold
    }
}

/// The full battle grid
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "GridData")]
pub struct BattleGrid {
    tiles: Vec<HexTile>,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    index: AHashMap<HexPosition, usize>,
}

/// Serialized form of a grid; the index is rebuilt on load
#[derive(Deserialize)]
struct GridData {
    tiles: Vec<HexTile>,
    width: u32,
    height: u32,
}

impl From<GridData> for BattleGrid {
    fn from(data: GridData) -> Self {
        let mut grid = Self {
            tiles: data.tiles,
            width: data.width,
            height: data.height,
            index: AHashMap::new(),
        };
        grid.rebuild_index();
        grid
    }
}

impl BattleGrid {
    /// Create a width x height parallelogram of plains (q in 0..width, r in 0..height)
    pub fn new(width: u32, height: u32) -> Self {
        let mut tiles = Vec::with_capacity((width * height) as usize);
        for r in 0..height as i32 {
            for q in 0..width as i32 {
                tiles.push(HexTile::new(HexPosition::new(q, r), Terrain::Plains));
            }
        }

        let mut grid = Self {
            tiles,
            width,
            height,
            index: AHashMap::new(),
        };
        grid.rebuild_index();
        grid
    }

    /// Build a grid from tiles produced by a terrain generator
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<HexTile>) -> Result<Self> {
        let mut grid = Self {
            tiles,
            width,
            height,
            index: AHashMap::new(),
        };
        grid.rebuild_index();
        if grid.index.len() != grid.tiles.len() {
            return Err(BattleError::InvalidGrid(format!(
                "{} tiles share a position",
                grid.tiles.len() - grid.index.len()
            )));
        }
        Ok(grid)
    }

    /// Rebuild the position index; required after any structural change
    pub fn rebuild_index(&mut self) {
        self.index = self
            .tiles
            .iter()
            .enumerate()
            .map(|(i, tile)| (tile.position, i))
            .collect();
    }

    /// Add or replace a tile
    pub fn insert_tile(&mut self, tile: HexTile) {
        match self.index.get(&tile.position).copied() {
            Some(i) => self.tiles[i] = tile,
            None => {
                self.tiles.push(tile);
                self.rebuild_index();
            }
        }
    }

    /// Remove a tile from the grid entirely
    pub fn remove_tile(&mut self, pos: HexPosition) -> Option<HexTile> {
        let i = *self.index.get(&pos)?;
        let tile = self.tiles.remove(i);
        self.rebuild_index();
        Some(tile)
    }

    pub fn tiles(&self) -> &[HexTile] {
        &self.tiles
    }

    pub fn tile(&self, pos: HexPosition) -> Option<&HexTile> {
        self.index.get(&pos).map(|&i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, pos: HexPosition) -> Option<&mut HexTile> {
        let i = self.index.get(&pos).copied()?;
        self.tiles.get_mut(i)
    }

    pub fn contains(&self, pos: HexPosition) -> bool {
        self.index.contains_key(&pos)
    }

    pub fn positions(&self) -> impl Iterator<Item = HexPosition> + '_ {
        self.tiles.iter().map(|t| t.position)
    }

    pub fn is_passable(&self, pos: HexPosition) -> bool {
        self.tile(pos).is_some_and(|t| t.passable)
    }

    pub fn occupant(&self, pos: HexPosition) -> Option<UnitId> {
        self.tile(pos).and_then(|t| t.occupant)
    }

    pub fn is_occupied(&self, pos: HexPosition) -> bool {
        self.occupant(pos).is_some()
    }

    /// Can a unit stand here right now?
    pub fn is_free(&self, pos: HexPosition) -> bool {
        self.tile(pos).is_some_and(|t| t.passable && !t.is_occupied())
    }

    pub fn movement_cost(&self, pos: HexPosition) -> Option<u32> {
        self.tile(pos).and_then(|t| t.movement_cost())
    }

    pub fn set_occupant(&mut self, pos: HexPosition, occupant: Option<UnitId>) {
        if let Some(tile) = self.tile_mut(pos) {
            tile.occupant = occupant;
        }
    }

    /// Set terrain at a position (cover follows the terrain default)
    pub fn set_terrain(&mut self, pos: HexPosition, terrain: Terrain) {
        if let Some(tile) = self.tile_mut(pos) {
            tile.terrain = terrain;
            tile.cover = terrain.cover_value();
        }
    }

    pub fn set_elevation(&mut self, pos: HexPosition, elevation: i32) {
        if let Some(tile) = self.tile_mut(pos) {
            tile.elevation = elevation;
        }
    }

    pub fn set_passable(&mut self, pos: HexPosition, passable: bool) {
        if let Some(tile) = self.tile_mut(pos) {
            tile.passable = passable;
        }
    }

    /// Check line of sight between two hexes
    ///
    /// Every intermediate hex of the line is sampled; the endpoints never
    /// block. Hexes missing from the grid don't block.
    pub fn has_line_of_sight(
        &self,
        from: HexPosition,
        to: HexPosition,
        elevation_threshold: i32,
    ) -> bool {
        let line = from.line_to(&to);

        for pos in line.iter().skip(1).take(line.len().saturating_sub(2)) {
            if let Some(tile) = self.tile(*pos) {
                if tile.blocks_sight(elevation_threshold) {
                    return false;
                }
            }
        }

        true
    }

    /// Hex steps from a position to the nearest map edge
    pub fn edge_distance(&self, pos: HexPosition) -> u32 {
        let max_q = self.width as i32 - 1;
        let max_r = self.height as i32 - 1;
        pos.q
            .min(max_q - pos.q)
            .min(pos.r)
            .min(max_r - pos.r)
            .max(0) as u32
    }
}

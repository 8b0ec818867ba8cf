//! Hex coordinate system for battle maps (axial coordinates)
//!
//! Uses axial coordinates (q, r) for easy neighbor calculation. The derived
//! cube coordinate s = -q - r is used for distance, rounding and direction
//! classification.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Axial hex coordinate for battle map
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct HexPosition {
    pub q: i32,
    pub r: i32,
}

/// Nudge applied to both line endpoints so that exact .5 ties always round
/// the same way
const LINE_EPSILON: (f64, f64, f64) = (1e-6, 2e-6, -3e-6);

impl HexPosition {
    pub const ORIGIN: HexPosition = HexPosition { q: 0, r: 0 };

    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Cube coordinate S (derived from q and r)
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Manhattan distance in cube space, halved
    pub fn distance(&self, other: &Self) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    pub fn neighbor(&self, direction: HexDirection) -> HexPosition {
        *self + direction.offset()
    }

    /// Get all 6 neighboring hex coordinates
    pub fn neighbors(&self) -> [HexPosition; 6] {
        HexDirection::all().map(|d| self.neighbor(d))
    }

    pub fn is_adjacent(&self, other: &Self) -> bool {
        self.distance(other) == 1
    }

    /// Hexes at exactly `radius` from self
    ///
    /// Radius 0 is the center itself; otherwise 6 * radius hexes.
    pub fn ring(&self, radius: u32) -> Vec<HexPosition> {
        self.ring_from(radius, HexDirection::SouthWest)
    }

    /// Ring walk starting at the corner in direction `start`, proceeding
    /// counter-clockwise
    pub fn ring_from(&self, radius: u32, start: HexDirection) -> Vec<HexPosition> {
        if radius == 0 {
            return vec![*self];
        }

        let mut results = Vec::with_capacity(6 * radius as usize);
        let mut hex = *self + start.offset() * radius as i32;
        let start_idx = start.index();
        for side in 0..6 {
            let step = HexDirection::from_index(start_idx + 2 + side);
            for _ in 0..radius {
                results.push(hex);
                hex = hex.neighbor(step);
            }
        }
        results
    }

    /// All hexes within `radius` (inclusive), ordered ring by ring
    pub fn disk(&self, radius: u32) -> Vec<HexPosition> {
        let count = 1 + 3 * radius as usize * (radius as usize + 1);
        let mut results = Vec::with_capacity(count);
        for k in 0..=radius {
            results.extend(self.ring(k));
        }
        results
    }

    /// Get hex coordinates in a line from self to other (inclusive)
    ///
    /// Always `distance + 1` hexes, each adjacent to the previous one.
    pub fn line_to(&self, other: &Self) -> Vec<HexPosition> {
        let n = self.distance(other);
        if n == 0 {
            return vec![*self];
        }

        let (eq, er, es) = LINE_EPSILON;
        let a = (self.q as f64 + eq, self.r as f64 + er, self.s() as f64 + es);
        let b = (other.q as f64 + eq, other.r as f64 + er, other.s() as f64 + es);

        let mut results = Vec::with_capacity(n as usize + 1);
        for i in 0..=n {
            let t = i as f64 / n as f64;
            results.push(Self::cube_round(
                a.0 + (b.0 - a.0) * t,
                a.1 + (b.1 - a.1) * t,
                a.2 + (b.2 - a.2) * t,
            ));
        }
        results
    }

    /// Round fractional cube coordinates to the nearest hex
    ///
    /// The component with the largest rounding error is rebuilt from the
    /// other two so that x + y + z stays 0.
    pub fn cube_round(x: f64, y: f64, z: f64) -> Self {
        let mut rx = x.round();
        let mut ry = y.round();
        let rz = z.round();

        let x_diff = (rx - x).abs();
        let y_diff = (ry - y).abs();
        let z_diff = (rz - z).abs();

        if x_diff > y_diff && x_diff > z_diff {
            rx = -ry - rz;
        } else if y_diff > z_diff {
            ry = -rx - rz;
        }

        Self::new(rx as i32, ry as i32)
    }

    /// Dominant hex direction of the vector from self to `toward`
    ///
    /// Picks the direction with the largest cube dot product; ties go to the
    /// lower direction index. A zero vector maps to East.
    pub fn direction_to(&self, toward: &Self) -> HexDirection {
        let delta = *toward - *self;
        dominant_direction(delta)
    }
}

/// Dominant direction of a cube delta
pub fn dominant_direction(delta: HexPosition) -> HexDirection {
    let mut best = HexDirection::East;
    let mut best_score = i64::MIN;
    for dir in HexDirection::all() {
        let o = dir.offset();
        let score = delta.q as i64 * o.q as i64
            + delta.r as i64 * o.r as i64
            + delta.s() as i64 * o.s() as i64;
        if score > best_score {
            best_score = score;
            best = dir;
        }
    }
    best
}

impl Add for HexPosition {
    type Output = HexPosition;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.q + rhs.q, self.r + rhs.r)
    }
}

impl Sub for HexPosition {
    type Output = HexPosition;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.q - rhs.q, self.r - rhs.r)
    }
}

impl Mul<i32> for HexPosition {
    type Output = HexPosition;
    fn mul(self, rhs: i32) -> Self {
        Self::new(self.q * rhs, self.r * rhs)
    }
}

impl fmt::Display for HexPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

/// Direction enum for hex facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HexDirection {
    #[default]
    East,
    NorthEast,
    NorthWest,
    West,
    SouthWest,
    SouthEast,
}

impl HexDirection {
    /// Get the hex offset for this direction
    pub fn offset(&self) -> HexPosition {
        match self {
            HexDirection::East => HexPosition::new(1, 0),
            HexDirection::NorthEast => HexPosition::new(1, -1),
            HexDirection::NorthWest => HexPosition::new(0, -1),
            HexDirection::West => HexPosition::new(-1, 0),
            HexDirection::SouthWest => HexPosition::new(-1, 1),
            HexDirection::SouthEast => HexPosition::new(0, 1),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            HexDirection::East => 0,
            HexDirection::NorthEast => 1,
            HexDirection::NorthWest => 2,
            HexDirection::West => 3,
            HexDirection::SouthWest => 4,
            HexDirection::SouthEast => 5,
        }
    }

    /// Direction for an index, wrapping modulo 6
    pub fn from_index(index: usize) -> Self {
        Self::all()[index % 6]
    }

    /// Rotate counter-clockwise by `steps` sixths of a turn
    pub fn rotate(&self, steps: usize) -> Self {
        Self::from_index(self.index() + steps)
    }

    /// Get opposite direction
    pub fn opposite(&self) -> Self {
        self.rotate(3)
    }

    /// All directions
    pub fn all() -> [HexDirection; 6] {
        [
            HexDirection::East,
            HexDirection::NorthEast,
            HexDirection::NorthWest,
            HexDirection::West,
            HexDirection::SouthWest,
            HexDirection::SouthEast,
        ]
    }
}

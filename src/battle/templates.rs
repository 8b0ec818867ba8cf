//! Area-of-effect templates
//!
//! Every template expands to a `HexSet`. Sets combine with union,
//! intersection and difference so callers can layer shapes or strip hexes
//! that fail a line-of-sight or blocker test. Malformed parameters expand to
//! an empty set, never an error.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::battle::hex::{dominant_direction, HexDirection, HexPosition};

/// Ordered set of hex positions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexSet(BTreeSet<HexPosition>);

impl HexSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(pos: HexPosition) -> Self {
        Self(BTreeSet::from([pos]))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, pos: &HexPosition) -> bool {
        self.0.contains(pos)
    }

    pub fn insert(&mut self, pos: HexPosition) -> bool {
        self.0.insert(pos)
    }

    pub fn remove(&mut self, pos: &HexPosition) -> bool {
        self.0.remove(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HexPosition> {
        self.0.iter()
    }

    pub fn union(&self, other: &HexSet) -> HexSet {
        Self(self.0.union(&other.0).copied().collect())
    }

    pub fn intersection(&self, other: &HexSet) -> HexSet {
        Self(self.0.intersection(&other.0).copied().collect())
    }

    pub fn difference(&self, other: &HexSet) -> HexSet {
        Self(self.0.difference(&other.0).copied().collect())
    }

    /// Keep only hexes passing the predicate
    pub fn filter(&self, mut keep: impl FnMut(&HexPosition) -> bool) -> HexSet {
        Self(self.0.iter().copied().filter(|p| keep(p)).collect())
    }

    pub fn to_vec(&self) -> Vec<HexPosition> {
        self.0.iter().copied().collect()
    }
}

impl FromIterator<HexPosition> for HexSet {
    fn from_iter<I: IntoIterator<Item = HexPosition>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for HexSet {
    type Item = HexPosition;
    type IntoIter = std::collections::btree_set::IntoIter<HexPosition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a HexSet {
    type Item = &'a HexPosition;
    type IntoIter = std::collections::btree_set::Iter<'a, HexPosition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Cone aperture; each level covers strictly more hexes than the previous
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConeWidth {
    #[default]
    Narrow,
    Normal,
    Wide,
}

impl ConeWidth {
    /// Ring hexes allowed on each side of the center line at distance `k`
    fn half_width(&self, k: u32) -> u32 {
        match self {
            ConeWidth::Narrow => k / 2,
            ConeWidth::Normal => k,
            ConeWidth::Wide => 2 * k,
        }
    }
}

/// Filled disk; negative radius yields nothing
pub fn circle(center: HexPosition, radius: i32) -> HexSet {
    if radius < 0 {
        return HexSet::new();
    }
    center.disk(radius as u32).into_iter().collect()
}

/// Annulus between `min` and `max` (inclusive)
///
/// The origin is present exactly when `include_origin` is set, whatever
/// `min` is.
pub fn donut(center: HexPosition, min: i32, max: i32, include_origin: bool) -> HexSet {
    if min < 0 || max < 0 || min > max {
        return HexSet::new();
    }

    let mut set: HexSet = (min.max(1) as u32..=max as u32)
        .flat_map(|k| center.ring(k))
        .collect();
    if include_origin {
        set.insert(center);
    }
    set
}

/// Line from `origin` toward `target` excluding the origin, optionally cut
/// to the first `max_steps` hexes
pub fn bolt(origin: HexPosition, target: HexPosition, max_steps: Option<u32>) -> HexSet {
    let limit = max_steps.map(|n| n as usize).unwrap_or(usize::MAX);
    origin
        .line_to(&target)
        .into_iter()
        .skip(1)
        .take(limit)
        .collect()
}

/// Thick line: the bolt plus `thickness` hexes to each side of every step
pub fn beam(origin: HexPosition, target: HexPosition, thickness: i32) -> HexSet {
    if thickness < 0 {
        return HexSet::new();
    }

    let core = bolt(origin, target, None);
    let heading = dominant_direction(target - origin);
    let left = heading.rotate(2).offset();
    let right = heading.rotate(4).offset();

    let mut set = core.clone();
    for hex in core.iter() {
        for k in 1..=thickness {
            set.insert(*hex + left * k);
            set.insert(*hex + right * k);
        }
    }
    set
}

/// Cone of `length` rings opening from `origin` toward `toward`
///
/// The origin itself is never part of the cone.
pub fn cone(origin: HexPosition, toward: HexPosition, length: i32, width: ConeWidth) -> HexSet {
    if length <= 0 {
        return HexSet::new();
    }
    let heading = dominant_direction(toward - origin);
    cone_in_direction(origin, heading, length as u32, width)
}

/// Cone with an explicit heading
pub fn cone_in_direction(
    origin: HexPosition,
    heading: HexDirection,
    length: u32,
    width: ConeWidth,
) -> HexSet {
    let mut set = HexSet::new();
    for k in 1..=length {
        let ring = origin.ring_from(k, heading);
        let ring_len = ring.len() as i64;
        let half = width.half_width(k) as i64;
        for (j, hex) in ring.into_iter().enumerate() {
            // Signed offset from the corner hex along the ring
            let j = j as i64;
            let offset = if j <= ring_len / 2 { j } else { j - ring_len };
            if offset.abs() <= half {
                set.insert(hex);
            }
        }
    }
    set
}

/// Closed set of named templates, expanded against an origin and a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AreaTemplate {
    /// Disk around the target
    Circle { radius: i32 },
    /// Annulus around the target
    Donut {
        min: i32,
        max: i32,
        include_origin: bool,
    },
    /// Line from origin to target, widened sideways
    Beam { thickness: i32 },
    /// Line from origin to target, optionally truncated
    Bolt { max_steps: Option<u32> },
    /// Cone opening from origin toward target
    Cone { length: i32, width: ConeWidth },
}

impl AreaTemplate {
    pub fn expand(&self, origin: HexPosition, target: HexPosition) -> HexSet {
        match *self {
            AreaTemplate::Circle { radius } => circle(target, radius),
            AreaTemplate::Donut {
                min,
                max,
                include_origin,
            } => donut(target, min, max, include_origin),
            AreaTemplate::Beam { thickness } => beam(origin, target, thickness),
            AreaTemplate::Bolt { max_steps } => bolt(origin, target, max_steps),
            AreaTemplate::Cone { length, width } => cone(origin, target, length, width),
        }
    }
}

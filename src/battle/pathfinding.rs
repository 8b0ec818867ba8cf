//! A* pathfinding for battle grids
//!
//! Respects terrain costs, impassable tiles, occupancy and a movement
//! budget. A hard expansion cap guarantees termination; hitting it is a
//! normal "no path" outcome.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashMap;

use crate::battle::battle_map::BattleGrid;
use crate::battle::hex::HexPosition;

/// A found path and what it costs to walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// Hexes from start to goal, both inclusive
    pub steps: Vec<HexPosition>,
    /// Sum of the entry costs of every step after the start
    pub cost: u32,
}

impl Path {
    pub fn destination(&self) -> Option<HexPosition> {
        self.steps.last().copied()
    }
}

/// Search limits for one query
#[derive(Debug, Clone, Copy)]
pub struct PathLimits {
    /// Maximum total movement cost the path may spend
    pub max_cost: u32,
    /// Hard cap on node expansions
    pub max_iterations: usize,
}

/// Node in the A* open set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PathNode {
    pos: HexPosition,
    g_cost: u32,
    f_cost: u32, // g_cost + heuristic
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; prefer deeper nodes on ties, then position
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| self.g_cost.cmp(&other.g_cost))
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find path using A* algorithm
///
/// Occupied tiles are impassable (the start tile is exempt since the mover
/// stands there). Returns None when the goal is unreachable within the
/// budget or the expansion cap is hit.
pub fn find_path(
    grid: &BattleGrid,
    start: HexPosition,
    goal: HexPosition,
    limits: PathLimits,
) -> Option<Path> {
    if start == goal {
        return Some(Path {
            steps: vec![start],
            cost: 0,
        });
    }
    if !grid.is_free(goal) {
        return None;
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<HexPosition, HexPosition> = AHashMap::new();
    let mut g_scores: AHashMap<HexPosition, u32> = AHashMap::new();

    g_scores.insert(start, 0);
    open_set.push(PathNode {
        pos: start,
        g_cost: 0,
        f_cost: start.distance(&goal),
    });

    let mut iterations = 0usize;
    while let Some(current) = open_set.pop() {
        if current.pos == goal {
            return Some(Path {
                steps: reconstruct_path(&came_from, current.pos),
                cost: current.g_cost,
            });
        }

        iterations += 1;
        if iterations > limits.max_iterations {
            tracing::debug!(
                "Path search {} -> {} hit the iteration cap ({})",
                start,
                goal,
                limits.max_iterations
            );
            return None;
        }

        // Stale heap entry
        if current.g_cost > *g_scores.get(&current.pos).unwrap_or(&u32::MAX) {
            continue;
        }

        for neighbor in current.pos.neighbors() {
            if !grid.is_free(neighbor) {
                continue;
            }
            let Some(step_cost) = grid.movement_cost(neighbor) else {
                continue;
            };

            let tentative_g = current.g_cost + step_cost;
            if tentative_g > limits.max_cost {
                continue;
            }

            let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&u32::MAX);
            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.pos);
                g_scores.insert(neighbor, tentative_g);
                open_set.push(PathNode {
                    pos: neighbor,
                    g_cost: tentative_g,
                    f_cost: tentative_g + neighbor.distance(&goal),
                });
            }
        }
    }

    None // No path found
}

/// Reconstruct path from came_from map
fn reconstruct_path(
    came_from: &AHashMap<HexPosition, HexPosition>,
    mut current: HexPosition,
) -> Vec<HexPosition> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Every free hex reachable from `start` within `max_cost`, with its cheapest cost
///
/// The start itself is included at cost 0.
pub fn reachable(
    grid: &BattleGrid,
    start: HexPosition,
    max_cost: u32,
) -> AHashMap<HexPosition, u32> {
    let mut best: AHashMap<HexPosition, u32> = AHashMap::new();
    let mut frontier = BinaryHeap::new();

    best.insert(start, 0);
    frontier.push(PathNode {
        pos: start,
        g_cost: 0,
        f_cost: 0,
    });

    while let Some(current) = frontier.pop() {
        if current.g_cost > *best.get(&current.pos).unwrap_or(&u32::MAX) {
            continue;
        }
        for neighbor in current.pos.neighbors() {
            if !grid.is_free(neighbor) {
                continue;
            }
            let Some(step_cost) = grid.movement_cost(neighbor) else {
                continue;
            };
            let cost = current.g_cost + step_cost;
            if cost > max_cost || cost >= *best.get(&neighbor).unwrap_or(&u32::MAX) {
                continue;
            }
            best.insert(neighbor, cost);
            frontier.push(PathNode {
                pos: neighbor,
                g_cost: cost,
                f_cost: cost,
            });
        }
    }

    best
}

/// Calculate path cost (entry cost of every hex after the first)
pub fn path_cost(grid: &BattleGrid, steps: &[HexPosition]) -> Option<u32> {
    steps
        .iter()
        .skip(1)
        .map(|pos| grid.movement_cost(*pos))
        .sum()
}

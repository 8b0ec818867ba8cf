//! Combat modifiers produced by morale state

use serde::{Deserialize, Serialize};

use crate::battle::constants::{MIN_ACTION_POINTS, MIN_INITIATIVE};
use crate::battle::morale::block::MoraleState;

/// Fixed per-state adjustments to combat effectiveness
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoraleModifiers {
    pub accuracy: f64,
    pub action_point_delta: i32,
    pub initiative_delta: i32,
    pub crit_delta_permille: i32,
}

impl MoraleModifiers {
    pub fn for_state(state: MoraleState) -> Self {
        let (accuracy, action_point_delta, initiative_delta, crit_delta_permille) = match state {
            MoraleState::Steady => (1.0, 0, 0, 0),
            MoraleState::Shaken => (0.90, -1, -2, -50),
            MoraleState::Wavering => (0.75, -2, -5, -150),
            MoraleState::Routing => (0.50, -3, -8, -300),
        };
        Self {
            accuracy,
            action_point_delta,
            initiative_delta,
            crit_delta_permille,
        }
    }

    /// Hit chance for a base accuracy, never below `floor`
    pub fn hit_chance(&self, base: f64, floor: f64) -> f64 {
        (base * self.accuracy).max(floor).min(1.0)
    }

    pub fn action_points(&self, base: i32) -> i32 {
        (base + self.action_point_delta).max(MIN_ACTION_POINTS)
    }

    pub fn initiative(&self, speed: i32) -> i32 {
        (speed + self.initiative_delta).max(MIN_INITIATIVE)
    }

    pub fn crit_permille(&self, base: i32) -> i32 {
        (base + self.crit_delta_permille).clamp(0, 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_is_neutral() {
        let m = MoraleModifiers::for_state(MoraleState::Steady);
        assert_eq!(m.hit_chance(1.0, 0.1), 1.0);
        assert_eq!(m.action_points(3), 3);
        assert_eq!(m.initiative(7), 7);
        assert_eq!(m.crit_permille(100), 100);
    }

    #[test]
    fn test_routing_penalties_respect_floors() {
        let m = MoraleModifiers::for_state(MoraleState::Routing);
        assert_eq!(m.hit_chance(1.0, 0.1), 0.5);
        assert_eq!(m.hit_chance(0.1, 0.1), 0.1);
        assert_eq!(m.action_points(3), 1);
        assert_eq!(m.initiative(5), 1);
        assert_eq!(m.crit_permille(100), 0);
    }

    #[test]
    fn test_table_values() {
        let shaken = MoraleModifiers::for_state(MoraleState::Shaken);
        assert_eq!(shaken.accuracy, 0.90);
        assert_eq!(shaken.initiative_delta, -2);
        let wavering = MoraleModifiers::for_state(MoraleState::Wavering);
        assert_eq!(wavering.action_point_delta, -2);
        assert_eq!(wavering.crit_delta_permille, -150);
    }
}

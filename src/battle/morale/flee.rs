//! Routing units fleeing, and zone-of-control contests
//!
//! A routing unit with no adjacent enemies slips away for free if a safer
//! neighbor exists. Otherwise every adjacent enemy contests the move; each
//! lost contest costs an opportunity hit, and losing all of them pins the
//! unit in place.

use rand::Rng;

use crate::battle::constants::LOCAL_FORCE_RADIUS;
use crate::battle::execution::{BattleState, LogKind};
use crate::battle::hex::HexPosition;
use crate::battle::morale::factors::MoraleContext;
use crate::battle::resolution::compute_damage;
use crate::battle::units::Unit;
use crate::core::types::{Faction, UnitId};

/// Weight of distance from the nearest enemy in the safety score
const ENEMY_DISTANCE_WEIGHT: i32 = 3;
/// Hexes from the edge at which a fleeing unit starts to feel safer
const EDGE_PULL_RANGE: i32 = 3;

/// One zone-of-control roll-off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZocContest {
    pub threat: UnitId,
    pub mover_roll: i32,
    pub threat_roll: i32,
    pub mover_total: i32,
    pub threat_total: i32,
}

impl ZocContest {
    /// Higher total wins; equal totals go to the higher roll, then the mover
    pub fn mover_wins(&self) -> bool {
        if self.mover_total != self.threat_total {
            return self.mover_total > self.threat_total;
        }
        self.mover_roll >= self.threat_roll
    }
}

/// Roll a contest: each side adds 1..=sides to its speed
pub fn roll_contest<R: Rng>(
    rng: &mut R,
    threat: UnitId,
    mover_speed: i32,
    threat_speed: i32,
    sides: i32,
) -> ZocContest {
    let sides = sides.max(1);
    let mover_roll = rng.gen_range(1..=sides);
    let threat_roll = rng.gen_range(1..=sides);
    ZocContest {
        threat,
        mover_roll,
        threat_roll,
        mover_total: mover_speed + mover_roll,
        threat_total: threat_speed + threat_roll,
    }
}

/// How safe a hex feels to a fleeing unit
///
/// Far from enemies, near friends and close to the map edge all help.
pub fn safety_score(unit: &Unit, at: HexPosition, ctx: &MoraleContext) -> i32 {
    let enemy_distance = ctx.nearest_enemy_distance(unit, at).unwrap_or(0) as i32;
    let allies = ctx
        .living_within(at, LOCAL_FORCE_RADIUS)
        .filter(|(other, _)| other.id != unit.id && other.faction == unit.faction)
        .count() as i32;
    let edge = (EDGE_PULL_RANGE - ctx.grid.edge_distance(at) as i32).max(0);

    ENEMY_DISTANCE_WEIGHT * enemy_distance + allies + edge
}

/// Best free neighbor by safety score (first in direction order on ties)
pub fn safest_neighbor(unit: &Unit, from: HexPosition, ctx: &MoraleContext) -> Option<(HexPosition, i32)> {
    let mut best: Option<(HexPosition, i32)> = None;
    for pos in from.neighbors() {
        if !ctx.grid.is_free(pos) {
            continue;
        }
        let score = safety_score(unit, pos, ctx);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((pos, score));
        }
    }
    best
}

impl BattleState {
    /// Force every routing unit of a faction to try to flee
    pub fn flee_routing_units(&mut self, faction: Faction) {
        let fleeing: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.faction == faction && u.is_active() && u.is_routing())
            .map(|u| u.id)
            .collect();

        for id in fleeing {
            if self.phase.is_terminal() {
                return;
            }
            self.flee(id);
        }
    }

    fn flee(&mut self, id: UnitId) {
        let ctx = self.morale_context();
        let Some(unit) = ctx.unit(id) else {
            return;
        };
        let Some(from) = unit.position.filter(|_| unit.is_alive()) else {
            return;
        };

        let name = unit.name.clone();
        let threats: Vec<UnitId> = ctx.adjacent_enemies(unit, from).iter().map(|u| u.id).collect();
        let destination = safest_neighbor(unit, from, &ctx);
        let staying = safety_score(unit, from, &ctx);

        if threats.is_empty() {
            match destination {
                Some((to, score)) if score > staying => {
                    self.relocate(id, to);
                    self.log(LogKind::Morale, format!("{} flees in panic to {}", name, to));
                }
                _ => {
                    self.log(LogKind::Morale, format!("{} cowers at {}", name, from));
                }
            }
            self.mark_moved(id);
            return;
        }

        let Some((to, _)) = destination else {
            self.log(LogKind::Morale, format!("{} is surrounded and cannot flee", name));
            self.mark_moved(id);
            return;
        };

        let sides = self.config.morale.zoc_roll_sides;
        let mut won = 0usize;
        let mut parts = Vec::new();

        for threat in &threats {
            let (Some(mover), Some(enemy)) = (self.unit(id), self.unit(*threat)) else {
                continue;
            };
            if !mover.is_alive() {
                break;
            }
            if !enemy.is_alive() {
                continue;
            }
            let mover_stats = mover.effective_stats();
            let enemy_stats = enemy.effective_stats();
            let enemy_name = enemy.name.clone();

            let contest = roll_contest(&mut self.rng, *threat, mover_stats.speed, enemy_stats.speed, sides);
            tracing::debug!(
                "ZoC {} ({}+{}) vs {} ({}+{})",
                name,
                mover_stats.speed,
                contest.mover_roll,
                enemy_name,
                enemy_stats.speed,
                contest.threat_roll
            );

            if contest.mover_wins() {
                won += 1;
                parts.push(format!("slips past {}", enemy_name));
                continue;
            }

            let damage = compute_damage(
                enemy_stats.attack / 2,
                enemy_stats.attack,
                mover_stats.defense,
                &self.config.combat,
            );
            let report = self.apply_damage(id, damage);
            parts.push(format!("takes {} from {}", damage, enemy_name));
            parts.extend(report.fallout);
            if report.killed {
                parts.push(format!("{} is cut down while fleeing", name));
                break;
            }
        }

        let alive = self.unit(id).is_some_and(|u| u.is_alive());
        if alive && won > 0 {
            self.relocate(id, to);
            parts.push(format!("escapes to {}", to));
        } else if alive {
            parts.push("is pinned in place".to_string());
        }
        self.mark_moved(id);
        self.log(LogKind::Morale, format!("{} tries to flee: {}", name, parts.join("; ")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::abilities::AbilityCatalog;
    use crate::battle::battle_map::BattleGrid;
    use crate::battle::deployment::{DeploymentZones, Force, ForceUnit};
    use crate::battle::morale::MoraleState;
    use crate::battle::units::UnitStats;
    use crate::core::config::BattleConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const START: HexPosition = HexPosition { q: 3, r: 3 };

    fn runner(speed: i32, hp: i32) -> ForceUnit {
        ForceUnit::new(
            "Deserter",
            UnitStats {
                hp,
                max_hp: hp.max(20),
                speed,
                ..UnitStats::default()
            },
        )
        .at(START)
    }

    fn raider(name: &str, at: HexPosition) -> ForceUnit {
        ForceUnit::new(
            name,
            UnitStats {
                attack: 10,
                ..UnitStats::default()
            },
        )
        .at(at)
    }

    /// Deserter is unit 0 and already routing; a reserve keeps the player side alive
    fn rout(deserter: ForceUnit, enemies: Vec<ForceUnit>) -> BattleState {
        let grid = BattleGrid::new(8, 8);
        let zones = DeploymentZones::edges(&grid, 1);
        let player = vec![
            deserter,
            ForceUnit::new("Reserve", UnitStats::default()).at(HexPosition::new(0, 7)),
        ];
        let forces = vec![Force::new(Faction::Player, player), Force::new(Faction::Enemy, enemies)];
        let mut state =
            BattleState::new(grid, zones, forces, AbilityCatalog::standard(), BattleConfig::default(), 9)
                .unwrap();
        state.unit_mut(UnitId(0)).unwrap().morale_mut(70).state = MoraleState::Routing;
        state
    }

    #[test]
    fn test_unthreatened_unit_runs_and_frees_its_tile() {
        let far = HexPosition::new(7, 7);
        let mut state = rout(runner(5, 20), vec![raider("Outrider", far)]);
        state.flee_routing_units(Faction::Player);

        let unit = state.unit(UnitId(0)).unwrap();
        let to = unit.position.unwrap();
        assert!(START.is_adjacent(&to));
        assert!(to.distance(&far) > START.distance(&far));
        assert!(unit.has_moved);
        assert_eq!(unit.stats.hp, 20);
        assert_eq!(state.grid.occupant(START), None);
        assert_eq!(state.grid.occupant(to), Some(UnitId(0)));
        assert!(state.log_contains("flees in panic"));
    }

    #[test]
    fn test_winning_a_contest_escapes_unhurt() {
        let mut state = rout(runner(1000, 20), vec![raider("Sentry", HexPosition::new(4, 3))]);
        state.flee_routing_units(Faction::Player);

        let unit = state.unit(UnitId(0)).unwrap();
        let to = unit.position.unwrap();
        assert_ne!(to, START);
        assert_eq!(unit.stats.hp, 20);
        assert_eq!(state.grid.occupant(START), None);
        assert_eq!(state.grid.occupant(to), Some(UnitId(0)));
        assert!(state.log_contains("slips past Sentry"));
        assert!(state.log_contains("escapes to"));
    }

    #[test]
    fn test_losing_every_contest_pins_but_keeps_wounds() {
        let mut state = rout(
            runner(-1000, 30),
            vec![
                raider("Sentry", HexPosition::new(4, 3)),
                raider("Picket", HexPosition::new(4, 2)),
            ],
        );
        let hit = compute_damage(5, 10, UnitStats::default().defense, &state.config.combat);
        state.flee_routing_units(Faction::Player);

        let unit = state.unit(UnitId(0)).unwrap();
        assert_eq!(unit.position, Some(START));
        assert_eq!(unit.stats.hp, 30 - 2 * hit);
        assert!(unit.has_moved);
        assert_eq!(state.grid.occupant(START), Some(UnitId(0)));
        assert!(state.log_contains("takes 7 from Sentry"));
        assert!(state.log_contains("takes 7 from Picket"));
        assert!(state.log_contains("is pinned in place"));
    }

    #[test]
    fn test_unit_cut_down_while_fleeing() {
        let mut state = rout(
            runner(-1000, 1),
            vec![
                raider("Sentry", HexPosition::new(4, 3)),
                raider("Picket", HexPosition::new(4, 2)),
            ],
        );
        state.flee_routing_units(Faction::Player);

        let unit = state.unit(UnitId(0)).unwrap();
        assert!(unit.dead);
        assert_eq!(unit.stats.hp, 0);
        assert_eq!(state.grid.occupant(START), None);
        assert!(state.log_contains("Deserter is cut down while fleeing"));
        // The second threat never gets its roll
        assert!(!state.log_contains("from Picket"));
        assert!(!state.log_contains("escapes"));
        assert!(!state.log_contains("pinned"));
    }

    fn contest(mover_total: i32, threat_total: i32, mover_roll: i32, threat_roll: i32) -> ZocContest {
        ZocContest {
            threat: UnitId(1),
            mover_roll,
            threat_roll,
            mover_total,
            threat_total,
        }
    }

    #[test]
    fn test_higher_total_wins() {
        assert!(contest(12, 10, 5, 5).mover_wins());
        assert!(!contest(9, 10, 5, 5).mover_wins());
    }

    #[test]
    fn test_tied_totals_use_rolls_then_mover() {
        assert!(contest(10, 10, 6, 3).mover_wins());
        assert!(!contest(10, 10, 3, 6).mover_wins());
        assert!(contest(10, 10, 4, 4).mover_wins());
    }

    #[test]
    fn test_rolls_are_in_range_and_seeded() {
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let x = roll_contest(&mut a, UnitId(0), 5, 5, 10);
            let y = roll_contest(&mut b, UnitId(0), 5, 5, 10);
            assert_eq!(x, y);
            assert!((1..=10).contains(&x.mover_roll));
            assert!((1..=10).contains(&x.threat_roll));
        }
    }
}

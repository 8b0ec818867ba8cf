//! Greedy phase driver
//!
//! Every unit the phase controls attacks the most attractive enemy in reach,
//! or closes distance first and then attacks. Commanders rally a faltering
//! line and throw their best damage ability before fighting themselves.

use crate::battle::abilities::{AbilityEffect, AbilityId};
use crate::battle::ai::BattleAi;
use crate::battle::execution::BattleState;
use crate::battle::hex::HexPosition;
use crate::battle::morale::MoraleState;
use crate::battle::pathfinding::reachable;
use crate::core::types::UnitId;

/// Rally abilities in order of preference
const RALLY_ABILITIES: [&str; 2] = ["inspirational_speech", "rally"];

/// Most abilities a commander casts in one phase
const MAX_CASTS_PER_PHASE: usize = 3;

#[derive(Debug, Clone)]
pub struct GreedyAi {
    /// Allies at or past this state make a commander rally
    pub rally_threshold: MoraleState,
}

impl Default for GreedyAi {
    fn default() -> Self {
        Self {
            rally_threshold: MoraleState::Wavering,
        }
    }
}

impl GreedyAi {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(&self, state: &mut BattleState, id: UnitId) -> usize {
        let Some(pos) = state.unit(id).and_then(|u| u.position) else {
            return 0;
        };
        let mut issued = 0;

        if self.line_faltering(state, id) {
            for name in RALLY_ABILITIES {
                if state.use_ability(id, &AbilityId::from(name), pos).is_ok() {
                    issued += 1;
                    break;
                }
            }
        }

        for _ in 0..MAX_CASTS_PER_PHASE {
            let Some((ability, target)) = best_cast(state, id) else {
                break;
            };
            match state.use_ability(id, &ability, target) {
                Ok(_) => issued += 1,
                Err(e) => {
                    tracing::debug!("{} could not use {}: {}", id, ability, e);
                    break;
                }
            }
            if state.is_finished() {
                break;
            }
        }
        issued
    }

    fn line_faltering(&self, state: &BattleState, id: UnitId) -> bool {
        let Some(commander) = state.unit(id) else {
            return false;
        };
        state.units.iter().any(|u| {
            u.id != id
                && u.faction == commander.faction
                && u.is_alive()
                && u.morale_state().at_least(self.rally_threshold)
        })
    }

    /// Attack if something is in reach, otherwise advance and try again
    fn fight(&self, state: &mut BattleState, id: UnitId) -> usize {
        if let Some(target) = pick_target(state, id) {
            if state.attack(id, target).is_ok() {
                return 1;
            }
        }

        let mut issued = 0;
        if let Some(dest) = approach(state, id) {
            match state.move_unit(id, dest) {
                Ok(_) => issued += 1,
                Err(e) => tracing::debug!("{} could not advance to {}: {}", id, dest, e),
            }
        }
        if let Some(target) = pick_target(state, id) {
            if state.attack(id, target).is_ok() {
                issued += 1;
            }
        }
        issued
    }
}

impl BattleAi for GreedyAi {
    fn take_phase(&mut self, state: &mut BattleState) -> usize {
        let mut order: Vec<(bool, usize, UnitId)> = state
            .units
            .iter()
            .filter(|u| u.is_active() && state.controls(u) && !u.is_routing())
            .map(|u| {
                let slot = state
                    .initiative
                    .iter()
                    .position(|id| *id == u.id)
                    .unwrap_or(usize::MAX);
                (!u.is_commander, slot, u.id)
            })
            .collect();
        order.sort();

        let mut issued = 0;
        for (_, _, id) in order {
            if state.is_finished() {
                break;
            }
            // Killed or broken earlier this phase
            if !state.unit(id).is_some_and(|u| u.is_active() && !u.is_routing()) {
                continue;
            }
            if state.commander_record(id).is_some() {
                issued += self.command(state, id);
            }
            issued += self.fight(state, id);
        }
        issued
    }

    fn name(&self) -> &str {
        "greedy"
    }
}

/// Most attractive enemy within basic attack range
fn pick_target(state: &BattleState, id: UnitId) -> Option<UnitId> {
    let unit = state.unit(id)?;
    let from = unit.position?;
    let range = unit.stats.range.max(1);

    let mut best_score = f64::MIN;
    let mut best = None;
    for enemy in state
        .units
        .iter()
        .filter(|e| e.is_active() && unit.faction.is_hostile_to(e.faction))
    {
        let Some(pos) = enemy.position else {
            continue;
        };
        let distance = from.distance(&pos);
        if distance > range {
            continue;
        }

        // Weak targets are attractive
        let mut score = 1.0 - enemy.hp_fraction();
        score += 0.5 / (1.0 + distance as f64);
        if enemy.is_routing() {
            score += 0.25;
        }
        if enemy.is_commander {
            score += 0.5;
        }

        if score > best_score {
            best_score = score;
            best = Some(enemy.id);
        }
    }
    best
}

/// Reachable hex closest to any enemy, if it is closer than where we stand
fn approach(state: &BattleState, id: UnitId) -> Option<HexPosition> {
    let unit = state.unit(id)?;
    let from = unit.position?;
    let enemies: Vec<HexPosition> = state
        .units
        .iter()
        .filter(|e| e.is_active() && unit.faction.is_hostile_to(e.faction))
        .filter_map(|e| e.position)
        .collect();
    let nearest = |hex: HexPosition| enemies.iter().map(|e| hex.distance(e)).min();

    let current = nearest(from)?;
    let mut options: Vec<(u32, u32, HexPosition)> = reachable(&state.grid, from, unit.stats.movement)
        .into_iter()
        .filter(|(hex, _)| *hex != from)
        .filter_map(|(hex, cost)| nearest(hex).map(|d| (d, cost, hex)))
        .collect();
    options.sort();
    options
        .into_iter()
        .next()
        .filter(|(distance, _, _)| *distance < current)
        .map(|(_, _, hex)| hex)
}

/// Damage ability and aim point that hits the most enemy hp
fn best_cast(state: &BattleState, id: UnitId) -> Option<(AbilityId, HexPosition)> {
    let user = state.unit(id)?;
    let mut best: Option<(i32, AbilityId, HexPosition)> = None;

    for ability_id in &user.abilities {
        let Some(ability) = state.catalog.get(ability_id) else {
            continue;
        };
        let AbilityEffect::Damage { amount } = ability.effect else {
            continue;
        };
        for enemy in state
            .units
            .iter()
            .filter(|e| e.is_active() && user.faction.is_hostile_to(e.faction))
        {
            let Some(aim) = enemy.position else {
                continue;
            };
            if !state.can_use(id, ability_id, aim) {
                continue;
            }
            let score = state.gather_targets(user, ability, aim).len() as i32 * amount;
            if best.as_ref().map_or(true, |(s, _, _)| score > *s) {
                best = Some((score, ability_id.clone(), aim));
            }
        }
    }
    best.filter(|(score, _, _)| *score > 0)
        .map(|(_, ability, aim)| (ability, aim))
}

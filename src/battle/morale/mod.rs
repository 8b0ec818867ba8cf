//! Morale subsystem
//!
//! Factors -> exponential smoothing -> hysteretic state -> combat modifiers.
//! Evaluations happen at every phase boundary and around death events;
//! commander auras, rally and fear statuses feed the factors, and routing
//! units flee at the start of their faction's phase.

pub mod aura;
pub mod block;
pub mod effects;
pub mod factors;
pub mod flee;
pub mod modifiers;

pub use aura::{refresh_auras, refresh_due, strip_commander_auras};
pub use block::{MoraleBlock, MoraleFactors, MoraleSample, MoraleState};
pub use effects::{apply_morale_effect, morale_status};
pub use factors::{compute_factors, MoraleContext};
pub use flee::{roll_contest, safest_neighbor, safety_score, ZocContest};
pub use modifiers::MoraleModifiers;

use crate::battle::constants::DEAD_ALLY_RADIUS;
use crate::battle::execution::{BattlePhase, BattleState, LogKind};
use crate::battle::units::{tick_cooldowns, Unit};
use crate::core::types::{Faction, UnitId};

/// Has this faction's line broken?
///
/// True when at least `fraction` of its living non-commander units are
/// routing. A faction with no such units never surrenders.
pub fn surrender_triggered(units: &[Unit], faction: Faction, fraction: f64) -> bool {
    let (living, routing) = units
        .iter()
        .filter(|u| u.faction == faction && u.is_alive() && !u.is_commander)
        .fold((0usize, 0usize), |(living, routing), u| {
            (living + 1, routing + usize::from(u.is_routing()))
        });

    living > 0 && routing as f64 >= fraction * living as f64
}

impl BattleState {
    pub fn morale_context(&self) -> MoraleContext<'_> {
        MoraleContext::new(&self.units, &self.grid, &self.commanders)
    }

    /// Combat modifiers for a unit's current morale state
    pub fn modifiers_for(&self, id: UnitId) -> MoraleModifiers {
        let state = self.unit(id).map(|u| u.morale_state()).unwrap_or_default();
        MoraleModifiers::for_state(state)
    }

    /// Re-evaluate one living unit; returns its state change, if any
    pub fn evaluate_morale(&mut self, id: UnitId) -> Option<(MoraleState, MoraleState)> {
        let unit = self.unit(id).filter(|u| u.is_alive())?;
        let factors = compute_factors(unit, &self.morale_context());

        let round = self.round;
        let config = &self.config.morale;
        let unit = self.units.iter_mut().find(|u| u.id == id)?;
        let change = unit
            .morale_mut(config.default_value)
            .evaluate(factors, round, config);

        if let Some((from, to)) = change {
            tracing::debug!("{} morale {} -> {} ({:?})", unit.name, from, to, factors);
        }
        change
    }

    /// Re-evaluate every living unit, logging state changes
    pub fn evaluate_all_morale(&mut self) -> Vec<String> {
        let ids: Vec<UnitId> = self.units.iter().filter(|u| u.is_alive()).map(|u| u.id).collect();
        let lines = self.evaluate_and_describe(&ids);
        for line in &lines {
            self.log(LogKind::Morale, line.clone());
        }
        lines
    }

    fn evaluate_and_describe(&mut self, ids: &[UnitId]) -> Vec<String> {
        let mut lines = Vec::new();
        for &id in ids {
            if let Some((from, to)) = self.evaluate_morale(id) {
                lines.push(self.describe_transition(id, from, to));
            }
        }
        lines
    }

    fn describe_transition(&self, id: UnitId, from: MoraleState, to: MoraleState) -> String {
        let name = self.unit(id).map(|u| u.name.as_str()).unwrap_or("?");
        if to > from {
            format!("{} grows {}", name, to)
        } else {
            format!("{} recovers to {}", name, to)
        }
    }

    /// Morale fallout of a death; the caller folds it into its log entry
    ///
    /// Commander deaths shake the whole army first; then every living unit
    /// near the body is re-evaluated.
    pub fn on_unit_death(&mut self, dead: UnitId) -> Vec<String> {
        let Some(body) = self.unit(dead) else {
            return Vec::new();
        };
        let position = body.position;

        let mut fallout = Vec::new();
        if self.commanders.iter().any(|c| c.unit_id == dead) {
            fallout.extend(self.on_commander_death(dead));
        }

        if let Some(pos) = position {
            let nearby: Vec<UnitId> = self
                .morale_context()
                .living_within(pos, DEAD_ALLY_RADIUS)
                .map(|(u, _)| u.id)
                .collect();
            fallout.extend(self.evaluate_and_describe(&nearby));
        }
        fallout
    }

    /// Army-wide shock, aura strip and immediate refresh
    pub fn on_commander_death(&mut self, commander: UnitId) -> Vec<String> {
        let Some(record) = self.commanders.iter().find(|c| c.unit_id == commander) else {
            return Vec::new();
        };
        let faction = record.faction;
        let name = self
            .unit(commander)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| commander.to_string());

        let mut fallout = vec![format!("{} has fallen and the {} army falters", name, faction)];

        let round = self.round;
        let config = &self.config.morale;
        let mut changes = Vec::new();
        for unit in self
            .units
            .iter_mut()
            .filter(|u| u.faction == faction && u.is_alive() && u.id != commander)
        {
            let change = unit
                .morale_mut(config.default_value)
                .shift(config.commander_death_shift, round, config);
            if let Some((from, to)) = change {
                changes.push((unit.id, from, to));
            }
        }
        for (id, from, to) in changes {
            fallout.push(self.describe_transition(id, from, to));
        }

        strip_commander_auras(&mut self.units, commander);
        self.refresh_auras();
        tracing::info!("Commander {} died; {} morale shifted", name, faction);
        fallout
    }

    /// Re-grant all commander auras
    pub fn refresh_auras(&mut self) {
        refresh_auras(&mut self.units, &self.commanders);
        self.last_aura_refresh = self.round;
    }

    /// Command cooldown decay and the surrender check
    pub fn end_of_turn_morale(&mut self) {
        let catalog = &self.catalog;
        for commander in &mut self.commanders {
            tick_cooldowns(&mut commander.cooldowns, |id| catalog.is_command(id));
        }
        for unit in &mut self.units {
            tick_cooldowns(&mut unit.cooldowns, |id| catalog.is_command(id));
        }

        if self.phase.is_terminal() {
            return;
        }

        let fraction = self.config.morale.surrender_fraction;
        let player_broken = surrender_triggered(&self.units, Faction::Player, fraction);
        let enemy_broken = surrender_triggered(&self.units, Faction::Enemy, fraction);

        if player_broken {
            self.finish(
                BattlePhase::Defeat,
                "The player line is broken and the survivors surrender".to_string(),
            );
        } else if enemy_broken {
            self.finish(
                BattlePhase::Victory,
                "The enemy line is broken and the survivors surrender".to_string(),
            );
        }
    }
}

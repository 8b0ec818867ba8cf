//! Battle execution: phase state machine and unit commands
//!
//! Setup -> HeroTurn -> UnitsTurn -> EnemyTurn -> HeroTurn (next round).
//! Victory and Defeat are absorbing and reachable from any non-terminal
//! phase. Commands are validated before anything is touched, so a rejected
//! command leaves the state exactly as it was.

use std::collections::BTreeSet;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::battle::abilities::AbilityCatalog;
use crate::battle::battle_map::BattleGrid;
use crate::battle::deployment::DeploymentZones;
use crate::battle::hex::HexPosition;
use crate::battle::morale::{refresh_due, MoraleModifiers, MoraleState};
use crate::battle::pathfinding::{find_path, Path, PathLimits};
use crate::battle::resolution::{roll_damage, DamageRoll};
use crate::battle::units::{tick_cooldowns, Commander, StatusEffect, Unit};
use crate::core::config::BattleConfig;
use crate::core::error::{CommandError, CommandResult};
use crate::core::types::{Faction, Round, UnitId};

/// Battle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    #[default]
    Setup,
    HeroTurn,
    UnitsTurn,
    EnemyTurn,
    Victory,
    Defeat,
}

impl BattlePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BattlePhase::Victory | BattlePhase::Defeat)
    }

    /// Legal-transition table
    pub fn can_transition_to(&self, next: BattlePhase) -> bool {
        use BattlePhase::*;
        match (self, next) {
            (Victory | Defeat, _) => false,
            (_, Victory | Defeat) => true,
            (Setup, HeroTurn) => true,
            (HeroTurn, UnitsTurn) => true,
            (UnitsTurn, EnemyTurn) => true,
            (EnemyTurn, HeroTurn) => true,
            _ => false,
        }
    }

    /// Faction whose units act in this phase
    pub fn acting_faction(&self) -> Option<Faction> {
        match self {
            BattlePhase::HeroTurn | BattlePhase::UnitsTurn => Some(Faction::Player),
            BattlePhase::EnemyTurn => Some(Faction::Enemy),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BattlePhase::Setup => "setup",
            BattlePhase::HeroTurn => "hero turn",
            BattlePhase::UnitsTurn => "units turn",
            BattlePhase::EnemyTurn => "enemy turn",
            BattlePhase::Victory => "victory",
            BattlePhase::Defeat => "defeat",
        }
    }
}

/// Category of a battle log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogKind {
    Phase,
    Deployment,
    Movement,
    Combat,
    Ability,
    Morale,
    Status,
    Outcome,
}

/// One append-only battle log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub round: Round,
    pub phase: BattlePhase,
    pub kind: LogKind,
    pub text: String,
}

/// Complete battle state
#[derive(Debug, Clone)]
pub struct BattleState {
    pub round: Round,
    pub phase: BattlePhase,
    pub grid: BattleGrid,
    pub commanders: Vec<Commander>,
    /// Indexed by unit id
    pub units: Vec<Unit>,
    pub initiative: Vec<UnitId>,
    pub log: Vec<LogEntry>,
    pub zones: DeploymentZones,
    pub catalog: AbilityCatalog,
    pub config: BattleConfig,
    pub last_aura_refresh: Round,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) warned: BTreeSet<String>,
}

impl BattleState {
    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        match self.units.get(id.0 as usize) {
            Some(unit) if unit.id == id => Some(unit),
            _ => self.units.iter().find(|u| u.id == id),
        }
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        let index = match self.units.get(id.0 as usize) {
            Some(unit) if unit.id == id => id.0 as usize,
            _ => self.units.iter().position(|u| u.id == id)?,
        };
        self.units.get_mut(index)
    }

    /// Commander record for a unit, if it has one
    pub fn commander_record(&self, id: UnitId) -> Option<&Commander> {
        self.commanders.iter().find(|c| c.unit_id == id)
    }

    pub fn commander_for(&self, faction: Faction) -> Option<&Commander> {
        self.commanders.iter().find(|c| c.faction == faction)
    }

    /// Living units of a faction that are not commanders
    pub fn living_rank_and_file(&self, faction: Faction) -> usize {
        self.units
            .iter()
            .filter(|u| u.faction == faction && u.is_alive() && !u.is_commander)
            .count()
    }

    pub fn log(&mut self, kind: LogKind, text: String) {
        tracing::debug!("[round {}] {}", self.round, text);
        self.log.push(LogEntry {
            round: self.round,
            phase: self.phase,
            kind,
            text,
        });
    }

    pub fn log_contains(&self, needle: &str) -> bool {
        self.log.iter().any(|e| e.text.contains(needle))
    }

    /// Emit a warning only the first time a given key is seen
    pub(crate) fn warn_once(&mut self, key: String, message: &str) {
        if self.warned.insert(key) {
            tracing::warn!("{}", message);
        }
    }

    /// Commander records that point at no unit degrade to "no aura"
    fn audit_commanders(&mut self) {
        let missing: Vec<UnitId> = self
            .commanders
            .iter()
            .filter(|c| self.unit(c.unit_id).is_none())
            .map(|c| c.unit_id)
            .collect();
        for id in missing {
            self.warn_once(
                format!("missing-commander-{}", id.0),
                &format!("Commander {} has no unit; its aura and abilities are ignored", id),
            );
        }
    }

    /// Move a unit's occupancy from its current tile to `to`
    pub(crate) fn relocate(&mut self, id: UnitId, to: HexPosition) {
        let Some(from) = self.unit(id).and_then(|u| u.position) else {
            return;
        };
        if self.grid.occupant(from) == Some(id) {
            self.grid.set_occupant(from, None);
        }
        self.grid.set_occupant(to, Some(id));
        if let Some(unit) = self.unit_mut(id) {
            unit.position = Some(to);
        }
    }

    pub(crate) fn mark_moved(&mut self, id: UnitId) {
        if let Some(unit) = self.unit_mut(id) {
            unit.has_moved = true;
        }
    }

    /// Does the current phase let this unit act?
    pub fn controls(&self, unit: &Unit) -> bool {
        match self.phase {
            BattlePhase::HeroTurn => unit.faction == Faction::Player && unit.is_commander,
            BattlePhase::UnitsTurn => unit.faction == Faction::Player && !unit.is_commander,
            BattlePhase::EnemyTurn => unit.faction == Faction::Enemy,
            _ => false,
        }
    }

    /// Validate that a unit may take a command right now
    pub(crate) fn actor(&self, id: UnitId) -> CommandResult<&Unit> {
        if self.phase.is_terminal() {
            return Err(CommandError::BattleOver);
        }
        let unit = self.unit(id).ok_or(CommandError::UnitNotFound(id))?;
        if unit.dead {
            return Err(CommandError::UnitDead(id));
        }
        if unit.position.is_none() {
            return Err(CommandError::NotDeployed(id));
        }
        if !self.controls(unit) {
            return Err(CommandError::NotYourTurn {
                unit: id,
                phase: self.phase,
            });
        }
        if unit.is_routing() {
            return Err(CommandError::Routing(id));
        }
        Ok(unit)
    }

    /// Can this unit pay for an action of the given AP cost?
    pub(crate) fn check_action(&self, unit: &Unit, cost: i32) -> CommandResult<()> {
        match self.commander_record(unit.id) {
            Some(commander) if commander.action_points < cost => {
                Err(CommandError::NotEnoughActionPoints {
                    needed: cost,
                    available: commander.action_points,
                })
            }
            Some(_) => Ok(()),
            None if unit.has_acted => Err(CommandError::AlreadyActed(unit.id)),
            None => Ok(()),
        }
    }

    /// Commanders pay action points; everyone else uses their one action
    pub(crate) fn spend_action(&mut self, id: UnitId, cost: i32) {
        if let Some(commander) = self.commanders.iter_mut().find(|c| c.unit_id == id) {
            commander.spend(cost);
        } else if let Some(unit) = self.unit_mut(id) {
            unit.has_acted = true;
        }
    }

    /// Move a unit along the cheapest path within its movement budget
    pub fn move_unit(&mut self, id: UnitId, to: HexPosition) -> CommandResult<Path> {
        let unit = self.actor(id)?;
        if unit.has_moved {
            return Err(CommandError::AlreadyMoved(id));
        }
        if !self.grid.contains(to) {
            return Err(CommandError::OffGrid(to));
        }
        let Some(from) = unit.position else {
            return Err(CommandError::NotDeployed(id));
        };
        if to != from && self.grid.is_occupied(to) {
            return Err(CommandError::TileOccupied(to));
        }

        let limits = PathLimits {
            max_cost: unit.stats.movement,
            max_iterations: self.config.pathfinding.max_iterations,
        };
        let path = find_path(&self.grid, from, to, limits).ok_or(CommandError::NoPath { from, to })?;
        let name = unit.name.clone();

        self.relocate(id, to);
        self.mark_moved(id);
        self.log(
            LogKind::Movement,
            format!("{} moves {} -> {} (cost {})", name, from, to, path.cost),
        );
        Ok(path)
    }

    /// Basic attack against an enemy in range
    pub fn attack(&mut self, attacker: UnitId, defender: UnitId) -> CommandResult<DamageRoll> {
        let unit = self.actor(attacker)?;
        let target = self.unit(defender).ok_or(CommandError::UnitNotFound(defender))?;
        if target.dead {
            return Err(CommandError::UnitDead(defender));
        }
        let Some(target_pos) = target.position else {
            return Err(CommandError::NotDeployed(defender));
        };
        if !unit.faction.is_hostile_to(target.faction) {
            return Err(CommandError::NotHostile(attacker, defender));
        }
        let Some(from) = unit.position else {
            return Err(CommandError::NotDeployed(attacker));
        };

        let distance = from.distance(&target_pos);
        let range = unit.stats.range.max(1);
        if distance > range {
            return Err(CommandError::OutOfRange { distance, range });
        }
        let cost = self.config.combat.basic_attack_ap;
        self.check_action(unit, cost)?;

        let attacker_stats = unit.effective_stats();
        let defender_stats = target.effective_stats();
        let attacker_name = unit.name.clone();
        let defender_name = target.name.clone();
        let modifiers = MoraleModifiers::for_state(unit.morale_state());

        let roll = roll_damage(
            attacker_stats.attack,
            attacker_stats.attack,
            defender_stats.defense,
            attacker_stats.crit_permille,
            &modifiers,
            &self.config.combat,
            &mut self.rng,
        );
        self.spend_action(attacker, cost);

        let text = if roll.hit {
            let report = self.apply_damage(defender, roll.amount);
            let mut text = format!(
                "{} {}strikes {} for {}",
                attacker_name,
                if roll.critical { "critically " } else { "" },
                defender_name,
                roll.amount
            );
            if report.killed {
                text.push_str(&format!("; {} falls", defender_name));
            }
            for line in &report.fallout {
                text.push_str("; ");
                text.push_str(line);
            }
            text
        } else {
            format!("{} attacks {} and misses", attacker_name, defender_name)
        };
        self.log(LogKind::Combat, text);
        self.check_victory();
        Ok(roll)
    }

    /// Advance to the next phase, running its entry effects
    pub fn advance_phase(&mut self) -> CommandResult<BattlePhase> {
        match self.phase {
            BattlePhase::Setup => {
                self.auto_deploy()?;
                self.transition(BattlePhase::HeroTurn)?;
                self.round = 1;
                self.refresh_auras();
                self.log(LogKind::Phase, "Battle begins".to_string());
                self.enter_phase();
            }
            BattlePhase::HeroTurn => {
                self.transition(BattlePhase::UnitsTurn)?;
                self.enter_phase();
            }
            BattlePhase::UnitsTurn => {
                self.transition(BattlePhase::EnemyTurn)?;
                self.enter_phase();
            }
            BattlePhase::EnemyTurn => {
                self.start_new_round();
                if !self.phase.is_terminal() {
                    self.transition(BattlePhase::HeroTurn)?;
                    self.enter_phase();
                }
            }
            BattlePhase::Victory | BattlePhase::Defeat => return Err(CommandError::BattleOver),
        }
        Ok(self.phase)
    }

    fn transition(&mut self, to: BattlePhase) -> CommandResult<()> {
        if !self.phase.can_transition_to(to) {
            return Err(CommandError::IllegalTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!("Phase {:?} -> {:?} (round {})", self.phase, to, self.round);
        self.phase = to;
        Ok(())
    }

    /// Force a terminal phase; does nothing once the battle is over
    pub(crate) fn finish(&mut self, outcome: BattlePhase, reason: String) {
        if !self.phase.can_transition_to(outcome) || !outcome.is_terminal() {
            return;
        }
        self.phase = outcome;
        tracing::info!("Battle ended in {:?} on round {}: {}", outcome, self.round, reason);
        self.log(LogKind::Outcome, reason);
    }

    /// Entry effects of the phase just entered
    fn enter_phase(&mut self) {
        self.audit_commanders();
        let phase = self.phase;
        self.log(
            LogKind::Phase,
            format!("Round {}: {} begins", self.round, phase.label()),
        );

        self.evaluate_all_morale();

        for i in 0..self.units.len() {
            if self.controls(&self.units[i]) {
                self.units[i].reset_turn_flags();
            }
        }
        if let Some(faction) = phase.acting_faction() {
            self.reset_action_points(faction);
        }

        match phase {
            BattlePhase::UnitsTurn => {
                self.recompute_initiative();
                self.flee_routing_units(Faction::Player);
            }
            BattlePhase::EnemyTurn => self.flee_routing_units(Faction::Enemy),
            _ => {}
        }
        self.check_victory();
    }

    /// Refill a faction's commander AP, adjusted by its morale
    fn reset_action_points(&mut self, faction: Faction) {
        let base = self.config.combat.commander_action_points;
        let Some(index) = self.commanders.iter().position(|c| c.faction == faction) else {
            return;
        };
        let state = self
            .unit(self.commanders[index].unit_id)
            .map(|u| u.morale_state())
            .unwrap_or_default();
        let commander = &mut self.commanders[index];
        commander.max_action_points = base;
        commander.action_points = MoraleModifiers::for_state(state).action_points(base);
    }

    /// Leaving the enemy turn: statuses, cooldowns, end-of-turn morale, auras
    fn start_new_round(&mut self) {
        self.round += 1;

        let ids: Vec<UnitId> = self.units.iter().filter(|u| u.is_alive()).map(|u| u.id).collect();
        for id in ids {
            let Some(unit) = self.unit_mut(id) else {
                continue;
            };
            let damage = unit.tick_statuses();
            if damage <= 0 {
                continue;
            }
            let name = unit.name.clone();
            let report = self.apply_damage(id, damage);
            let mut text = format!("{} suffers {} from lingering wounds", name, damage);
            if report.killed {
                text.push_str(&format!("; {} succumbs", name));
            }
            for line in &report.fallout {
                text.push_str("; ");
                text.push_str(line);
            }
            self.log(LogKind::Status, text);
        }

        let catalog = &self.catalog;
        for commander in &mut self.commanders {
            tick_cooldowns(&mut commander.cooldowns, |id| !catalog.is_command(id));
        }
        for unit in &mut self.units {
            tick_cooldowns(&mut unit.cooldowns, |id| !catalog.is_command(id));
        }

        self.end_of_turn_morale();

        let interval = self.config.morale.aura_refresh_interval;
        if !self.phase.is_terminal() && refresh_due(self.round, self.last_aura_refresh, interval) {
            self.refresh_auras();
        }
        self.check_victory();
    }

    /// Order living, positioned non-commanders by morale-adjusted speed
    pub fn recompute_initiative(&mut self) {
        let mut order: Vec<(i32, &str, UnitId)> = self
            .units
            .iter()
            .filter(|u| u.is_active() && !u.is_commander)
            .map(|u| {
                let speed = MoraleModifiers::for_state(u.morale_state())
                    .initiative(u.effective_stats().speed);
                (speed, u.name.as_str(), u.id)
            })
            .collect();
        order.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)).then(a.2.cmp(&b.2)));
        self.initiative = order.into_iter().map(|(_, _, id)| id).collect();
    }

    /// End the battle if a side has no living non-commander units
    ///
    /// Safe to call any number of times; returns the terminal phase if the
    /// battle is over.
    pub fn check_victory(&mut self) -> Option<BattlePhase> {
        if self.phase.is_terminal() {
            return Some(self.phase);
        }
        if self.phase == BattlePhase::Setup {
            return None;
        }

        let player = self.living_rank_and_file(Faction::Player);
        let enemy = self.living_rank_and_file(Faction::Enemy);
        if player == 0 {
            self.finish(BattlePhase::Defeat, "The player force has been destroyed".to_string());
        } else if enemy == 0 {
            self.finish(BattlePhase::Victory, "The enemy force has been destroyed".to_string());
        }
        self.phase.is_terminal().then_some(self.phase)
    }

    /// Plain read-only view for rendering
    pub fn snapshot(&self) -> BattleSnapshot {
        BattleSnapshot {
            round: self.round,
            phase: self.phase,
            units: self.units.iter().map(UnitSnapshot::from).collect(),
            initiative: self.initiative.clone(),
            log: self.log.clone(),
        }
    }
}

/// Serializable view of one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub name: String,
    pub faction: Faction,
    pub is_commander: bool,
    pub position: Option<HexPosition>,
    pub hp: i32,
    pub max_hp: i32,
    pub dead: bool,
    pub morale_state: MoraleState,
    pub morale_value: Option<i32>,
    pub statuses: Vec<StatusEffect>,
}

impl From<&Unit> for UnitSnapshot {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id,
            name: unit.name.clone(),
            faction: unit.faction,
            is_commander: unit.is_commander,
            position: unit.position,
            hp: unit.stats.hp,
            max_hp: unit.stats.max_hp,
            dead: unit.dead,
            morale_state: unit.morale_state(),
            morale_value: unit.morale.as_ref().map(|m| m.value),
            statuses: unit.statuses.clone(),
        }
    }
}

/// Serializable view of the whole battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub round: Round,
    pub phase: BattlePhase,
    pub units: Vec<UnitSnapshot>,
    pub initiative: Vec<UnitId>,
    pub log: Vec<LogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::abilities::AbilityId;
    use crate::battle::deployment::{Force, ForceUnit};
    use crate::battle::units::{AuraDefinition, StatBonus, StatusKind, UnitStats};

    fn stats(attack: i32, defense: i32, speed: i32) -> UnitStats {
        UnitStats {
            attack,
            defense,
            speed,
            ..UnitStats::default()
        }
    }

    fn duel() -> BattleState {
        let grid = BattleGrid::new(8, 8);
        let zones = DeploymentZones::new(
            (0..8).map(|r| HexPosition::new(0, r)).collect(),
            (0..8).map(|r| HexPosition::new(7, r)).collect(),
        );
        let forces = vec![
            Force::new(
                Faction::Player,
                vec![
                    ForceUnit::new("Knight", stats(10, 4, 6)).at(HexPosition::new(3, 3)),
                    ForceUnit::new("Squire", stats(4, 2, 4)).at(HexPosition::new(0, 0)),
                ],
            ),
            Force::new(
                Faction::Enemy,
                vec![
                    ForceUnit::new("Brute", stats(6, 4, 5)).at(HexPosition::new(4, 3)),
                    ForceUnit::new("Goblin", stats(3, 1, 8)).at(HexPosition::new(7, 7)),
                ],
            ),
        ];
        BattleState::new(grid, zones, forces, AbilityCatalog::standard(), BattleConfig::default(), 42)
            .expect("valid battle")
    }

    #[test]
    fn test_transition_table() {
        use BattlePhase::*;
        assert!(Setup.can_transition_to(HeroTurn));
        assert!(!Setup.can_transition_to(UnitsTurn));
        assert!(EnemyTurn.can_transition_to(HeroTurn));
        assert!(UnitsTurn.can_transition_to(Defeat));
        assert!(!Victory.can_transition_to(HeroTurn));
        assert!(!Defeat.can_transition_to(Victory));
    }

    #[test]
    fn test_phase_cycle_advances_round() {
        let mut state = duel();
        assert_eq!(state.advance_phase(), Ok(BattlePhase::HeroTurn));
        assert_eq!(state.round, 1);
        assert_eq!(state.advance_phase(), Ok(BattlePhase::UnitsTurn));
        assert_eq!(state.advance_phase(), Ok(BattlePhase::EnemyTurn));
        assert_eq!(state.advance_phase(), Ok(BattlePhase::HeroTurn));
        assert_eq!(state.round, 2);
    }

    #[test]
    fn test_units_turn_sets_initiative() {
        let mut state = duel();
        state.advance_phase().unwrap();
        state.advance_phase().unwrap();
        let names: Vec<&str> = state
            .initiative
            .iter()
            .map(|id| state.unit(*id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["Goblin", "Knight", "Brute", "Squire"]);
    }

    #[test]
    fn test_morale_slows_initiative() {
        let mut state = duel();
        state.advance_phase().unwrap();
        state.advance_phase().unwrap();

        // Goblin 8 -> 3, Knight 6 -> floor of 1
        state.unit_mut(UnitId(3)).unwrap().morale_mut(70).state = MoraleState::Wavering;
        state.unit_mut(UnitId(0)).unwrap().morale_mut(70).state = MoraleState::Routing;
        state.recompute_initiative();

        assert_eq!(state.initiative, vec![UnitId(2), UnitId(1), UnitId(3), UnitId(0)]);
        assert_eq!(MoraleModifiers::for_state(MoraleState::Routing).initiative(6), 1);
    }

    fn next_round(state: &mut BattleState) -> CommandResult<BattlePhase> {
        state.advance_phase()?;
        state.advance_phase()?;
        state.advance_phase()
    }

    fn status_rounds(unit: &Unit, label: &str) -> Option<u32> {
        unit.statuses
            .iter()
            .find(|s| s.kind.label() == label)
            .map(|s| s.remaining_rounds)
    }

    #[test]
    fn test_round_tick_applies_and_expires_wounds() {
        let mut state = duel();
        state.advance_phase().unwrap();
        state.unit_mut(UnitId(0)).unwrap().apply_status(StatusKind::Bleeding { damage: 3 }, 1);
        state.unit_mut(UnitId(1)).unwrap().apply_status(StatusKind::Burning { damage: 2 }, 2);

        assert_eq!(next_round(&mut state), Ok(BattlePhase::HeroTurn));
        assert_eq!(state.round, 2);
        let knight = state.unit(UnitId(0)).unwrap();
        assert_eq!(knight.stats.hp, 17);
        assert_eq!(status_rounds(knight, "bleeding"), None);
        let squire = state.unit(UnitId(1)).unwrap();
        assert_eq!(squire.stats.hp, 18);
        assert_eq!(status_rounds(squire, "burning"), Some(1));
        assert!(state.log_contains("Knight suffers 3 from lingering wounds"));

        next_round(&mut state).unwrap();
        assert_eq!(state.unit(UnitId(0)).unwrap().stats.hp, 17);
        let squire = state.unit(UnitId(1)).unwrap();
        assert_eq!(squire.stats.hp, 16);
        assert_eq!(status_rounds(squire, "burning"), None);
    }

    #[test]
    fn test_bleeding_out_the_last_enemy_wins() {
        let mut state = duel();
        state.advance_phase().unwrap();
        assert!(state.apply_damage(UnitId(3), 100).killed);
        state.unit_mut(UnitId(2)).unwrap().apply_status(StatusKind::Bleeding { damage: 50 }, 3);

        assert_eq!(next_round(&mut state), Ok(BattlePhase::Victory));
        assert_eq!(state.round, 2);
        assert!(state.unit(UnitId(2)).unwrap().dead);
        assert!(state.log_contains("Brute succumbs"));
        assert_eq!(state.advance_phase(), Err(CommandError::BattleOver));
    }

    /// Two commanded lines; the player's Marshal knows fireball and rally
    fn marshals() -> BattleState {
        let grid = BattleGrid::new(8, 8);
        let zones = DeploymentZones::edges(&grid, 1);
        let forces = vec![
            Force::new(
                Faction::Player,
                vec![
                    ForceUnit::new("Marshal", UnitStats::default())
                        .at(HexPosition::new(1, 1))
                        .commander(AuraDefinition::default())
                        .with_abilities(&["fireball", "rally"]),
                    ForceUnit::new("Knight", UnitStats::default())
                        .at(HexPosition::new(2, 1))
                        .with_abilities(&["fireball"]),
                    ForceUnit::new("Squire", UnitStats::default()).at(HexPosition::new(1, 2)),
                ],
            ),
            Force::new(
                Faction::Enemy,
                vec![
                    ForceUnit::new("Warlord", UnitStats::default())
                        .at(HexPosition::new(6, 6))
                        .commander(AuraDefinition::default()),
                    ForceUnit::new("Brute", UnitStats::default()).at(HexPosition::new(6, 5)),
                    ForceUnit::new("Goblin", UnitStats::default()).at(HexPosition::new(5, 6)),
                ],
            ),
        ];
        BattleState::new(grid, zones, forces, AbilityCatalog::standard(), BattleConfig::default(), 3)
            .expect("valid battle")
    }

    fn player_commander(state: &mut BattleState) -> &mut Commander {
        state
            .commanders
            .iter_mut()
            .find(|c| c.faction == Faction::Player)
            .unwrap()
    }

    #[test]
    fn test_cooldowns_split_between_round_tick_and_morale() {
        let fireball = AbilityId::from("fireball");
        let rally = AbilityId::from("rally");
        let mut state = marshals();
        state.advance_phase().unwrap();
        player_commander(&mut state).cooldowns.insert(fireball.clone(), 3);
        player_commander(&mut state).cooldowns.insert(rally.clone(), 2);
        state.unit_mut(UnitId(1)).unwrap().cooldowns.insert(fireball.clone(), 2);

        // Each ticks exactly once across the boundary
        next_round(&mut state).unwrap();
        assert_eq!(player_commander(&mut state).cooldown(&fireball), 2);
        assert_eq!(player_commander(&mut state).cooldown(&rally), 1);
        assert_eq!(state.unit(UnitId(1)).unwrap().cooldown(&fireball), 1);

        // End-of-turn morale only touches command abilities
        state.end_of_turn_morale();
        assert_eq!(player_commander(&mut state).cooldown(&rally), 0);
        assert!(!player_commander(&mut state).cooldowns.contains_key(&rally));
        assert_eq!(player_commander(&mut state).cooldown(&fireball), 2);
        assert_eq!(state.unit(UnitId(1)).unwrap().cooldown(&fireball), 1);
    }

    #[test]
    fn test_auras_refresh_every_second_round() {
        let mut state = marshals();
        state.advance_phase().unwrap();
        assert_eq!(state.last_aura_refresh, 1);
        assert_ne!(state.unit(UnitId(1)).unwrap().aura_bonus(), StatBonus::default());

        next_round(&mut state).unwrap();
        assert_eq!(state.round, 2);
        assert_eq!(state.last_aura_refresh, 1);
        assert_eq!(status_rounds(state.unit(UnitId(1)).unwrap(), "commander aura"), Some(1));

        next_round(&mut state).unwrap();
        assert_eq!(state.round, 3);
        assert_eq!(state.last_aura_refresh, 3);
        assert_eq!(status_rounds(state.unit(UnitId(1)).unwrap(), "commander aura"), Some(2));
    }

    #[test]
    fn test_attack_deals_formula_damage() {
        let mut state = duel();
        state.advance_phase().unwrap();
        state.advance_phase().unwrap();
        let roll = state.attack(UnitId(0), UnitId(2)).expect("adjacent enemy");
        // 10 + floor(2.5) - floor(0.8)
        assert_eq!(roll.amount, 12);
        assert_eq!(state.unit(UnitId(2)).unwrap().stats.hp, 8);
        assert_eq!(
            state.attack(UnitId(0), UnitId(2)),
            Err(CommandError::AlreadyActed(UnitId(0)))
        );
    }

    #[test]
    fn test_attack_rejections_leave_state_untouched() {
        let mut state = duel();
        state.advance_phase().unwrap();
        state.advance_phase().unwrap();
        let before = state.snapshot();

        assert!(matches!(
            state.attack(UnitId(1), UnitId(3)),
            Err(CommandError::OutOfRange { .. })
        ));
        assert_eq!(
            state.attack(UnitId(0), UnitId(1)),
            Err(CommandError::NotHostile(UnitId(0), UnitId(1)))
        );
        assert!(matches!(
            state.attack(UnitId(2), UnitId(0)),
            Err(CommandError::NotYourTurn { .. })
        ));
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_move_once_per_phase() {
        let mut state = duel();
        state.advance_phase().unwrap();
        state.advance_phase().unwrap();

        let path = state.move_unit(UnitId(1), HexPosition::new(2, 0)).expect("open ground");
        assert_eq!(path.cost, 2);
        assert_eq!(state.grid.occupant(HexPosition::new(2, 0)), Some(UnitId(1)));
        assert_eq!(state.grid.occupant(HexPosition::new(0, 0)), None);
        assert_eq!(
            state.move_unit(UnitId(1), HexPosition::new(3, 0)),
            Err(CommandError::AlreadyMoved(UnitId(1)))
        );
    }

    #[test]
    fn test_move_beyond_budget_fails() {
        let mut state = duel();
        state.advance_phase().unwrap();
        state.advance_phase().unwrap();
        assert!(matches!(
            state.move_unit(UnitId(1), HexPosition::new(6, 0)),
            Err(CommandError::NoPath { .. })
        ));
        assert!(matches!(
            state.move_unit(UnitId(1), HexPosition::new(4, 3)),
            Err(CommandError::TileOccupied(_))
        ));
    }

    #[test]
    fn test_victory_when_enemy_destroyed() {
        let mut state = duel();
        state.advance_phase().unwrap();
        for id in [UnitId(2), UnitId(3)] {
            state.unit_mut(id).unwrap().dead = true;
        }
        assert_eq!(state.check_victory(), Some(BattlePhase::Victory));
        assert_eq!(state.check_victory(), Some(BattlePhase::Victory));
        assert_eq!(state.advance_phase(), Err(CommandError::BattleOver));
    }

    #[test]
    fn test_both_sides_destroyed_is_defeat() {
        let mut state = duel();
        state.advance_phase().unwrap();
        for unit in &mut state.units {
            unit.dead = true;
        }
        assert_eq!(state.check_victory(), Some(BattlePhase::Defeat));
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut state = duel();
        state.advance_phase().unwrap();
        let json = serde_json::to_string(&state.snapshot()).unwrap();
        let back: BattleSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state.snapshot());
    }
}

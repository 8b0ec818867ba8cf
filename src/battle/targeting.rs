//! Ability legality and target gathering
//!
//! Shapes expand through the area templates into hex sets, which then
//! resolve to the living units standing on them. The ally-wide shape skips
//! positions entirely.

use crate::battle::abilities::{Ability, AbilityEffect, AbilityId, AbilityShape};
use crate::battle::execution::{BattleState, LogKind};
use crate::battle::hex::HexPosition;
use crate::battle::morale::effects::{apply_morale_effect, describe};
use crate::battle::morale::MoraleModifiers;
use crate::battle::resolution::roll_damage;
use crate::battle::units::Unit;
use crate::core::error::{CommandError, CommandResult};
use crate::core::types::UnitId;

/// What one ability use did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityOutcome {
    pub ability: AbilityId,
    pub targets: Vec<UnitId>,
    pub damage_dealt: i32,
    pub healing_done: i32,
    pub killed: Vec<UnitId>,
}

impl BattleState {
    /// Remaining cooldown for a user: commanders keep theirs on the commander record
    pub fn ability_cooldown(&self, user: &Unit, ability: &AbilityId) -> u32 {
        match self.commander_record(user.id) {
            Some(commander) => commander.cooldown(ability),
            None => user.cooldown(ability),
        }
    }

    /// Legality of an ability use, without any side effect
    ///
    /// Requires a positioned user, the target within range, line of sight
    /// for spells, and no cooldown left.
    pub fn check_ability(
        &self,
        user_id: UnitId,
        ability_id: &AbilityId,
        target: HexPosition,
    ) -> CommandResult<&Ability> {
        let user = self.unit(user_id).ok_or(CommandError::UnitNotFound(user_id))?;
        if user.dead {
            return Err(CommandError::UnitDead(user_id));
        }
        let origin = user.position.ok_or(CommandError::NotDeployed(user_id))?;
        let ability = self
            .catalog
            .get(ability_id)
            .ok_or_else(|| CommandError::UnknownAbility(ability_id.clone()))?;

        let target = if ability.shape.ignores_target() { origin } else { target };
        if !self.grid.contains(target) {
            return Err(CommandError::OffGrid(target));
        }

        let distance = origin.distance(&target);
        if distance > ability.range {
            return Err(CommandError::OutOfRange {
                distance,
                range: ability.range,
            });
        }

        let threshold = self.config.rules.los_elevation_threshold;
        if ability.is_spell() && !self.grid.has_line_of_sight(origin, target, threshold) {
            return Err(CommandError::NoLineOfSight(target));
        }

        let rounds = self.ability_cooldown(user, ability_id);
        if rounds > 0 {
            return Err(CommandError::OnCooldown {
                ability: ability_id.clone(),
                rounds,
            });
        }
        Ok(ability)
    }

    pub fn can_use(&self, user: UnitId, ability: &AbilityId, target: HexPosition) -> bool {
        self.check_ability(user, ability, target).is_ok()
    }

    /// Units an ability would affect, in id order
    ///
    /// Harmful payloads keep only the user's enemies, beneficial payloads
    /// only its allies.
    pub fn gather_targets(&self, user: &Unit, ability: &Ability, target: HexPosition) -> Vec<UnitId> {
        let candidates: Vec<&Unit> = match ability.shape {
            AbilityShape::AllyAll => self
                .units
                .iter()
                .filter(|u| u.is_alive() && u.faction == user.faction)
                .collect(),
            AbilityShape::SelfOnly => vec![user],
            _ => {
                let (Some(origin), Some(template)) = (user.position, ability.shape.template()) else {
                    return Vec::new();
                };
                let area = template.expand(origin, target);
                self.units
                    .iter()
                    .filter(|u| u.is_alive() && u.position.is_some_and(|p| area.contains(&p)))
                    .collect()
            }
        };

        let effect = ability.effect;
        candidates
            .into_iter()
            .filter(|u| {
                if effect.is_harmful() {
                    user.faction.is_hostile_to(u.faction)
                } else if effect.is_beneficial() {
                    u.faction == user.faction
                } else {
                    true
                }
            })
            .map(|u| u.id)
            .collect()
    }

    /// Use an ability; sets its cooldown and always logs
    pub fn use_ability(
        &mut self,
        user_id: UnitId,
        ability_id: &AbilityId,
        target: HexPosition,
    ) -> CommandResult<AbilityOutcome> {
        let user = self.actor(user_id)?;
        if !user.knows(ability_id) {
            return Err(CommandError::AbilityNotKnown {
                unit: user_id,
                ability: ability_id.clone(),
            });
        }
        let ability = self.check_ability(user_id, ability_id, target)?.clone();
        self.check_action(user, ability.ap_cost)?;

        let targets = self.gather_targets(user, &ability, target);
        let user_name = user.name.clone();
        let user_stats = user.effective_stats();
        let modifiers = MoraleModifiers::for_state(user.morale_state());

        self.spend_action(user_id, ability.ap_cost);
        self.set_cooldown(user_id, &ability);

        let mut outcome = AbilityOutcome {
            ability: ability.id.clone(),
            targets: targets.clone(),
            damage_dealt: 0,
            healing_done: 0,
            killed: Vec::new(),
        };
        let mut parts = Vec::new();

        for target_id in targets {
            let Some(unit) = self.unit(target_id).filter(|u| u.is_alive()) else {
                continue;
            };
            let target_name = unit.name.clone();
            let target_stats = unit.effective_stats();

            match ability.effect {
                AbilityEffect::Damage { amount } => {
                    let (offense, defense) = if ability.is_spell() {
                        (user_stats.magic, target_stats.resistance)
                    } else {
                        (user_stats.attack, target_stats.defense)
                    };
                    let roll = roll_damage(
                        amount,
                        offense,
                        defense,
                        user_stats.crit_permille,
                        &modifiers,
                        &self.config.combat,
                        &mut self.rng,
                    );
                    if !roll.hit {
                        parts.push(format!("{} evades", target_name));
                        continue;
                    }
                    let report = self.apply_damage(target_id, roll.amount);
                    outcome.damage_dealt += roll.amount;
                    parts.push(format!(
                        "{} takes {}{}",
                        target_name,
                        roll.amount,
                        if roll.critical { " (critical)" } else { "" }
                    ));
                    if report.killed {
                        outcome.killed.push(target_id);
                        parts.push(format!("{} falls", target_name));
                    }
                    parts.extend(report.fallout);
                }
                AbilityEffect::Heal { amount } => {
                    let healed = self.apply_heal(target_id, amount);
                    outcome.healing_done += healed;
                    parts.push(format!("{} recovers {}", target_name, healed));
                }
                AbilityEffect::Rally { .. } | AbilityEffect::Fear { .. } | AbilityEffect::Banner { .. } => {
                    if let Some(unit) = self.unit_mut(target_id) {
                        if let Some(applied) = apply_morale_effect(unit, &ability.effect) {
                            parts.push(describe(unit, &ability.effect, applied));
                        }
                    }
                }
                AbilityEffect::None => {}
            }
        }

        let text = if parts.is_empty() {
            format!("{} uses {}, to no effect", user_name, ability.name)
        } else {
            format!("{} uses {}: {}", user_name, ability.name, parts.join("; "))
        };
        self.log(LogKind::Ability, text);
        self.check_victory();
        Ok(outcome)
    }

    fn set_cooldown(&mut self, user_id: UnitId, ability: &Ability) {
        if ability.cooldown == 0 {
            return;
        }
        if let Some(commander) = self.commanders.iter_mut().find(|c| c.unit_id == user_id) {
            commander.cooldowns.insert(ability.id.clone(), ability.cooldown);
        } else if let Some(unit) = self.unit_mut(user_id) {
            unit.cooldowns.insert(ability.id.clone(), ability.cooldown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::abilities::AbilityCatalog;
    use crate::battle::battle_map::BattleGrid;
    use crate::battle::deployment::{DeploymentZones, Force, ForceUnit};
    use crate::battle::execution::BattlePhase;
    use crate::battle::units::{AuraDefinition, UnitStats};
    use crate::core::config::BattleConfig;
    use crate::core::types::Faction;

    fn mage_stats() -> UnitStats {
        UnitStats {
            magic: 12,
            ..UnitStats::default()
        }
    }

    /// Player commander mage at (2,2) with a soldier; two enemies
    fn battle() -> BattleState {
        let grid = BattleGrid::new(10, 10);
        let zones = DeploymentZones::new(
            (0..10).map(|r| HexPosition::new(0, r)).collect(),
            (0..10).map(|r| HexPosition::new(9, r)).collect(),
        );
        let abilities = ["fireball", "lightning_bolt", "heal", "rally", "terrifying_roar"];
        let forces = vec![
            Force::new(
                Faction::Player,
                vec![
                    ForceUnit::new("Archmage", mage_stats())
                        .commander(AuraDefinition::default())
                        .with_abilities(&abilities)
                        .at(HexPosition::new(2, 2)),
                    ForceUnit::new("Soldier", UnitStats::default()).at(HexPosition::new(2, 3)),
                ],
            ),
            Force::new(
                Faction::Enemy,
                vec![
                    ForceUnit::new("Orc", UnitStats::default()).at(HexPosition::new(5, 2)),
                    ForceUnit::new("Wolf", UnitStats::default()).at(HexPosition::new(5, 3)),
                ],
            ),
        ];
        let mut state = BattleState::new(
            grid,
            zones,
            forces,
            AbilityCatalog::standard(),
            BattleConfig::default(),
            9,
        )
        .expect("valid battle");
        state.advance_phase().expect("setup -> hero turn");
        assert_eq!(state.phase, BattlePhase::HeroTurn);
        state
    }

    #[test]
    fn test_can_use_range_and_cooldown() {
        let mut state = battle();
        let fireball = AbilityId::from("fireball");
        assert!(state.can_use(UnitId(0), &fireball, HexPosition::new(5, 2)));
        assert!(!state.can_use(UnitId(0), &fireball, HexPosition::new(8, 2)));

        state.use_ability(UnitId(0), &fireball, HexPosition::new(5, 2)).expect("legal");
        assert!(!state.can_use(UnitId(0), &fireball, HexPosition::new(5, 2)));
        assert_eq!(
            state.commander_for(Faction::Player).unwrap().cooldown(&fireball),
            2
        );
    }

    #[test]
    fn test_spell_needs_line_of_sight() {
        let mut state = battle();
        state.grid.set_elevation(HexPosition::new(3, 2), 3);
        let bolt = AbilityId::from("lightning_bolt");
        assert!(!state.can_use(UnitId(0), &bolt, HexPosition::new(5, 2)));
        assert!(matches!(
            state.use_ability(UnitId(0), &bolt, HexPosition::new(5, 2)),
            Err(CommandError::NoLineOfSight(_))
        ));
    }

    #[test]
    fn test_blast_hits_only_enemies() {
        let mut state = battle();
        let fireball = AbilityId::from("fireball");
        let user = state.unit(UnitId(0)).unwrap().clone();
        let ability = state.catalog.get(&fireball).unwrap().clone();
        let targets = state.gather_targets(&user, &ability, HexPosition::new(5, 2));
        assert_eq!(targets, vec![UnitId(2), UnitId(3)]);

        let outcome = state.use_ability(UnitId(0), &fireball, HexPosition::new(5, 2)).unwrap();
        // 8 + floor(12/4) - floor(2/5)
        assert_eq!(outcome.damage_dealt, 22);
        assert!(state.log.last().unwrap().text.contains("Fireball"));
    }

    #[test]
    fn test_rally_reaches_all_allies() {
        let mut state = battle();
        let rally = AbilityId::from("rally");
        let outcome = state.use_ability(UnitId(0), &rally, HexPosition::new(9, 9)).unwrap();
        assert_eq!(outcome.targets, vec![UnitId(0), UnitId(1)]);
        assert_eq!(state.unit(UnitId(1)).unwrap().status_morale(), 10);
    }

    #[test]
    fn test_roar_frightens_enemies_in_reach() {
        let mut state = battle();
        state.relocate(UnitId(2), HexPosition::new(3, 2));
        let roar = AbilityId::from("terrifying_roar");
        let outcome = state.use_ability(UnitId(0), &roar, HexPosition::new(2, 2)).unwrap();
        assert_eq!(outcome.targets, vec![UnitId(2)]);
        assert_eq!(state.unit(UnitId(2)).unwrap().status_morale(), -15);
    }

    #[test]
    fn test_action_points_limit_commander() {
        let mut state = battle();
        let fireball = AbilityId::from("fireball");
        let bolt = AbilityId::from("lightning_bolt");
        state.use_ability(UnitId(0), &fireball, HexPosition::new(5, 2)).unwrap();
        assert!(matches!(
            state.use_ability(UnitId(0), &bolt, HexPosition::new(5, 3)),
            Err(CommandError::NotEnoughActionPoints { needed: 2, available: 1 })
        ));
    }

    #[test]
    fn test_unknown_and_unlearned_abilities() {
        let mut state = battle();
        assert!(matches!(
            state.use_ability(UnitId(0), &AbilityId::from("war_banner"), HexPosition::new(2, 2)),
            Err(CommandError::AbilityNotKnown { .. })
        ));
        assert!(!state.can_use(UnitId(0), &AbilityId::from("meteor"), HexPosition::new(2, 2)));
    }
}

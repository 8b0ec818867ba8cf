//! Battle units, timed statuses and commanders
//!
//! Units are never removed from a battle. Death is a flag: a dead unit keeps
//! its last position for morale and log references but no longer occupies
//! its tile.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::abilities::AbilityId;
use crate::battle::constants::{AURA_STATUS_DURATION, MAX_STATUS_STACKS};
use crate::battle::hex::HexPosition;
use crate::battle::morale::{MoraleBlock, MoraleState};
use crate::core::types::{Faction, UnitId};

/// Base stat block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub magic: i32,
    pub resistance: i32,
    pub speed: i32,
    /// Basic attack reach in hexes
    pub range: u32,
    /// Movement budget per phase
    pub movement: u32,
    /// Critical hit chance in per-mille
    pub crit_permille: i32,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            hp: 20,
            max_hp: 20,
            attack: 5,
            defense: 3,
            magic: 0,
            resistance: 2,
            speed: 5,
            range: 1,
            movement: 4,
            crit_permille: 0,
        }
    }
}

impl UnitStats {
    /// Stats with a bonus folded in (hp and reach untouched)
    pub fn with_bonus(&self, bonus: &StatBonus) -> UnitStats {
        UnitStats {
            attack: self.attack + bonus.attack,
            defense: self.defense + bonus.defense,
            magic: self.magic + bonus.magic,
            resistance: self.resistance + bonus.resistance,
            speed: self.speed + bonus.speed,
            ..*self
        }
    }
}

/// Additive stat modifiers granted by a commander aura
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatBonus {
    pub attack: i32,
    pub defense: i32,
    pub magic: i32,
    pub resistance: i32,
    pub speed: i32,
}

impl StatBonus {
    pub fn combine(&self, other: &StatBonus) -> StatBonus {
        StatBonus {
            attack: self.attack + other.attack,
            defense: self.defense + other.defense,
            magic: self.magic + other.magic,
            resistance: self.resistance + other.resistance,
            speed: self.speed + other.speed,
        }
    }
}

/// Traits that change how a unit reacts to morale effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitTag {
    Undead,
    Construct,
    Fearless,
}

/// Where a morale status came from; same-source statuses stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectSource {
    Rally,
    Inspire,
    Banner,
    Fear,
    Roar,
}

impl EffectSource {
    pub fn label(&self) -> &'static str {
        match self {
            EffectSource::Rally => "rally",
            EffectSource::Inspire => "inspiration",
            EffectSource::Banner => "war banner",
            EffectSource::Fear => "fear",
            EffectSource::Roar => "terrifying roar",
        }
    }
}

/// One family of timed status; amounts are magnitudes, the variant sets the sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    MoraleUp { amount: i32, source: EffectSource },
    MoraleDown { amount: i32, source: EffectSource },
    Fear { amount: i32, source: EffectSource },
    CommanderAura { commander: UnitId, bonus: StatBonus },
    Bleeding { damage: i32 },
    Burning { damage: i32 },
}

impl StatusKind {
    /// Same family and origin; re-applying one of these stacks instead of adding
    pub fn stacks_with(&self, other: &StatusKind) -> bool {
        use StatusKind::*;
        match (self, other) {
            (MoraleUp { source: a, .. }, MoraleUp { source: b, .. }) => a == b,
            (MoraleDown { source: a, .. }, MoraleDown { source: b, .. }) => a == b,
            (Fear { source: a, .. }, Fear { source: b, .. }) => a == b,
            (CommanderAura { commander: a, .. }, CommanderAura { commander: b, .. }) => a == b,
            (Bleeding { .. }, Bleeding { .. }) => true,
            (Burning { .. }, Burning { .. }) => true,
            _ => false,
        }
    }

    /// Does this status lower morale (and so respect fear immunity)?
    pub fn is_demoralizing(&self) -> bool {
        matches!(self, StatusKind::MoraleDown { .. } | StatusKind::Fear { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusKind::MoraleUp { .. } => "morale up",
            StatusKind::MoraleDown { .. } => "morale down",
            StatusKind::Fear { .. } => "fear",
            StatusKind::CommanderAura { .. } => "commander aura",
            StatusKind::Bleeding { .. } => "bleeding",
            StatusKind::Burning { .. } => "burning",
        }
    }
}

/// A timed status on a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub remaining_rounds: u32,
    pub stacks: u8,
}

impl StatusEffect {
    pub fn new(kind: StatusKind, duration: u32) -> Self {
        Self {
            kind,
            remaining_rounds: duration,
            stacks: 1,
        }
    }

    /// Signed contribution to the effects morale factor
    pub fn morale_contribution(&self) -> i32 {
        let stacks = self.stacks as i32;
        match self.kind {
            StatusKind::MoraleUp { amount, .. } => amount * stacks,
            StatusKind::MoraleDown { amount, .. } => -amount * stacks,
            StatusKind::Fear { amount, .. } => -amount * stacks,
            _ => 0,
        }
    }

    /// Damage dealt at the start of each round
    pub fn periodic_damage(&self) -> i32 {
        let stacks = self.stacks as i32;
        match self.kind {
            StatusKind::Bleeding { damage } | StatusKind::Burning { damage } => damage * stacks,
            _ => 0,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_rounds == 0
    }
}

/// What happened when a status was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusApplication {
    Added,
    Stacked { stacks: u8 },
    Immune,
}

/// Loot carried into battle and dropped on death
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootStack {
    pub item: String,
    pub quantity: u32,
}

impl LootStack {
    pub fn new(item: impl Into<String>, quantity: u32) -> Self {
        Self {
            item: item.into(),
            quantity,
        }
    }
}

/// A single combatant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub faction: Faction,
    pub is_commander: bool,
    pub level: u32,
    pub stats: UnitStats,
    /// None while off the field
    pub position: Option<HexPosition>,
    pub statuses: Vec<StatusEffect>,
    pub dead: bool,
    /// Created the first time morale is evaluated
    pub morale: Option<MoraleBlock>,
    pub tags: Vec<UnitTag>,
    pub abilities: Vec<AbilityId>,
    /// Cooldowns for non-commander ability users
    pub cooldowns: BTreeMap<AbilityId, u32>,
    pub has_moved: bool,
    pub has_acted: bool,
    pub loot: Vec<LootStack>,
}

impl Unit {
    pub fn new(id: UnitId, name: impl Into<String>, faction: Faction, stats: UnitStats) -> Self {
        Self {
            id,
            name: name.into(),
            faction,
            is_commander: false,
            level: 1,
            stats,
            position: None,
            statuses: Vec::new(),
            dead: false,
            morale: None,
            tags: Vec::new(),
            abilities: Vec::new(),
            cooldowns: BTreeMap::new(),
            has_moved: false,
            has_acted: false,
            loot: Vec::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Alive and standing on the grid
    pub fn is_active(&self) -> bool {
        !self.dead && self.position.is_some()
    }

    pub fn hp_fraction(&self) -> f64 {
        if self.stats.max_hp <= 0 {
            return 0.0;
        }
        self.stats.hp.max(0) as f64 / self.stats.max_hp as f64
    }

    pub fn has_tag(&self, tag: UnitTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Undead, constructs and the fearless ignore fear
    pub fn is_fear_immune(&self) -> bool {
        self.tags
            .iter()
            .any(|t| matches!(t, UnitTag::Undead | UnitTag::Construct | UnitTag::Fearless))
    }

    /// Current morale state (steady until first evaluated)
    pub fn morale_state(&self) -> MoraleState {
        self.morale.as_ref().map(|m| m.state).unwrap_or_default()
    }

    pub fn is_routing(&self) -> bool {
        self.morale_state() == MoraleState::Routing
    }

    /// Lazily attach a morale block
    pub fn morale_mut(&mut self, default_value: i32) -> &mut MoraleBlock {
        self.morale
            .get_or_insert_with(|| MoraleBlock::new(default_value))
    }

    /// Sum of every aura bonus currently on the unit
    pub fn aura_bonus(&self) -> StatBonus {
        self.statuses
            .iter()
            .filter_map(|s| match s.kind {
                StatusKind::CommanderAura { bonus, .. } => Some(bonus),
                _ => None,
            })
            .fold(StatBonus::default(), |acc, b| acc.combine(&b))
    }

    /// Base stats plus aura bonuses
    pub fn effective_stats(&self) -> UnitStats {
        self.stats.with_bonus(&self.aura_bonus())
    }

    /// Signed sum of morale statuses
    pub fn status_morale(&self) -> i32 {
        self.statuses.iter().map(|s| s.morale_contribution()).sum()
    }

    /// Apply a status; a matching status refreshes its duration and gains a stack
    pub fn apply_status(&mut self, kind: StatusKind, duration: u32) -> StatusApplication {
        if kind.is_demoralizing() && self.is_fear_immune() {
            return StatusApplication::Immune;
        }

        if let Some(existing) = self.statuses.iter_mut().find(|s| s.kind.stacks_with(&kind)) {
            existing.kind = kind;
            existing.remaining_rounds = existing.remaining_rounds.max(duration);
            existing.stacks = (existing.stacks + 1).min(MAX_STATUS_STACKS);
            return StatusApplication::Stacked {
                stacks: existing.stacks,
            };
        }

        self.statuses.push(StatusEffect::new(kind, duration));
        StatusApplication::Added
    }

    /// Grant an aura status without stacking
    pub fn apply_aura(&mut self, commander: UnitId, bonus: StatBonus) {
        self.statuses.retain(|s| {
            !matches!(s.kind, StatusKind::CommanderAura { commander: c, .. } if c == commander)
        });
        self.statuses.push(StatusEffect::new(
            StatusKind::CommanderAura { commander, bonus },
            AURA_STATUS_DURATION,
        ));
    }

    /// Remove aura statuses, from one commander or from all of them
    pub fn strip_auras(&mut self, commander: Option<UnitId>) -> usize {
        let before = self.statuses.len();
        self.statuses.retain(|s| match s.kind {
            StatusKind::CommanderAura { commander: c, .. } => commander.is_some_and(|id| id != c),
            _ => true,
        });
        before - self.statuses.len()
    }

    /// Advance status timers by one round
    ///
    /// Returns the periodic damage owed this round; expired statuses are
    /// removed after their last tick.
    pub fn tick_statuses(&mut self) -> i32 {
        let damage = self.statuses.iter().map(|s| s.periodic_damage()).sum();
        for status in &mut self.statuses {
            status.remaining_rounds = status.remaining_rounds.saturating_sub(1);
        }
        self.statuses.retain(|s| !s.is_expired());
        damage
    }

    /// Reduce hp; returns true only on the hit that kills
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if self.dead {
            return false;
        }
        self.stats.hp -= amount.max(0);
        if self.stats.hp <= 0 {
            self.stats.hp = 0;
            self.dead = true;
            return true;
        }
        false
    }

    /// Heal up to max hp; returns the hp actually restored
    pub fn heal(&mut self, amount: i32) -> i32 {
        if self.dead {
            return 0;
        }
        let before = self.stats.hp;
        self.stats.hp = self.stats.max_hp.min(self.stats.hp + amount.max(0));
        self.stats.hp - before
    }

    /// Cooldown remaining on one of the unit's own abilities
    pub fn cooldown(&self, ability: &AbilityId) -> u32 {
        self.cooldowns.get(ability).copied().unwrap_or(0)
    }

    pub fn knows(&self, ability: &AbilityId) -> bool {
        self.abilities.contains(ability)
    }

    pub fn reset_turn_flags(&mut self) {
        self.has_moved = false;
        self.has_acted = false;
    }
}

/// Commander aura: stat bonus within a radius plus leadership power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuraDefinition {
    pub bonus: StatBonus,
    pub radius: u32,
    /// Leadership before distance falloff
    pub power: i32,
}

impl Default for AuraDefinition {
    fn default() -> Self {
        Self {
            bonus: StatBonus {
                attack: 1,
                defense: 1,
                ..StatBonus::default()
            },
            radius: 3,
            power: 12,
        }
    }
}

/// Runtime record for a faction's commander
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commander {
    pub unit_id: UnitId,
    pub faction: Faction,
    pub aura: AuraDefinition,
    pub cooldowns: BTreeMap<AbilityId, u32>,
    pub action_points: i32,
    pub max_action_points: i32,
}

impl Commander {
    pub fn new(unit_id: UnitId, faction: Faction, aura: AuraDefinition, max_action_points: i32) -> Self {
        Self {
            unit_id,
            faction,
            aura,
            cooldowns: BTreeMap::new(),
            action_points: max_action_points,
            max_action_points,
        }
    }

    pub fn cooldown(&self, ability: &AbilityId) -> u32 {
        self.cooldowns.get(ability).copied().unwrap_or(0)
    }

    pub fn spend(&mut self, cost: i32) -> bool {
        if cost > self.action_points {
            return false;
        }
        self.action_points -= cost;
        true
    }
}

/// Decrement a cooldown map, keeping only entries selected by `tick`
pub(crate) fn tick_cooldowns(
    cooldowns: &mut BTreeMap<AbilityId, u32>,
    mut tick: impl FnMut(&AbilityId) -> bool,
) {
    for (id, remaining) in cooldowns.iter_mut() {
        if tick(id) {
            *remaining = remaining.saturating_sub(1);
        }
    }
    cooldowns.retain(|_, remaining| *remaining > 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Unit {
        Unit::new(UnitId(0), "Spearman", Faction::Player, UnitStats::default())
    }

    #[test]
    fn test_death_is_flagged_once() {
        let mut u = unit();
        assert!(!u.take_damage(5));
        assert!(u.take_damage(100));
        assert!(u.dead);
        assert_eq!(u.stats.hp, 0);
        assert!(!u.take_damage(5), "already dead");
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut u = unit();
        u.take_damage(5);
        assert_eq!(u.heal(100), 5);
        assert_eq!(u.stats.hp, u.stats.max_hp);
    }

    #[test]
    fn test_status_stacks_same_source() {
        let mut u = unit();
        let rally = StatusKind::MoraleUp {
            amount: 10,
            source: EffectSource::Rally,
        };
        assert_eq!(u.apply_status(rally, 2), StatusApplication::Added);
        assert_eq!(u.apply_status(rally, 3), StatusApplication::Stacked { stacks: 2 });
        assert_eq!(u.statuses.len(), 1);
        assert_eq!(u.statuses[0].remaining_rounds, 3);
        assert_eq!(u.status_morale(), 20);

        for _ in 0..5 {
            u.apply_status(rally, 2);
        }
        assert_eq!(u.statuses[0].stacks, MAX_STATUS_STACKS);
    }

    #[test]
    fn test_different_sources_do_not_stack() {
        let mut u = unit();
        u.apply_status(
            StatusKind::MoraleUp {
                amount: 10,
                source: EffectSource::Rally,
            },
            2,
        );
        u.apply_status(
            StatusKind::MoraleUp {
                amount: 5,
                source: EffectSource::Banner,
            },
            3,
        );
        assert_eq!(u.statuses.len(), 2);
        assert_eq!(u.status_morale(), 15);
    }

    #[test]
    fn test_fear_immunity() {
        let mut u = unit();
        u.tags.push(UnitTag::Undead);
        let fear = StatusKind::Fear {
            amount: 15,
            source: EffectSource::Roar,
        };
        assert_eq!(u.apply_status(fear, 2), StatusApplication::Immune);
        assert!(u.statuses.is_empty());
    }

    #[test]
    fn test_tick_expires_and_bleeds() {
        let mut u = unit();
        u.apply_status(StatusKind::Bleeding { damage: 2 }, 1);
        u.apply_status(
            StatusKind::MoraleDown {
                amount: 5,
                source: EffectSource::Fear,
            },
            2,
        );
        assert_eq!(u.tick_statuses(), 2);
        assert_eq!(u.statuses.len(), 1);
        assert_eq!(u.tick_statuses(), 0);
        assert!(u.statuses.is_empty());
    }

    #[test]
    fn test_aura_bonus_feeds_effective_stats() {
        let mut u = unit();
        let bonus = StatBonus {
            attack: 2,
            defense: 1,
            ..StatBonus::default()
        };
        u.apply_aura(UnitId(7), bonus);
        u.apply_aura(UnitId(7), bonus);
        assert_eq!(u.effective_stats().attack, u.stats.attack + 2);
        assert_eq!(u.strip_auras(Some(UnitId(8))), 0);
        assert_eq!(u.strip_auras(Some(UnitId(7))), 1);
        assert_eq!(u.effective_stats(), u.stats);
    }

    #[test]
    fn test_tick_cooldowns_selective() {
        let mut map = BTreeMap::new();
        map.insert(AbilityId::from("fireball"), 1);
        map.insert(AbilityId::from("rally"), 2);
        tick_cooldowns(&mut map, |id| id.as_str() != "rally");
        assert!(!map.contains_key(&AbilityId::from("fireball")));
        assert_eq!(map.get(&AbilityId::from("rally")), Some(&2));
    }

    #[test]
    fn test_commander_spends_action_points() {
        let mut c = Commander::new(UnitId(1), Faction::Player, AuraDefinition::default(), 3);
        assert!(c.spend(2));
        assert!(!c.spend(2));
        assert_eq!(c.action_points, 1);
    }
}

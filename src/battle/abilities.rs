//! Ability templates and the catalog they are looked up in
//!
//! Shapes and effects are closed enums; adding one is a compile-checked
//! change to every match that resolves them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::battle::templates::AreaTemplate;
use crate::battle::units::EffectSource;

/// Stable ability identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AbilityId(pub String);

impl AbilityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AbilityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityCategory {
    Attack,
    /// Needs line of sight; rolls magic against resistance
    Spell,
    /// Morale abilities; cooldowns decay in end-of-turn processing
    Command,
}

/// Area an ability covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityShape {
    Single,
    SelfOnly,
    Blast1,
    Blast2,
    Line,
    /// Every living unit of the user's faction, wherever it stands
    AllyAll,
}

impl AbilityShape {
    /// Positional template, or None for shapes that ignore the target hex
    pub fn template(&self) -> Option<AreaTemplate> {
        match self {
            AbilityShape::Single => Some(AreaTemplate::Circle { radius: 0 }),
            AbilityShape::Blast1 => Some(AreaTemplate::Circle { radius: 1 }),
            AbilityShape::Blast2 => Some(AreaTemplate::Circle { radius: 2 }),
            AbilityShape::Line => Some(AreaTemplate::Bolt { max_steps: None }),
            AbilityShape::SelfOnly | AbilityShape::AllyAll => None,
        }
    }

    /// Shapes whose target is implied by the user
    pub fn ignores_target(&self) -> bool {
        matches!(self, AbilityShape::SelfOnly | AbilityShape::AllyAll)
    }
}

/// Payload applied to every gathered target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityEffect {
    Damage {
        amount: i32,
    },
    Heal {
        amount: i32,
    },
    Rally {
        amount: i32,
        duration: u32,
        source: EffectSource,
    },
    Fear {
        amount: i32,
        duration: u32,
        source: EffectSource,
    },
    Banner {
        amount: i32,
        duration: u32,
    },
    None,
}

impl AbilityEffect {
    /// Harmful payloads only land on enemies of the user
    pub fn is_harmful(&self) -> bool {
        matches!(self, AbilityEffect::Damage { .. } | AbilityEffect::Fear { .. })
    }

    /// Beneficial payloads only land on the user's allies
    pub fn is_beneficial(&self) -> bool {
        matches!(
            self,
            AbilityEffect::Heal { .. } | AbilityEffect::Rally { .. } | AbilityEffect::Banner { .. }
        )
    }
}

/// Immutable ability template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub id: AbilityId,
    pub name: String,
    pub category: AbilityCategory,
    pub ap_cost: i32,
    pub range: u32,
    pub shape: AbilityShape,
    pub effect: AbilityEffect,
    /// Rounds before the ability can be used again
    pub cooldown: u32,
}

impl Ability {
    pub fn is_spell(&self) -> bool {
        self.category == AbilityCategory::Spell
    }

    pub fn is_command(&self) -> bool {
        self.category == AbilityCategory::Command
    }
}

/// All abilities known to a battle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbilityCatalog {
    abilities: BTreeMap<AbilityId, Ability>,
}

impl AbilityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock ability set
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        let entries = [
            ("strike", "Strike", AbilityCategory::Attack, 1, 1, AbilityShape::Single, AbilityEffect::Damage { amount: 4 }, 0),
            ("fireball", "Fireball", AbilityCategory::Spell, 2, 4, AbilityShape::Blast1, AbilityEffect::Damage { amount: 8 }, 2),
            ("lightning_bolt", "Lightning Bolt", AbilityCategory::Spell, 2, 5, AbilityShape::Line, AbilityEffect::Damage { amount: 6 }, 2),
            ("heal", "Heal", AbilityCategory::Spell, 1, 3, AbilityShape::Single, AbilityEffect::Heal { amount: 10 }, 1),
            (
                "rally",
                "Rally",
                AbilityCategory::Command,
                1,
                0,
                AbilityShape::AllyAll,
                AbilityEffect::Rally { amount: 10, duration: 2, source: EffectSource::Rally },
                3,
            ),
            (
                "inspirational_speech",
                "Inspirational Speech",
                AbilityCategory::Command,
                2,
                0,
                AbilityShape::Blast2,
                AbilityEffect::Rally { amount: 15, duration: 3, source: EffectSource::Inspire },
                4,
            ),
            (
                "terrifying_roar",
                "Terrifying Roar",
                AbilityCategory::Command,
                2,
                0,
                AbilityShape::Blast2,
                AbilityEffect::Fear { amount: 15, duration: 2, source: EffectSource::Roar },
                4,
            ),
            (
                "war_banner",
                "War Banner",
                AbilityCategory::Command,
                1,
                2,
                AbilityShape::Blast1,
                AbilityEffect::Banner { amount: 5, duration: 3 },
                3,
            ),
        ];

        for (id, name, category, ap_cost, range, shape, effect, cooldown) in entries {
            catalog.insert(Ability {
                id: AbilityId::from(id),
                name: name.to_string(),
                category,
                ap_cost,
                range,
                shape,
                effect,
                cooldown,
            });
        }
        catalog
    }

    pub fn insert(&mut self, ability: Ability) {
        self.abilities.insert(ability.id.clone(), ability);
    }

    pub fn get(&self, id: &AbilityId) -> Option<&Ability> {
        self.abilities.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ability> {
        self.abilities.values()
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    /// Is this a command-category ability?
    pub fn is_command(&self, id: &AbilityId) -> bool {
        self.get(id).is_some_and(|a| a.is_command())
    }
}

//! Terminal battle summary handed back to the surrounding game

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::constants::{GEAR_WEAR_DIVISOR, GOLD_PER_LEVEL};
use crate::battle::execution::{BattlePhase, BattleState, LogKind};
use crate::battle::units::LootStack;
use crate::core::types::{Faction, Round, UnitId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Casualty {
    pub id: UnitId,
    pub name: String,
    pub faction: Faction,
    pub is_commander: bool,
}

/// Wear on one surviving or fallen player unit's gear, in percent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearWear {
    pub unit: UnitId,
    pub name: String,
    pub wear: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    /// None for a battle that was stopped before either side won
    pub winner: Option<Faction>,
    pub rounds: Round,
    pub casualties: Vec<Casualty>,
    pub loot: Vec<LootStack>,
    pub gold_delta: i64,
    pub gear_wear: Vec<GearWear>,
    /// Morale and outcome lines from the log, in order
    pub narrative: Vec<String>,
}

impl BattleResult {
    pub fn casualties_of(&self, faction: Faction) -> usize {
        self.casualties.iter().filter(|c| c.faction == faction).count()
    }
}

/// Merge stacks of the same item, ordered by item name
pub fn merge_loot<'a>(stacks: impl IntoIterator<Item = &'a LootStack>) -> Vec<LootStack> {
    let mut merged: BTreeMap<&str, u32> = BTreeMap::new();
    for stack in stacks {
        *merged.entry(stack.item.as_str()).or_default() += stack.quantity;
    }
    merged
        .into_iter()
        .filter(|(_, quantity)| *quantity > 0)
        .map(|(item, quantity)| LootStack::new(item, quantity))
        .collect()
}

impl BattleState {
    pub fn winner(&self) -> Option<Faction> {
        match self.phase {
            BattlePhase::Victory => Some(Faction::Player),
            BattlePhase::Defeat => Some(Faction::Enemy),
            _ => None,
        }
    }

    /// Summary of the battle so far
    ///
    /// Spoils are only granted on a decided battle: a victory pays out the
    /// fallen enemies' levels and carries their loot, a defeat costs gold
    /// scaled by the whole enemy force.
    pub fn summarize(&self) -> BattleResult {
        let winner = self.winner();

        let casualties = self
            .units
            .iter()
            .filter(|u| u.dead)
            .map(|u| Casualty {
                id: u.id,
                name: u.name.clone(),
                faction: u.faction,
                is_commander: u.is_commander,
            })
            .collect();

        let enemies = || self.units.iter().filter(|u| u.faction == Faction::Enemy);
        let (gold_delta, loot) = match winner {
            Some(Faction::Player) => {
                let fallen = || enemies().filter(|u| u.dead);
                let gold = fallen().map(|u| GOLD_PER_LEVEL * i64::from(u.level)).sum();
                (gold, merge_loot(fallen().flat_map(|u| u.loot.iter())))
            }
            Some(Faction::Enemy) => {
                let levels: i64 = enemies().map(|u| i64::from(u.level)).sum();
                (-GOLD_PER_LEVEL * levels, Vec::new())
            }
            _ => (0, Vec::new()),
        };

        let gear_wear = self
            .units
            .iter()
            .filter(|u| u.faction == Faction::Player)
            .map(|u| {
                let max = u.stats.max_hp.max(1);
                let lost = (max - u.stats.hp.max(0)).clamp(0, max);
                let percent = (lost * 100 / max) as u32;
                GearWear {
                    unit: u.id,
                    name: u.name.clone(),
                    wear: percent / GEAR_WEAR_DIVISOR,
                }
            })
            .collect();

        let narrative = self
            .log
            .iter()
            .filter(|e| matches!(e.kind, LogKind::Morale | LogKind::Outcome))
            .map(|e| e.text.clone())
            .collect();

        BattleResult {
            winner,
            rounds: self.round,
            casualties,
            loot,
            gold_delta,
            gear_wear,
            narrative,
        }
    }

    /// The final result, once the battle has ended
    pub fn result(&self) -> Option<BattleResult> {
        self.is_finished().then(|| self.summarize())
    }
}

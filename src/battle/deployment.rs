//! Forces, deployment zones and battle construction
//!
//! Forces arrive as plain rosters. Construction turns them into units with
//! sequential ids; units with a preset position are placed immediately, the
//! rest are placed during setup, by hand or by `auto_deploy`.

use std::collections::BTreeSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::battle::abilities::{AbilityCatalog, AbilityId};
use crate::battle::battle_map::BattleGrid;
use crate::battle::execution::{BattlePhase, BattleState, LogKind};
use crate::battle::hex::HexPosition;
use crate::battle::units::{AuraDefinition, Commander, LootStack, Unit, UnitStats, UnitTag};
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, CommandError, CommandResult, Result};
use crate::core::types::{Faction, UnitId};

/// Hexes each side may deploy into
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentZones {
    pub player: Vec<HexPosition>,
    pub enemy: Vec<HexPosition>,
}

impl DeploymentZones {
    pub fn new(player: Vec<HexPosition>, enemy: Vec<HexPosition>) -> Self {
        Self { player, enemy }
    }

    /// Columns at the left and right edges of a grid
    pub fn edges(grid: &BattleGrid, depth: u32) -> Self {
        let depth = depth.min(grid.width) as i32;
        let width = grid.width as i32;
        let column = |q: i32| (0..grid.height as i32).map(move |r| HexPosition::new(q, r));
        Self {
            player: (0..depth).flat_map(column).collect(),
            enemy: (0..depth).flat_map(|d| column(width - 1 - d)).collect(),
        }
    }

    pub fn zone_for(&self, faction: Faction) -> &[HexPosition] {
        match faction {
            Faction::Player => &self.player,
            Faction::Enemy => &self.enemy,
            Faction::Neutral => &[],
        }
    }
}

/// One unit in an inbound roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceUnit {
    pub name: String,
    pub level: u32,
    pub stats: UnitStats,
    #[serde(default)]
    pub tags: Vec<UnitTag>,
    #[serde(default)]
    pub position: Option<HexPosition>,
    #[serde(default)]
    pub is_commander: bool,
    #[serde(default)]
    pub aura: Option<AuraDefinition>,
    #[serde(default)]
    pub abilities: Vec<AbilityId>,
    #[serde(default)]
    pub loot: Vec<LootStack>,
}

impl ForceUnit {
    pub fn new(name: impl Into<String>, stats: UnitStats) -> Self {
        Self {
            name: name.into(),
            level: 1,
            stats,
            tags: Vec::new(),
            position: None,
            is_commander: false,
            aura: None,
            abilities: Vec::new(),
            loot: Vec::new(),
        }
    }

    pub fn at(mut self, position: HexPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn commander(mut self, aura: AuraDefinition) -> Self {
        self.is_commander = true;
        self.aura = Some(aura);
        self
    }

    pub fn with_tags(mut self, tags: &[UnitTag]) -> Self {
        self.tags.extend_from_slice(tags);
        self
    }

    pub fn with_abilities(mut self, abilities: &[&str]) -> Self {
        self.abilities.extend(abilities.iter().map(|a| AbilityId::from(*a)));
        self
    }

    pub fn with_loot(mut self, loot: LootStack) -> Self {
        self.loot.push(loot);
        self
    }
}

/// A faction's roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Force {
    pub faction: Faction,
    pub units: Vec<ForceUnit>,
}

impl Force {
    pub fn new(faction: Faction, units: Vec<ForceUnit>) -> Self {
        Self { faction, units }
    }
}

impl BattleState {
    /// Build a battle in the Setup phase
    ///
    /// Fails on zones that leave the grid, more than one commander per
    /// faction, or preset positions that are off the grid or taken.
    pub fn new(
        grid: BattleGrid,
        zones: DeploymentZones,
        forces: Vec<Force>,
        catalog: AbilityCatalog,
        config: BattleConfig,
        seed: u64,
    ) -> Result<Self> {
        for pos in zones.player.iter().chain(zones.enemy.iter()) {
            if !grid.contains(*pos) {
                return Err(BattleError::OffGrid(*pos));
            }
        }

        let mut state = BattleState {
            round: 0,
            phase: BattlePhase::Setup,
            grid,
            commanders: Vec::new(),
            units: Vec::new(),
            initiative: Vec::new(),
            log: Vec::new(),
            zones,
            catalog,
            config,
            last_aura_refresh: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            warned: BTreeSet::new(),
        };

        for force in forces {
            for member in force.units {
                state.enlist(force.faction, member)?;
            }
        }

        tracing::info!(
            "Battle created: {} units, {} commanders, seed {}",
            state.units.len(),
            state.commanders.len(),
            seed
        );
        Ok(state)
    }

    fn enlist(&mut self, faction: Faction, member: ForceUnit) -> Result<()> {
        let id = UnitId(self.units.len() as u32);
        if member.stats.max_hp <= 0 {
            return Err(BattleError::InvalidForce(format!(
                "{} has no hit points",
                member.name
            )));
        }

        if member.is_commander {
            if self.commanders.iter().any(|c| c.faction == faction) {
                return Err(BattleError::DuplicateCommander(faction));
            }
            let aura = member.aura.unwrap_or_default();
            let ap = self.config.combat.commander_action_points;
            self.commanders.push(Commander::new(id, faction, aura, ap));
        }

        let mut unit = Unit::new(id, member.name, faction, member.stats);
        unit.level = member.level;
        unit.is_commander = member.is_commander;
        unit.tags = member.tags;
        unit.abilities = member.abilities;
        unit.loot = member.loot;
        unit.stats.hp = unit.stats.hp.clamp(1, unit.stats.max_hp);
        self.units.push(unit);

        if let Some(pos) = member.position {
            if !self.grid.contains(pos) {
                return Err(BattleError::OffGrid(pos));
            }
            if !self.grid.is_free(pos) {
                return Err(BattleError::TileOccupied(pos));
            }
            self.place(id, pos);
        }
        Ok(())
    }

    fn place(&mut self, id: UnitId, pos: HexPosition) {
        if let Some(old) = self.unit(id).and_then(|u| u.position) {
            self.grid.set_occupant(old, None);
        }
        self.grid.set_occupant(pos, Some(id));
        if let Some(unit) = self.unit_mut(id) {
            unit.position = Some(pos);
        }
    }

    /// Place (or re-place) a unit inside its faction's zone during setup
    pub fn deploy(&mut self, id: UnitId, pos: HexPosition) -> CommandResult<()> {
        if self.phase != BattlePhase::Setup {
            return Err(CommandError::WrongPhase(self.phase));
        }
        let unit = self.unit(id).ok_or(CommandError::UnitNotFound(id))?;
        if unit.dead {
            return Err(CommandError::UnitDead(id));
        }
        if !self.grid.contains(pos) {
            return Err(CommandError::OffGrid(pos));
        }
        if !self.zones.zone_for(unit.faction).contains(&pos) {
            return Err(CommandError::OutsideDeploymentZone(pos));
        }
        if self.grid.occupant(pos).is_some_and(|other| other != id) || !self.grid.is_passable(pos) {
            return Err(CommandError::TileOccupied(pos));
        }

        let name = unit.name.clone();
        self.place(id, pos);
        self.log(LogKind::Deployment, format!("{} deploys at {}", name, pos));
        Ok(())
    }

    /// Place every undeployed living unit in the first free hexes of its zone
    ///
    /// All placements are planned first, so a zone that is too small
    /// leaves the state untouched.
    pub fn auto_deploy(&mut self) -> CommandResult<usize> {
        if self.phase != BattlePhase::Setup {
            return Err(CommandError::WrongPhase(self.phase));
        }

        let mut claimed: BTreeSet<HexPosition> = BTreeSet::new();
        let mut plan = Vec::new();
        for unit in self.units.iter().filter(|u| u.is_alive() && u.position.is_none()) {
            let zone = self.zones.zone_for(unit.faction);
            if zone.is_empty() {
                // Neutral units without a zone stay off the field
                continue;
            }
            let spot = zone
                .iter()
                .copied()
                .find(|p| self.grid.is_free(*p) && !claimed.contains(p))
                .ok_or(CommandError::DeploymentZoneFull(unit.faction))?;
            claimed.insert(spot);
            plan.push((unit.id, spot));
        }

        let placed = plan.len();
        for (id, pos) in plan {
            self.place(id, pos);
        }
        if placed > 0 {
            self.log(LogKind::Deployment, format!("{} units take the field", placed));
        }
        Ok(placed)
    }
}

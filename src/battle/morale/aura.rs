//! Commander auras
//!
//! An aura is a timed status granted to every living same-faction unit in
//! the commander's radius. Refreshing strips all aura statuses and grants
//! them again from the commanders still standing.

use crate::battle::hex::HexPosition;
use crate::battle::units::{Commander, StatBonus, Unit};
use crate::core::types::{Faction, UnitId};

/// A live aura emitter resolved from a commander record
#[derive(Debug, Clone, Copy)]
struct AuraSource {
    commander: UnitId,
    faction: Faction,
    position: HexPosition,
    radius: u32,
    bonus: StatBonus,
}

fn live_sources(units: &[Unit], commanders: &[Commander]) -> Vec<AuraSource> {
    commanders
        .iter()
        .filter_map(|c| {
            let unit = units.iter().find(|u| u.id == c.unit_id)?;
            let position = unit.position.filter(|_| unit.is_alive())?;
            Some(AuraSource {
                commander: c.unit_id,
                faction: c.faction,
                position,
                radius: c.aura.radius,
                bonus: c.aura.bonus,
            })
        })
        .collect()
}

/// Re-grant every aura from scratch; returns how many statuses were granted
pub fn refresh_auras(units: &mut [Unit], commanders: &[Commander]) -> usize {
    let sources = live_sources(units, commanders);
    let mut granted = 0;

    for unit in units.iter_mut() {
        unit.strip_auras(None);
        if !unit.is_alive() {
            continue;
        }
        let Some(pos) = unit.position else {
            continue;
        };
        for source in &sources {
            if source.faction == unit.faction
                && source.commander != unit.id
                && source.position.distance(&pos) <= source.radius
            {
                unit.apply_aura(source.commander, source.bonus);
                granted += 1;
            }
        }
    }

    tracing::debug!("Aura refresh granted {} statuses", granted);
    granted
}

/// Remove one commander's aura from every unit
pub fn strip_commander_auras(units: &mut [Unit], commander: UnitId) -> usize {
    units
        .iter_mut()
        .map(|u| u.strip_auras(Some(commander)))
        .sum()
}

/// Is a refresh due this round?
pub fn refresh_due(round: u32, last_refresh: u32, interval: u32) -> bool {
    interval > 0 && round.saturating_sub(last_refresh) >= interval
}

//! Automated phase drivers
//!
//! Architecture: a `BattleAi` trait issues ordinary commands for whichever
//! side holds the current phase, and `auto_battle` alternates the two
//! drivers with `advance_phase` until the battle ends or a round cap is hit.

mod greedy;

pub use greedy::GreedyAi;

use crate::battle::execution::{BattlePhase, BattleState};
use crate::battle::outcome::BattleResult;
use crate::core::error::CommandResult;
use crate::core::types::Faction;

/// Trait for battle AI implementations
pub trait BattleAi {
    /// Issue commands for the current phase; returns how many succeeded
    fn take_phase(&mut self, state: &mut BattleState) -> usize;

    fn name(&self) -> &str;
}

/// Run a battle with AI on both sides
///
/// Stops after `max_rounds` rounds with an undecided result if neither side
/// has won by then.
pub fn auto_battle(
    state: &mut BattleState,
    player: &mut dyn BattleAi,
    enemy: &mut dyn BattleAi,
    max_rounds: u32,
) -> CommandResult<BattleResult> {
    if state.phase == BattlePhase::Setup {
        state.advance_phase()?;
    }

    while !state.is_finished() && state.round <= max_rounds {
        let phase = state.phase;
        let (name, issued) = match phase.acting_faction() {
            Some(Faction::Player) => (player.name().to_string(), player.take_phase(state)),
            Some(_) => (enemy.name().to_string(), enemy.take_phase(state)),
            None => break,
        };
        tracing::trace!(
            "{} issued {} commands during {:?} of round {}",
            name,
            issued,
            phase,
            state.round
        );
        if state.is_finished() {
            break;
        }
        state.advance_phase()?;
    }

    if !state.is_finished() {
        tracing::info!("Battle stopped undecided after {} rounds", max_rounds);
    }
    Ok(state.summarize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::abilities::AbilityCatalog;
    use crate::battle::battle_map::BattleGrid;
    use crate::battle::deployment::{DeploymentZones, Force, ForceUnit};
    use crate::battle::units::{AuraDefinition, UnitStats};
    use crate::core::config::BattleConfig;

    fn line(faction: Faction, n: usize, attack: i32) -> Force {
        let mut units: Vec<ForceUnit> = (0..n)
            .map(|i| {
                ForceUnit::new(
                    format!("{:?} soldier {}", faction, i),
                    UnitStats {
                        attack,
                        ..UnitStats::default()
                    },
                )
            })
            .collect();
        units.push(
            ForceUnit::new(format!("{:?} captain", faction), UnitStats::default())
                .commander(AuraDefinition::default())
                .with_abilities(&["strike", "rally"]),
        );
        Force::new(faction, units)
    }

    fn battle(seed: u64) -> BattleState {
        let grid = BattleGrid::new(8, 6);
        let zones = DeploymentZones::edges(&grid, 1);
        let forces = vec![line(Faction::Player, 4, 12), line(Faction::Enemy, 3, 4)];
        BattleState::new(grid, zones, forces, AbilityCatalog::standard(), BattleConfig::default(), seed)
            .unwrap()
    }

    #[test]
    fn test_auto_battle_reaches_an_end() {
        let mut state = battle(5);
        let result = auto_battle(&mut state, &mut GreedyAi::new(), &mut GreedyAi::new(), 60).unwrap();
        assert!(state.is_finished());
        assert_eq!(result.winner, Some(Faction::Player));
    }

    #[test]
    fn test_auto_battle_is_deterministic() {
        let run = |seed| {
            let mut state = battle(seed);
            auto_battle(&mut state, &mut GreedyAi::new(), &mut GreedyAi::new(), 60).unwrap()
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn test_round_cap_stops_undecided() {
        let mut state = battle(5);
        let result = auto_battle(&mut state, &mut GreedyAi::new(), &mut GreedyAi::new(), 0).unwrap();
        assert_eq!(result.winner, None);
        assert_eq!(state.round, 1);
    }
}

//! Rally, banner and fear statuses granted by command abilities

use crate::battle::abilities::AbilityEffect;
use crate::battle::units::{EffectSource, StatusApplication, StatusKind, Unit};

/// Status and duration a morale payload grants, if it is one
pub fn morale_status(effect: &AbilityEffect) -> Option<(StatusKind, u32)> {
    match *effect {
        AbilityEffect::Rally {
            amount,
            duration,
            source,
        } => Some((StatusKind::MoraleUp { amount, source }, duration)),
        AbilityEffect::Banner { amount, duration } => Some((
            StatusKind::MoraleUp {
                amount,
                source: EffectSource::Banner,
            },
            duration,
        )),
        AbilityEffect::Fear {
            amount,
            duration,
            source,
        } => Some((StatusKind::Fear { amount, source }, duration)),
        _ => None,
    }
}

/// Apply a morale payload to a unit
///
/// Returns None for payloads that aren't morale effects. Fear-immune units
/// report `Immune` and are left untouched.
pub fn apply_morale_effect(unit: &mut Unit, effect: &AbilityEffect) -> Option<StatusApplication> {
    let (kind, duration) = morale_status(effect)?;
    let outcome = unit.apply_status(kind, duration);
    tracing::debug!("{} {} on {}: {:?}", kind.label(), duration, unit.name, outcome);
    Some(outcome)
}

/// Short narrative for one application
pub fn describe(unit: &Unit, effect: &AbilityEffect, outcome: StatusApplication) -> String {
    let what = match effect {
        AbilityEffect::Fear { source, .. } => source.label(),
        AbilityEffect::Rally { source, .. } => source.label(),
        AbilityEffect::Banner { .. } => EffectSource::Banner.label(),
        _ => "effect",
    };
    match outcome {
        StatusApplication::Added => format!("{} is touched by {}", unit.name, what),
        StatusApplication::Stacked { stacks } => {
            format!("{} feels the {} more strongly (x{})", unit.name, what, stacks)
        }
        StatusApplication::Immune => format!("{} is unmoved by {}", unit.name, what),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::units::{UnitStats, UnitTag};
    use crate::core::types::{Faction, UnitId};

    fn unit() -> Unit {
        Unit::new(UnitId(0), "Archer", Faction::Enemy, UnitStats::default())
    }

    #[test]
    fn test_banner_is_positive() {
        let mut u = unit();
        let banner = AbilityEffect::Banner {
            amount: 5,
            duration: 3,
        };
        assert_eq!(apply_morale_effect(&mut u, &banner), Some(StatusApplication::Added));
        assert_eq!(u.status_morale(), 5);
    }

    #[test]
    fn test_fear_respects_immunity() {
        let roar = AbilityEffect::Fear {
            amount: 15,
            duration: 2,
            source: EffectSource::Roar,
        };

        let mut normal = unit();
        apply_morale_effect(&mut normal, &roar);
        assert_eq!(normal.status_morale(), -15);

        for tag in [UnitTag::Undead, UnitTag::Construct, UnitTag::Fearless] {
            let mut immune = unit();
            immune.tags.push(tag);
            assert_eq!(
                apply_morale_effect(&mut immune, &roar),
                Some(StatusApplication::Immune)
            );
            assert_eq!(immune.status_morale(), 0);
        }
    }

    #[test]
    fn test_rally_sources_stack_separately() {
        let mut u = unit();
        let rally = AbilityEffect::Rally {
            amount: 10,
            duration: 2,
            source: EffectSource::Rally,
        };
        let speech = AbilityEffect::Rally {
            amount: 15,
            duration: 3,
            source: EffectSource::Inspire,
        };
        apply_morale_effect(&mut u, &rally);
        apply_morale_effect(&mut u, &speech);
        assert_eq!(u.statuses.len(), 2);
        assert_eq!(u.status_morale(), 25);
    }

    #[test]
    fn test_damage_is_not_a_morale_effect() {
        let mut u = unit();
        assert!(apply_morale_effect(&mut u, &AbilityEffect::Damage { amount: 3 }).is_none());
        assert!(u.statuses.is_empty());
    }
}

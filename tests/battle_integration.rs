//! Battle system integration tests

use hex_tactics::battle::*;
use hex_tactics::core::config::BattleConfig;
use hex_tactics::core::types::{Faction, UnitId};

fn stats(attack: i32, defense: i32) -> UnitStats {
    UnitStats {
        attack,
        defense,
        ..UnitStats::default()
    }
}

fn battle(player: Vec<ForceUnit>, enemy: Vec<ForceUnit>) -> BattleState {
    let grid = BattleGrid::new(10, 8);
    let zones = DeploymentZones::edges(&grid, 1);
    let forces = vec![Force::new(Faction::Player, player), Force::new(Faction::Enemy, enemy)];
    BattleState::new(grid, zones, forces, AbilityCatalog::standard(), BattleConfig::default(), 77)
        .expect("valid battle")
}

#[test]
fn test_basic_attack_ten_versus_four() {
    let config = BattleConfig::default();
    assert_eq!(compute_damage(10, 10, 4, &config.combat), 12);

    let mut state = battle(
        vec![ForceUnit::new("Knight", stats(10, 3)).at(HexPosition::new(4, 4))],
        vec![ForceUnit::new("Brute", stats(5, 4)).at(HexPosition::new(5, 4))],
    );
    state.advance_phase().unwrap();
    assert_eq!(state.advance_phase(), Ok(BattlePhase::UnitsTurn));

    let roll = state.attack(UnitId(0), UnitId(1)).expect("adjacent enemy");
    assert!(roll.hit);
    assert_eq!(roll.amount, 12);
    assert_eq!(state.unit(UnitId(1)).unwrap().stats.hp, 8);
}

#[test]
fn test_routing_line_surrenders() {
    let enemies = (0..4)
        .map(|i| ForceUnit::new(format!("Goblin {}", i), UnitStats::default()))
        .collect();
    let mut state = battle(vec![ForceUnit::new("Knight", UnitStats::default())], enemies);
    state.advance_phase().unwrap();

    for id in 1..=3 {
        let morale = state.unit_mut(UnitId(id)).unwrap().morale_mut(70);
        morale.state = MoraleState::Routing;
        morale.ema = 10;
        morale.value = 10;
    }
    state.end_of_turn_morale();

    assert_eq!(state.phase, BattlePhase::Victory);
    assert!(state.log_contains("broken"));
    let result = state.result().expect("battle over");
    assert_eq!(result.winner, Some(Faction::Player));
    assert!(result.narrative.iter().any(|l| l.contains("surrender")));
}

#[test]
fn test_two_of_four_routing_holds() {
    let enemies = (0..4)
        .map(|i| ForceUnit::new(format!("Goblin {}", i), UnitStats::default()))
        .collect();
    let mut state = battle(vec![ForceUnit::new("Knight", UnitStats::default())], enemies);
    state.advance_phase().unwrap();

    for id in 1..=2 {
        state.unit_mut(UnitId(id)).unwrap().morale_mut(70).state = MoraleState::Routing;
    }
    state.end_of_turn_morale();
    assert_eq!(state.phase, BattlePhase::HeroTurn);
}

#[test]
fn test_high_ground_blocks_spell() {
    let mage = UnitStats {
        magic: 10,
        ..UnitStats::default()
    };
    let mut state = battle(
        vec![
            ForceUnit::new("Mage", mage)
                .at(HexPosition::new(1, 3))
                .commander(AuraDefinition::default())
                .with_abilities(&["fireball"]),
            ForceUnit::new("Guard", UnitStats::default()).at(HexPosition::new(0, 3)),
        ],
        vec![ForceUnit::new("Orc", UnitStats::default()).at(HexPosition::new(5, 3))],
    );
    state.advance_phase().unwrap();

    let fireball = AbilityId::from("fireball");
    let target = HexPosition::new(5, 3);
    assert!(state.can_use(UnitId(0), &fireball, target));

    state.grid.set_elevation(HexPosition::new(3, 3), 5);
    assert!(!state.can_use(UnitId(0), &fireball, target));
    assert!(state.use_ability(UnitId(0), &fireball, target).is_err());
    assert_eq!(state.unit(UnitId(2)).unwrap().stats.hp, 20);
}

#[test]
fn test_commander_death_shakes_army() {
    let mut state = battle(
        vec![
            ForceUnit::new("Lord", UnitStats::default())
                .at(HexPosition::new(2, 2))
                .commander(AuraDefinition::default()),
            ForceUnit::new("Squire", UnitStats::default()).at(HexPosition::new(2, 3)),
            ForceUnit::new("Scout", UnitStats::default()).at(HexPosition::new(0, 7)),
        ],
        vec![ForceUnit::new("Assassin", UnitStats::default()).at(HexPosition::new(9, 0))],
    );
    state.advance_phase().unwrap();
    assert_ne!(state.unit(UnitId(1)).unwrap().aura_bonus(), StatBonus::default());
    let scout_before = state.unit(UnitId(2)).unwrap().morale.as_ref().unwrap().ema;

    let report = state.apply_damage(UnitId(0), 100);
    assert!(report.killed);
    assert!(report.fallout.iter().any(|l| l.contains("falters")));

    let scout_after = state.unit(UnitId(2)).unwrap().morale.as_ref().unwrap().ema;
    assert_eq!(scout_after, scout_before - 15);
    assert_eq!(state.unit(UnitId(1)).unwrap().aura_bonus(), StatBonus::default());
    assert_eq!(state.grid.occupant(HexPosition::new(2, 2)), None);
}

#[test]
fn test_undead_shrug_off_fear() {
    let mut state = battle(
        vec![
            ForceUnit::new("Ghoul", UnitStats::default())
                .at(HexPosition::new(3, 2))
                .with_tags(&[UnitTag::Undead]),
            ForceUnit::new("Recruit", UnitStats::default()).at(HexPosition::new(3, 3)),
        ],
        vec![
            ForceUnit::new("Warlord", UnitStats::default())
                .at(HexPosition::new(4, 2))
                .commander(AuraDefinition::default())
                .with_abilities(&["terrifying_roar"]),
            ForceUnit::new("Grunt", UnitStats::default()).at(HexPosition::new(5, 2)),
        ],
    );
    for _ in 0..3 {
        state.advance_phase().unwrap();
    }
    assert_eq!(state.phase, BattlePhase::EnemyTurn);

    let outcome = state
        .use_ability(UnitId(2), &AbilityId::from("terrifying_roar"), HexPosition::new(4, 2))
        .expect("roar is ready");
    assert!(outcome.targets.contains(&UnitId(1)));
    assert_eq!(state.unit(UnitId(0)).unwrap().status_morale(), 0);
    assert_eq!(state.unit(UnitId(1)).unwrap().status_morale(), -15);
}

#[test]
fn test_morale_block_serde_truncates_history() {
    let json = r#"{
        "value": 40,
        "ema": 44,
        "state": "Shaken",
        "history": [
            {"round": 1, "value": 70, "ema": 70, "state": "Steady"},
            {"round": 2, "value": 62, "ema": 66, "state": "Steady"},
            {"round": 3, "value": 55, "ema": 60, "state": "Shaken"},
            {"round": 4, "value": 48, "ema": 54, "state": "Shaken"},
            {"round": 5, "value": 40, "ema": 44, "state": "Shaken"}
        ],
        "last_factors": {"leadership": 0, "terrain": 0, "casualties": -6, "outnumbered": -4, "effects": 0}
    }"#;
    let block: MoraleBlock = serde_json::from_str(json).unwrap();
    assert_eq!(block.history.len(), 3);
    assert_eq!(block.history[0].round, 3);
    assert_eq!(block.history[2].round, 5);

    let back: MoraleBlock = serde_json::from_str(&serde_json::to_string(&block).unwrap()).unwrap();
    assert_eq!(back, block);
}

#[test]
fn test_auto_battle_is_reproducible() {
    let army = |faction: Faction, attack: i32| {
        let mut units = vec![ForceUnit::new(format!("{:?} lord", faction), UnitStats::default())
            .commander(AuraDefinition::default())
            .with_abilities(&["strike", "rally", "terrifying_roar"])];
        units.extend((0..4).map(|i| ForceUnit::new(format!("{:?} {}", faction, i), stats(attack, 3))));
        Force::new(faction, units)
    };
    let run = |seed: u64| {
        let grid = BattleGrid::new(10, 8);
        let zones = DeploymentZones::edges(&grid, 2);
        let mut state = BattleState::new(
            grid,
            zones,
            vec![army(Faction::Player, 6), army(Faction::Enemy, 6)],
            AbilityCatalog::standard(),
            BattleConfig::default(),
            seed,
        )
        .unwrap();
        let result = auto_battle(&mut state, &mut GreedyAi::new(), &mut GreedyAi::new(), 40).unwrap();
        (result, state.snapshot())
    };

    let (first, first_snapshot) = run(1234);
    let (second, second_snapshot) = run(1234);
    assert_eq!(first, second);
    assert_eq!(first_snapshot, second_snapshot);
    assert!(first.rounds >= 1);
}

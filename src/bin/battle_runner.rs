//! Headless Battle Runner
//!
//! Runs seeded greedy-vs-greedy battles and prints their results.

use std::path::PathBuf;

use clap::Parser;
use hex_tactics::battle::{
    auto_battle, AbilityCatalog, AuraDefinition, BattleGrid, BattleResult, BattleState,
    DeploymentZones, Force, ForceUnit, GreedyAi, LootStack, Terrain, UnitStats, UnitTag,
    DEFAULT_BATTLE_HEIGHT, DEFAULT_BATTLE_WIDTH, DEFAULT_MAX_ROUNDS,
};
use hex_tactics::core::config::{load_config, BattleConfig};
use hex_tactics::core::types::Faction;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

/// Headless Battle Runner - greedy AI on both sides
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run seeded AI vs AI hex battles and print the results")]
struct Args {
    /// Random seed; batch runs use seed, seed+1, ...
    #[arg(long)]
    seed: Option<u64>,

    /// Grid width in hexes
    #[arg(long, default_value_t = DEFAULT_BATTLE_WIDTH)]
    width: u32,

    /// Grid height in hexes
    #[arg(long, default_value_t = DEFAULT_BATTLE_HEIGHT)]
    height: u32,

    /// Rounds before the battle is called undecided
    #[arg(long, default_value_t = DEFAULT_MAX_ROUNDS)]
    max_rounds: u32,

    /// Number of battles to run in parallel
    #[arg(long, default_value_t = 1)]
    batch: u64,

    /// Soldiers per side, commander not included
    #[arg(long, default_value_t = 5)]
    soldiers: usize,

    /// Battle config TOML (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

/// One battle's output line
#[derive(Serialize)]
struct RunReport {
    seed: u64,
    #[serde(flatten)]
    result: BattleResult,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("battle_runner: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => BattleConfig::default(),
    };
    let base_seed = args.seed.unwrap_or_else(rand::random);

    let reports: Vec<Result<RunReport, String>> = (0..args.batch.max(1))
        .into_par_iter()
        .map(|i| {
            let seed = base_seed.wrapping_add(i);
            run_one(args, &config, seed)
                .map(|result| RunReport { seed, result })
                .map_err(|e| format!("seed {}: {}", seed, e))
        })
        .collect();

    for report in reports {
        let report = report?;
        match args.format.as_str() {
            "text" => print_text(&report),
            "json" => println!("{}", serde_json::to_string(&report)?),
            other => {
                tracing::warn!("Unknown format '{}', defaulting to json", other);
                println!("{}", serde_json::to_string(&report)?);
            }
        }
    }
    Ok(())
}

fn run_one(
    args: &Args,
    config: &BattleConfig,
    seed: u64,
) -> Result<BattleResult, Box<dyn std::error::Error + Send + Sync>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut grid = BattleGrid::new(args.width, args.height);
    let zones = DeploymentZones::edges(&grid, 2);
    scatter_terrain(&mut grid, &zones, &mut rng);

    let forces = vec![
        player_force(args.soldiers),
        enemy_force(args.soldiers, &mut rng),
    ];
    let mut state = BattleState::new(
        grid,
        zones,
        forces,
        AbilityCatalog::standard(),
        config.clone(),
        seed,
    )?;

    let result = auto_battle(&mut state, &mut GreedyAi::new(), &mut GreedyAi::new(), args.max_rounds)?;
    tracing::info!("Seed {} finished after {} rounds: {:?}", seed, result.rounds, result.winner);
    Ok(result)
}

/// Sprinkle cover and obstacles outside the deployment zones
fn scatter_terrain(grid: &mut BattleGrid, zones: &DeploymentZones, rng: &mut ChaCha8Rng) {
    let open: Vec<_> = grid
        .positions()
        .filter(|p| !zones.player.contains(p) && !zones.enemy.contains(p))
        .collect();
    for pos in open {
        let roll: f64 = rng.gen();
        if roll < 0.10 {
            grid.set_terrain(pos, Terrain::Forest);
        } else if roll < 0.15 {
            grid.set_terrain(pos, Terrain::Hills);
            grid.set_elevation(pos, 1);
        } else if roll < 0.18 {
            grid.set_terrain(pos, Terrain::Swamp);
        } else if roll < 0.20 {
            grid.set_terrain(pos, Terrain::Mountain);
            grid.set_elevation(pos, 3);
        }
    }
}

fn player_force(soldiers: usize) -> Force {
    let mut units = vec![ForceUnit::new(
        "Captain",
        UnitStats {
            hp: 30,
            max_hp: 30,
            attack: 7,
            magic: 6,
            ..UnitStats::default()
        },
    )
    .level(3)
    .commander(AuraDefinition::default())
    .with_abilities(&["strike", "rally", "inspirational_speech", "war_banner", "fireball"])];

    for i in 0..soldiers {
        let stats = if i % 3 == 2 {
            UnitStats {
                range: 3,
                attack: 4,
                ..UnitStats::default()
            }
        } else {
            UnitStats::default()
        };
        let name = if i % 3 == 2 { "Archer" } else { "Spearman" };
        units.push(ForceUnit::new(format!("{} {}", name, i + 1), stats));
    }
    Force::new(Faction::Player, units)
}

fn enemy_force(soldiers: usize, rng: &mut ChaCha8Rng) -> Force {
    let mut units = vec![ForceUnit::new(
        "Warlord",
        UnitStats {
            hp: 32,
            max_hp: 32,
            attack: 8,
            ..UnitStats::default()
        },
    )
    .level(3)
    .commander(AuraDefinition::default())
    .with_abilities(&["strike", "terrifying_roar"])
    .with_loot(LootStack::new("warlord's axe", 1))];

    for i in 0..soldiers {
        let level = rng.gen_range(1..=3);
        let mut unit = ForceUnit::new(
            format!("Raider {}", i + 1),
            UnitStats {
                attack: 4 + level as i32,
                ..UnitStats::default()
            },
        )
        .level(level)
        .with_loot(LootStack::new("silver", rng.gen_range(1..=6)));
        if i % 4 == 3 {
            unit = ForceUnit::new(format!("Skeleton {}", i + 1), UnitStats::default())
                .level(level)
                .with_tags(&[UnitTag::Undead]);
        }
        units.push(unit);
    }
    Force::new(Faction::Enemy, units)
}

fn print_text(report: &RunReport) {
    let result = &report.result;
    let outcome = match result.winner {
        Some(Faction::Player) => "victory",
        Some(_) => "defeat",
        None => "undecided",
    };
    println!("Battle Result (seed {})", report.seed);
    println!("=============");
    println!("Outcome: {}", outcome);
    println!("Rounds: {}", result.rounds);
    println!(
        "Casualties: {} player, {} enemy",
        result.casualties_of(Faction::Player),
        result.casualties_of(Faction::Enemy)
    );
    println!("Gold: {:+}", result.gold_delta);
    for stack in &result.loot {
        println!("Loot: {} x{}", stack.item, stack.quantity);
    }
    for line in &result.narrative {
        println!("  {}", line);
    }
    println!();
}

//! Habitat Reach - headless demo runner
//!
//! Generates a seeded map, scatters populations with different terrain rules
//! and food sources over it, then runs the simulation for a number of ticks
//! while logging reachability, crowding and food contention.

use std::path::PathBuf;

use clap::Parser;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use habitat_reach::core::config::HabitatConfig;
use habitat_reach::core::error::Result;
use habitat_reach::core::types::CellKey;
use habitat_reach::population::handle::PopulationHandle;
use habitat_reach::simulation::{run_habitat_tick, HabitatWorld};
use habitat_reach::spatial::terrain::{TerrainGrid, TerrainKind, TerrainSet};

/// Run a headless habitat simulation
#[derive(Parser, Debug)]
#[command(name = "habitat-reach")]
#[command(about = "Simulate populations competing for food on a shared map")]
struct Args {
    /// Optional TOML config; defaults are used for missing keys
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 50)]
    ticks: u32,

    #[arg(long, default_value_t = 64)]
    width: usize,

    #[arg(long, default_value_t = 48)]
    height: usize,

    /// Populations to scatter (at most 64)
    #[arg(long, default_value_t = 8)]
    populations: usize,

    /// Food sources to scatter
    #[arg(long, default_value_t = 12)]
    sources: usize,

    /// Map seed (the config seed drives births)
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Print the final tick report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("habitat_reach=info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => HabitatConfig::from_file(path)?,
        None => HabitatConfig::default(),
    };

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let terrain = generate_terrain(args.width, args.height, &mut rng);
    let mut world = HabitatWorld::new(terrain, config)?;

    spawn_populations(&mut world, args.populations, &mut rng)?;
    for _ in 0..args.sources {
        let cell = random_cell(args.width, args.height, &mut rng);
        let output = rng.gen_range(5.0..40.0);
        world.add_source(cell, output)?;
    }

    tracing::info!(
        width = args.width,
        height = args.height,
        populations = world.population_count(),
        sources = args.sources,
        "habitat ready"
    );

    let mut last = None;
    for _ in 0..args.ticks {
        // Occasionally dig or flood a patch so reachability has to catch up
        if rng.gen::<f32>() < 0.2 {
            let a = random_cell(args.width, args.height, &mut rng);
            let b = CellKey::new(a.x + rng.gen_range(0..4), a.y + rng.gen_range(0..4));
            let kind = if rng.gen::<bool>() {
                TerrainKind::Dirt
            } else {
                TerrainKind::ShallowWater
            };
            world.paint_rect(a, b, kind);
        }

        let report = run_habitat_tick(&mut world)?;
        for p in &report.populations {
            tracing::debug!(
                tick = report.tick,
                name = %p.name,
                size = p.group_size,
                area = p.reachable_area,
                density = p.density_score,
                food = p.acquired,
                health = p.needs.health,
                "population status"
            );
        }
        tracing::info!(
            tick = report.tick,
            populations = report.populations.len(),
            food = report.contention.total_acquired(),
            recomputed = report.recomputed.len(),
            "tick complete"
        );
        last = Some(report);
    }

    if let Some(report) = last {
        if args.json {
            println!("{}", report.to_json()?);
        } else {
            println!("\n=== HABITAT AFTER {} TICKS ===", args.ticks);
            for p in &report.populations {
                println!(
                    "  {:<12} size {:>4}  area {:>5}  density {:>6.2}  food {:>6.1}  health {:.2}",
                    p.name, p.group_size, p.reachable_area, p.density_score, p.acquired, p.needs.health
                );
            }
        }
    }

    Ok(())
}

/// Noise-free blob map: grass base with lakes, forests and rock ridges
fn generate_terrain(width: usize, height: usize, rng: &mut ChaCha8Rng) -> TerrainGrid {
    let mut terrain = TerrainGrid::new(width, height, TerrainKind::Grass);
    let features = (width * height / 120).max(1);

    for _ in 0..features {
        let center = random_cell(width, height, rng);
        let radius = rng.gen_range(2..7);
        let kind = match rng.gen_range(0..10) {
            0..=2 => TerrainKind::DeepWater,
            3..=4 => TerrainKind::ShallowWater,
            5..=7 => TerrainKind::Forest,
            _ => TerrainKind::Wall,
        };
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    terrain.set(CellKey::new(center.x + dx, center.y + dy), kind);
                }
            }
        }
    }

    terrain
}

fn spawn_populations(world: &mut HabitatWorld, count: usize, rng: &mut ChaCha8Rng) -> Result<()> {
    let kinds = [
        ("grazers", TerrainSet::land()),
        ("waders", TerrainSet::amphibious()),
        ("fish", TerrainSet::aquatic()),
    ];
    let (width, height) = (world.terrain().width(), world.terrain().height());

    for i in 0..count.min(habitat_reach::core::types::MAX_SLOTS) {
        let (label, traversable) = kinds[i % kinds.len()];
        let handle = PopulationHandle::new(format!("{}-{}", label, i), random_cell(width, height, rng))
            .with_traversable(traversable)
            .with_range(rng.gen_range(6.0..24.0))
            .with_dominance(rng.gen_range(0.5..4.0))
            .with_group_size(rng.gen_range(4..30));
        world.add_population(handle)?;
    }
    Ok(())
}

fn random_cell(width: usize, height: usize, rng: &mut ChaCha8Rng) -> CellKey {
    CellKey::new(
        rng.gen_range(0..width.max(1)) as i32,
        rng.gen_range(0..height.max(1)) as i32,
    )
}

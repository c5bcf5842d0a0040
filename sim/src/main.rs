use log::{error, info};
use serde::Deserialize;
use skyfleet_coord::{Coordinator, CoordinatorConfig, Executive};
use skyfleet_planner::{terms::FleetAwareTerms, PathPlanner};
use skyfleet_sim::World;
use skyfleet_structs::{task::TaskStatus, FleetError};

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum Scenario {
    Small,
    Medium,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
struct SimConfig {
    scenario: Scenario,
    seed: u64,
    ticks: u64,
    tick_ms: u64,
    fleet_aware: bool,
    coordinator: CoordinatorConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            scenario: Scenario::Small,
            seed: 0,
            ticks: 600,
            tick_ms: 1000,
            fleet_aware: true,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

fn load_config(path: &str) -> skyfleet_structs::Result<SimConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| FleetError::config(format!("{}: {}", path, e)))?;
    serde_json::from_str(&text).map_err(|e| FleetError::config(format!("{}: {}", path, e)))
}

fn run(config: SimConfig) -> skyfleet_structs::Result<()> {
    let mut world = match config.scenario {
        Scenario::Small => World::small(config.seed),
        Scenario::Medium => World::medium(config.seed),
    };

    let mut coordinator = Coordinator::new(config.coordinator.clone())?;
    if config.fleet_aware {
        let planner = PathPlanner::new(config.coordinator.planner.clone())?.with_terms(FleetAwareTerms::default());
        coordinator = coordinator.with_planner(planner);
    }
    world.install(&mut coordinator)?;

    let mut executive = Executive::new(&mut coordinator);
    for _ in 0..config.ticks {
        world.simulate(config.tick_ms);
        executive.update(&mut world);
    }

    let c = executive.coordinator();
    let count = |s: TaskStatus| c.tasks().iter().filter(|t| t.status == s).count();
    info!(
        "finished at t={}: {} tasks, {} completed, {} failed, {} pending, {} conflicts, {} drones lost, {} messages",
        world.curr_time,
        c.tasks().len(),
        count(TaskStatus::Completed),
        count(TaskStatus::Failed),
        count(TaskStatus::Pending),
        c.conflict_history().len(),
        world.drones.iter().filter(|d| d.lost).count(),
        world.delivered
    );
    match serde_json::to_string(&c.get_status()) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("could not serialize status: {}", e),
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        },
        None => SimConfig::default(),
    };
    info!("running {:?} scenario for {} ticks", config.scenario, config.ticks);

    if let Err(e) = run(config) {
        error!("{}", e);
        std::process::exit(1);
    }
}

use std::collections::HashSet;

use skyfleet_coord::{Coordinator, CoordinatorConfig, Executive};
use skyfleet_planner::{terms::FleetAwareTerms, PathPlanner};
use skyfleet_sim::World;
use skyfleet_structs::task::TaskStatus;

fn check_invariants(c: &Coordinator) {
    let mut busy = HashSet::new();
    for t in c.tasks().iter().filter(|t| t.status.is_active()) {
        assert_eq!(t.assigned_agents.len(), t.required_agents, "task {}", t.id);
        for a in t.assigned_agents.iter() {
            assert!(busy.insert(a.clone()), "agent {} on two tasks", a);
            assert!(c.agent(a).is_some(), "task {} holds unknown agent {}", t.id, a);
        }
    }
    for t in c.tasks().iter().filter(|t| t.status == TaskStatus::Pending) {
        assert!(t.assigned_agents.is_empty());
    }
    let s = c.get_status();
    assert!(s.system_load >= 0.0 && s.system_load <= 1.0);
    assert_eq!(s.pending_messages, 0);
}

#[test]
pub fn small_scenario_gets_work_done() {
    let _ = env_logger::try_init();
    let mut world = World::small(1);
    let mut coordinator = Coordinator::new(CoordinatorConfig::default()).unwrap();
    world.install(&mut coordinator).unwrap();
    assert!(coordinator.planner().grid().occupied_count() > 0);
    assert_eq!(coordinator.airspace().zones().len(), 1);

    let mut executive = Executive::new(&mut coordinator);
    for _ in 0..240 {
        world.simulate(1000);
        executive.update(&mut world);
        check_invariants(executive.coordinator());
    }

    let c = executive.coordinator();
    assert_eq!(executive.ticks(), 240);
    assert!(world.completed >= 1);
    assert!(c.tasks().iter().any(|t| t.status == TaskStatus::Completed));
    assert!(c.tasks().len() >= 12);
    assert!(world.drones.iter().all(|d| !d.lost));
    assert!(world.delivered > 0);
    assert!(c.assessment().is_some());
}

#[test]
pub fn medium_scenario_runs_with_fleet_aware_planning() {
    let _ = env_logger::try_init();
    let mut world = World::medium(5);
    let config = CoordinatorConfig::default();
    let planner = PathPlanner::new(config.planner.clone()).unwrap().with_terms(FleetAwareTerms::default());
    let mut coordinator = Coordinator::new(config).unwrap().with_planner(planner);
    world.install(&mut coordinator).unwrap();
    assert_eq!(coordinator.agents().len(), 8);

    let mut executive = Executive::new(&mut coordinator);
    for _ in 0..120 {
        world.simulate(1000);
        executive.update(&mut world);
        check_invariants(executive.coordinator());
    }
    let c = executive.coordinator();
    assert!(c.tasks().iter().any(|t| t.status != TaskStatus::Pending));
    assert!(c.airspace().zones().iter().any(|z| z.id == "stadium"));
}

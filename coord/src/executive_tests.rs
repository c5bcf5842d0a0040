use std::collections::VecDeque;

use skyfleet_planner::{GridSize, PlannerConfig};
use skyfleet_structs::{
    agent::{Agent, AgentStatus, AgentUpdate},
    backend::{Backend, BackendEvent},
    environment::EnvironmentSnapshot,
    message::Message,
    path::Directive,
    task::{Task, TaskKind, TaskStatus},
    AgentId, Point, Timestamp,
};

use crate::{Coordinator, CoordinatorConfig, Executive};

#[derive(Default)]
struct ScriptedBackend {
    time: Timestamp,
    telemetry: Vec<(AgentId, AgentUpdate)>,
    events: VecDeque<BackendEvent>,
    dispatched: Vec<Directive>,
    delivered: Vec<Message>,
}

impl Backend for ScriptedBackend {
    fn current_time(&self) -> Timestamp {
        self.time
    }

    fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot::calm(self.time)
    }

    fn telemetry(&self) -> Vec<(AgentId, AgentUpdate)> {
        self.telemetry.clone()
    }

    fn dispatch(&mut self, directive: Directive) {
        self.dispatched.push(directive);
    }

    fn next_event(&mut self) -> Option<BackendEvent> {
        self.events.pop_front()
    }

    fn deliver(&mut self, message: Message) {
        self.delivered.push(message);
    }
}

fn coordinator() -> Coordinator {
    let config = CoordinatorConfig {
        planner: PlannerConfig { grid_size: GridSize::new(20, 20, 5), ..Default::default() },
        ..Default::default()
    };
    let mut c = Coordinator::new(config).unwrap();
    c.register_agent(Agent::new("d1", Point::new(15.0, 15.0, 15.0)).with_capabilities(["delivery"])).unwrap();
    c.enqueue_task(Task::new("t1", TaskKind::Delivery, Point::new(95.0, 95.0, 15.0))).unwrap();
    c
}

#[test]
pub fn round_trip_through_backend() {
    let _ = env_logger::try_init();
    let mut coordinator = coordinator();
    let mut backend = ScriptedBackend { time: 1000, ..Default::default() };
    let mut executive = Executive::new(&mut coordinator);

    let status = executive.update(&mut backend);
    assert_eq!(status.active_tasks, 1);
    assert!(matches!(&backend.dispatched[..], [Directive::PathUpdate { agent, path }] if agent == "d1" && !path.is_empty()));
    assert!(!backend.delivered.is_empty());
    assert_eq!(status.pending_messages, 0);
    assert!(executive.coordinator().assessment().is_some());

    backend.time = 2000;
    backend.telemetry = vec![
        ("d1".into(), AgentUpdate { battery_level: Some(90.0), ..AgentUpdate::position(Point::new(50.0, 50.0, 15.0)) }),
        ("ghost".into(), AgentUpdate::position(Point::ZERO)),
    ];
    backend.events.push_back(BackendEvent::TaskFinished { task: "t1".into(), success: true });
    backend.events.push_back(BackendEvent::AgentLost("ghost".into()));
    // needs two agents, so it stays pending
    let survey = Task::new("t2", TaskKind::Surveillance, Point::new(95.0, 15.0, 15.0)).with_required_agents(2);
    backend.events.push_back(BackendEvent::NewTask(survey.clone()));
    backend.events.push_back(BackendEvent::NewTask(survey.clone()));
    executive.update(&mut backend);

    let c = executive.coordinator();
    assert_eq!(executive.ticks(), 2);
    assert_eq!(c.task("t1").unwrap().status, TaskStatus::Completed);
    let d1 = c.agent("d1").unwrap();
    assert_eq!(d1.status, AgentStatus::Idle);
    assert_eq!(d1.position, Point::new(50.0, 50.0, 15.0));
    assert_eq!(d1.battery_level, 90.0);
    // duplicate rejected, original kept
    assert_eq!(c.tasks().iter().filter(|t| t.id == "t2").count(), 1);
    assert_eq!(c.task("t2").unwrap().status, TaskStatus::Pending);
    assert!(backend.events.is_empty());
}

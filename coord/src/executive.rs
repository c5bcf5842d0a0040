use log::{debug, info, warn};
use skyfleet_structs::backend::{Backend, BackendEvent};
use skyfleet_structs::Timestamp;

use crate::coordinator::{Coordinator, FleetStatus};

/// Drives a coordinator against a backend: pulls telemetry, conditions and
/// events in, ticks, and pushes directives and messages back out.
pub struct Executive<'a> {
    coordinator: &'a mut Coordinator,
    ticks: u64,
    last_time: Option<Timestamp>,
}

impl<'a> Executive<'a> {
    pub fn new(coordinator: &'a mut Coordinator) -> Self {
        Self { coordinator, ticks: 0, last_time: None }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &*self.coordinator
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn update(&mut self, backend: &mut dyn Backend) -> FleetStatus {
        let current_time = backend.current_time();
        if self.last_time.is_some_and(|t| current_time < t) {
            warn!("backend time went backwards: {} after {:?}", current_time, self.last_time);
        }

        for (id, update) in backend.telemetry() {
            if let Err(e) = self.coordinator.update_agent(&id, update) {
                warn!("dropping telemetry for {}: {}", id, e);
            }
        }
        if let Err(e) = self.coordinator.update_environment(backend.snapshot()) {
            warn!("dropping environment snapshot: {}", e);
        }

        // Process external events
        while let Some(event) = backend.next_event() {
            let result = match &event {
                BackendEvent::TaskFinished { task, success } => self.coordinator.complete_task(task, *success),
                BackendEvent::AgentLost(agent) => self.coordinator.unregister_agent(agent).map(|_| ()),
                BackendEvent::NewTask(task) => self.coordinator.enqueue_task(task.clone()),
            };
            match result {
                Ok(()) => debug!("backend event {:?}", event),
                Err(e) => warn!("backend event {:?} rejected: {}", event, e),
            }
        }

        self.coordinator.tick(current_time);

        let directives = self.coordinator.drain_directives();
        let n_directives = directives.len();
        for directive in directives {
            backend.dispatch(directive);
        }
        let messages = self.coordinator.drain_messages();
        let n_messages = messages.len();
        for message in messages {
            backend.deliver(message);
        }

        self.ticks += 1;
        self.last_time = Some(current_time);
        let status = self.coordinator.get_status();
        info!(
            "t={} tick {}: {}/{} agents active, {} tasks active, {} directives, {} messages, {} recent conflicts",
            current_time,
            self.ticks,
            status.active_agents,
            status.total_agents,
            status.active_tasks,
            n_directives,
            n_messages,
            status.recent_conflicts
        );
        status
    }
}

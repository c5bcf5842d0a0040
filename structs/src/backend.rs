use crate::{
    agent::AgentUpdate, environment::EnvironmentSnapshot, message::Message, path::Directive, task::Task, AgentId,
    TaskId, Timestamp,
};

#[derive(Clone, Debug, PartialEq)]
pub enum BackendEvent {
    TaskFinished { task: TaskId, success: bool },
    AgentLost(AgentId),
    /// Work requested by the host, queued like any other task.
    NewTask(Task),
}

/// The host side of the decision core: whatever flies the drones (a
/// simulator, or a bridge to real vehicles) and observes the environment.
pub trait Backend {
    fn current_time(&self) -> Timestamp;
    fn snapshot(&self) -> EnvironmentSnapshot;
    fn telemetry(&self) -> Vec<(AgentId, AgentUpdate)>;
    fn dispatch(&mut self, directive: Directive);
    fn next_event(&mut self) -> Option<BackendEvent>;

    /// Hands over an outgoing message. Transport is up to the host; the
    /// default drops it.
    fn deliver(&mut self, _message: Message) {}
}

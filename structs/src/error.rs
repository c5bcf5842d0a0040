use thiserror::Error;

/// Faults raised by the decision core.
///
/// Expected steady-state outcomes (no route, task still pending) are not
/// errors and never show up here.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FleetError {
    #[error("invalid input for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl FleetError {
    pub fn missing(field: impl Into<String>) -> Self {
        FleetError::Validation { field: field.into(), reason: "required field missing".to_string() }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FleetError::Validation { field: field.into(), reason: reason.into() }
    }

    pub fn agent_not_found(id: &str) -> Self {
        FleetError::NotFound { kind: "agent", id: id.to_string() }
    }

    pub fn task_not_found(id: &str) -> Self {
        FleetError::NotFound { kind: "task", id: id.to_string() }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        FleetError::Config { reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;

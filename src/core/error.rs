use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {field} {reason}")]
    Configuration { field: &'static str, reason: String },

    #[error("invalid result: {0}")]
    InvalidResult(String),
}

impl SimulationError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        SimulationError::Configuration {
            field,
            reason: reason.into(),
        }
    }
}

use armc_azure::ArmError;
use thiserror::Error;

/// Malformed poll-trigger parameters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("'{0}' is not a valid time aggregation; use Average, Count, Maximum, Minimum or Total")]
    UnknownAggregation(String),
    #[error("'{0}' is not a valid comparison operation")]
    UnknownComparison(String),
    #[error("A resource Id and a metric name are required")]
    MissingMetric,
}

impl From<TriggerError> for ArmError {
    fn from(err: TriggerError) -> Self {
        ArmError::validation(err.to_string())
    }
}

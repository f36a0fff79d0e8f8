use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerError {
    JobAlreadyExists(String),
    JobNotFound(String),
    InvalidCron(String),
    /// `Stop(deadline)` elapsed before every running job finished; the
    /// scheduler is still marked stopped (new dispatches are halted).
    StopTimeout,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::JobAlreadyExists(name) => write!(f, "job `{name}` already exists"),
            SchedulerError::JobNotFound(name) => write!(f, "job `{name}` not found"),
            SchedulerError::InvalidCron(expr) => write!(f, "invalid cron expression: {expr}"),
            SchedulerError::StopTimeout => write!(f, "stop deadline elapsed before all jobs finished"),
        }
    }
}

impl std::error::Error for SchedulerError {}

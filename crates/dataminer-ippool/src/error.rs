use std::fmt;

/// Errors returned by [`crate::IpPool`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpPoolError {
    /// `start` was called on a pool that is already running.
    AlreadyRunning,
    /// A read was attempted on a pool that isn't running (never started, or
    /// `stop` has been called).
    NotRunning,
    /// The pool is running but currently holds zero IP records.
    Empty,
    /// `start` failed because no configured resolver returned any IPv4
    /// address on the first resolution attempt.
    ResolutionEmpty,
}

impl fmt::Display for IpPoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpPoolError::AlreadyRunning => write!(f, "ip pool already running"),
            IpPoolError::NotRunning => write!(f, "ip pool not running"),
            IpPoolError::Empty => write!(f, "ip pool is empty"),
            IpPoolError::ResolutionEmpty => {
                write!(f, "no configured resolver returned any ipv4 address")
            }
        }
    }
}

impl std::error::Error for IpPoolError {}

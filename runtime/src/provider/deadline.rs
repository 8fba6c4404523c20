use std::time::{Duration, Instant};

use crate::{RuntimeError, RuntimeResult};

/// Deadline contains deadline with the corresponding timeout for pretty error messages.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Deadline {
    deadline: Instant,
    pub timeout: Duration,
}

impl Deadline {
    /// Returns a deadline `timeout` from now.
    pub fn new(timeout: Duration) -> Self {
        Deadline {
            deadline: Instant::now() + timeout,
            timeout,
        }
    }

    /// returns true if deadline is exceeded.
    pub fn exceeded(&self) -> bool {
        Instant::now() > self.deadline
    }

    /// Fails with a timeout error naming `env` once the deadline has passed.
    pub fn check(&self, env: &str) -> RuntimeResult<()> {
        if self.exceeded() {
            return Err(RuntimeError::Timeout(env.to_string()));
        }
        Ok(())
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Deadline::new(Duration::from_secs(100))
    }
}

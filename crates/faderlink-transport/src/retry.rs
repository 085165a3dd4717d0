use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Bounded retry policy for binding a local port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total dial attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(250),
        }
    }
}

/// Run `dial` until it succeeds, retrying only on "address already in use".
///
/// Each retry sleeps `policy.delay` through `sleep` and moves to the next local
/// port. Any other error is returned immediately, as is the last in-use error
/// once the attempts are exhausted.
pub fn retry_on_addr_in_use<T, D, S>(
    policy: &RetryPolicy,
    first_port: u16,
    mut dial: D,
    mut sleep: S,
) -> Result<T>
where
    D: FnMut(u16) -> Result<T>,
    S: FnMut(Duration),
{
    let attempts = policy.max_attempts.max(1);
    let mut port = first_port;
    let mut attempt = 1;

    loop {
        match dial(port) {
            Ok(conn) => {
                debug!(port, attempt, "dial succeeded");
                return Ok(conn);
            }
            Err(err) if err.is_addr_in_use() && attempt < attempts => {
                let Some(next) = port.checked_add(1) else {
                    return Err(err);
                };
                warn!(port, next, attempt, "local port in use; retrying");
                sleep(policy.delay);
                port = next;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

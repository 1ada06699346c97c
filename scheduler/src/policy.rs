//! How ticks relate to requests that are still outstanding.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::SchedulerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingPolicy {
    /// Every tick issues a request, whatever is still in flight. Requests
    /// may overlap and batches reach the log in completion order.
    #[default]
    Overlapping,
    /// At most one request in flight. A tick that fires while one is
    /// outstanding is skipped, so batches reach the log in issue order.
    Serialized,
}

impl FromStr for OrderingPolicy {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overlapping" => Ok(Self::Overlapping),
            "serialized" | "serialised" => Ok(Self::Serialized),
            other => Err(SchedulerError::UnknownOrderingPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for OrderingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Overlapping => "overlapping",
            Self::Serialized => "serialized",
        })
    }
}

/// Counts outstanding requests and applies the ordering policy.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    count: Arc<AtomicUsize>,
}

/// Held by one outstanding request; releases its slot on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
    }
}

impl InFlight {
    /// Reserve a slot for a new request, or `None` if `policy` forbids one
    /// right now. On success also returns the number now in flight.
    pub fn try_acquire(&self, policy: OrderingPolicy) -> Option<(InFlightGuard, usize)> {
        let prev = self.count.fetch_add(1, Ordering::AcqRel);

        if policy == OrderingPolicy::Serialized && prev > 0 {
            self.count.fetch_sub(1, Ordering::AcqRel);
            return None;
        }

        let guard = InFlightGuard {
            count: Arc::clone(&self.count),
        };
        Some((guard, prev + 1))
    }

    pub fn current(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

pub mod engine;
pub mod error;
pub mod policy;
pub mod state;
pub mod types;

pub use engine::Poller;
pub use error::SchedulerError;
pub use policy::OrderingPolicy;
pub use state::PollerState;
pub use types::{PollerConfig, PollerStats, PollerStatsSnapshot};

//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `ConnectionSupervisor`: Stream-first state machine with polling fallback
//! - `PollSource`: Fixed-interval price lookup driving the fallback
//! - `SupervisorStatus`: Shared read-only view for health reporting

mod poller;
mod status;
mod supervisor;

pub use poller::{PollEvent, PollSource, PollTimerHandle};
pub use status::SupervisorStatus;
pub use supervisor::{ConnectionSupervisor, SupervisorConfig, SupervisorError};

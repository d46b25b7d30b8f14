//! Profile-generation task orchestration.
//!
//! - `machine`: the state machine owning Idle/Running/Complete transitions
//! - `status`: read-only projection of persisted state into a client-facing
//!   status value

pub mod machine;
pub mod status;

pub use machine::{CompleteOutcome, MachineError, ProfileMachine, RunTicket, StartOutcome};
pub use status::ProfileStatus;

//! Shared-state primitives used across the mirror.
//!
//! - [`ConcurrentSet`]: membership set keyed by an identity string, with an
//!   atomic test-and-set insert
//! - [`ConcurrentCounter`]: lock-free signed counter
//!
//! Each value guards itself. There is no lock spanning several primitives, so
//! callers that need cross-structure consistency must order their operations
//! (see the orchestrator's claim/release sequence).

mod counter;
mod set;

pub use counter::ConcurrentCounter;
pub use set::ConcurrentSet;

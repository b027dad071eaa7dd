//! modsync - mirror for a Go module proxy.
//!
//! Pages through the module index, downloads each published version's
//! artifacts from the proxy into a local tree laid out like the proxy
//! itself, and follows `require` directives so the mirror holds the full
//! dependency closure.
//!
//! ```text
//! IndexClient ──► DownloadOrchestrator ──► workers ──► DownloadPipeline
//!      ▲                 │                                  │
//!      │                 └── await_inflight ──► checkpoint  └─► deps back
//!  CheckpointStore ◄─────────────────────────────┘               into queue
//! ```

pub mod checkpoint;
pub mod concurrent;
pub mod config;
pub mod fetch;
pub mod index;
pub mod logging;
pub mod orchestrator;
pub mod package;
pub mod pipeline;
pub mod proxy;

pub use config::MirrorConfig;
pub use orchestrator::DownloadOrchestrator;
pub use package::{PackageVersion, PackageVersionBatch};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

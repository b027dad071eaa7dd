//! Per-version download pipeline.
//!
//! [`DownloadPipeline`] mirrors one package version into the local tree:
//!
//! ```text
//! validate ─► mkdir <out>/<path>/@v ─► list ─► <v>.mod ─► parse requires
//!                                                              │
//!                              DependencySink ◄── submit ──────┘
//!                                                              ▼
//!                                         <v>.info ─► <v>.zip ─► latest
//! ```
//!
//! The orchestrator drives it through the [`RequestProcessor`] seam and
//! receives discovered dependencies through [`DependencySink`].

mod download;
mod error;
mod manifest;
mod traits;

pub use download::DownloadPipeline;
pub use error::PipelineError;
pub use manifest::{parse_requirements, ManifestError, Requirement};
pub use traits::{BoxFuture, DependencySink, RequestProcessor};

//! Seams between the pipeline and the orchestrator.

use std::future::Future;
use std::pin::Pin;

use super::error::PipelineError;
use crate::package::PackageVersion;

/// Boxed future type for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Receives package versions discovered while processing another one.
///
/// Implementations must not block; the caller is a queue worker.
pub trait DependencySink: Send + Sync {
    fn submit(&self, version: PackageVersion);
}

/// Processes a single package version on behalf of a queue worker.
pub trait RequestProcessor: Send + Sync + 'static {
    fn process<'a>(
        &'a self,
        version: &'a PackageVersion,
        deps: &'a dyn DependencySink,
    ) -> BoxFuture<'a, Result<(), PipelineError>>;
}

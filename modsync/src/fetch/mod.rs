//! Single-resource HTTP download to the local mirror.
//!
//! Every artifact is streamed into a temporary file under the configured
//! temp directory and renamed into place, so readers never see a partial
//! file and an interrupted download leaves nothing at the final path.

mod artifact;
mod error;

pub use artifact::{ArtifactFetcher, FetchOutcome, DEFAULT_TIMEOUT_SECS};
pub use error::{FetchError, FetchResult, UNMIRRORABLE_MARKER};

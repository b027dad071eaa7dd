//! `modsync version`

/// Commit the binary was built from, if provided at build time.
const GIT_COMMIT_SHA: Option<&str> = option_env!("GIT_COMMIT_SHA");

/// Build timestamp, if provided at build time.
const BUILD_TIME: Option<&str> = option_env!("BUILD_TIME");

pub fn run() {
    println!("modsync {}", modsync::VERSION);
    println!("GIT_COMMIT_SHA: {}", GIT_COMMIT_SHA.unwrap_or("unknown"));
    println!("BUILD_TIME: {}", BUILD_TIME.unwrap_or("unknown"));
}

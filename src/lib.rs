//! # ROI Match
//!
//! Watches a rectangular region of a camera feed and tells the operator
//! whether it still looks like the moment they captured it.
//!
//! ## How it works
//! - **Capture** - the region of the current frame becomes the reference
//! - **Compare** - the same region of a later frame is scored with SSIM
//! - **Decide** - a score at or above the threshold counts as a match
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - Region extraction, SSIM, decisions, session state and the loop
//! - `events` - Event-driven reporting (UI-ready)
//! - `error` - User-friendly error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, RoiMatchError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. `RUST_LOG` wins
/// when set; otherwise `verbose` selects `debug` over `warn`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "roi_match=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // A subscriber may already be installed (tests, embedding apps)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

//! # Core Module
//!
//! The UI-agnostic region matching engine.
//!
//! ## Modules
//! - `frame` - Shared, immutable camera frames
//! - `region` - Fractional region geometry and extraction
//! - `similarity` - SSIM between the reference and the live region
//! - `decision` - Turns a score into Similar / Dissimilar
//! - `session` - The reference, region and threshold of one session
//! - `source` - Where frames come from
//! - `storage` - Persists the session between runs
//! - `monitor` - The per-tick loop driver
//! - `render` - Annotated frames and terminal summaries

pub mod decision;
pub mod frame;
pub mod monitor;
pub mod region;
pub mod render;
pub mod session;
pub mod similarity;
pub mod source;
pub mod storage;

// Re-export commonly used types
pub use decision::{Decision, Label, ThresholdPolicy};
pub use frame::Frame;
pub use monitor::{Action, Monitor};
pub use region::{PixelRect, Region, RegionBounds};
pub use session::{Comparison, ReferenceImage, SessionConfig, SessionState};
pub use similarity::{SimilarityEngine, SimilarityResult};
pub use source::{FrameSource, Resolution};
pub use storage::SessionStore;

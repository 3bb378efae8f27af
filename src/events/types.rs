//! Event type definitions for UI reporting.

use crate::core::decision::Label;
use crate::core::region::Region;
use crate::core::source::Resolution;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted while monitoring a region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Session mutations and comparison results
    Session(SessionEvent),
    /// Loop-level events
    Monitor(MonitorEvent),
}

/// Events describing what happened to the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A new reference was captured
    Captured {
        width: u32,
        height: u32,
        frame: u64,
        /// Where the reference was persisted, if it was
        saved_to: Option<PathBuf>,
    },
    /// A comparison finished
    Compared(ComparisonSummary),
    /// Region geometry changed
    RegionUpdated { region: Region },
    /// Threshold changed (value after clamping)
    ThresholdUpdated { threshold: f64 },
    /// An operator action failed; the session is unchanged
    ActionFailed { action: String, message: String },
}

/// Serializable digest of a comparison, without the diff image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub score: f64,
    pub threshold: f64,
    pub label: Label,
    pub frame: u64,
    pub width: u32,
    pub height: u32,
}

/// Loop-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// The loop started pulling from a source
    Started { source: String },
    /// Continuous comparison was switched on or off
    ContinuousChanged { enabled: bool },
    /// The source was asked for a new resolution
    ResolutionChanged { resolution: Option<Resolution> },
    /// The source had no frame this tick
    NoFrame,
    /// The loop stopped
    Stopped { ticks: u64 },
}

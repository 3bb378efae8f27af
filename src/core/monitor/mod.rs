//! # Monitor Module
//!
//! The loop driver. Each tick pulls exactly one frame from the source and
//! applies the operator's actions against it: at most one capture and one
//! compare per tick, both on the same frame.
//!
//! ## Flow
//! 1. Apply settings actions (region, threshold, continuous, resolution)
//! 2. Pull a frame; without one the tick is a no-op and captures/compares
//!    wait for the next frame
//! 3. Capture, then compare (single-shot or continuous)
//!
//! Comparisons can be offloaded to a [`ComparisonWorker`] so acquisition is
//! never blocked by SSIM.

mod worker;

pub use worker::{ComparisonWorker, WorkerResult};

use crate::core::frame::Frame;
use crate::core::region::RegionBounds;
use crate::core::session::{Comparison, SessionConfig, SessionState};
use crate::core::source::{FrameSource, Resolution};
use crate::core::storage::SessionStore;
use crate::events::{
    null_sender, ComparisonSummary, Event, EventSender, MonitorEvent, SessionEvent,
};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::time::Duration;

/// An operator action relayed from the UI
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Store the current region of the next frame as the reference
    Capture,
    /// Compare the next frame against the reference once
    Compare,
    UpdateRegion(RegionBounds),
    UpdateThreshold(f64),
    /// Compare on every tick
    SetContinuous(bool),
    /// Ask the source for a new frame size (`None` = native)
    SetResolution(Option<Resolution>),
    Quit,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Capture => "capture",
            Action::Compare => "compare",
            Action::UpdateRegion(_) => "update-region",
            Action::UpdateThreshold(_) => "update-threshold",
            Action::SetContinuous(_) => "continuous",
            Action::SetResolution(_) => "resolution",
            Action::Quit => "quit",
        }
    }
}

/// What happened during one tick
#[derive(Debug, Default)]
pub struct TickReport {
    /// Sequence number of the frame used, if any
    pub frame: Option<u64>,
    pub captured: bool,
    /// Comparisons completed during this tick (inline or from the worker)
    pub comparisons: Vec<Comparison>,
    /// Messages of actions that failed
    pub errors: Vec<String>,
    pub quit: bool,
}

/// Options for [`Monitor::run`]
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Pause between ticks
    pub interval: Duration,
    /// Stop after this many ticks
    pub max_ticks: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(33),
            max_ticks: None,
        }
    }
}

/// Drives a session from a frame source
pub struct Monitor {
    source: Box<dyn FrameSource>,
    session: SessionState,
    store: Option<SessionStore>,
    events: EventSender,
    worker: Option<ComparisonWorker>,
    continuous: bool,
    pending_capture: bool,
    pending_compare: bool,
    ticks: u64,
}

impl Monitor {
    pub fn new(source: Box<dyn FrameSource>, session: SessionState) -> Self {
        Self {
            source,
            session,
            store: None,
            events: null_sender(),
            worker: None,
            continuous: false,
            pending_capture: false,
            pending_compare: false,
            ticks: 0,
        }
    }

    /// Persist captures and settings changes to `store`
    pub fn with_store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Report progress through `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Start with continuous comparison on or off
    pub fn continuous(mut self, enabled: bool) -> Self {
        self.continuous = enabled;
        self
    }

    /// Run comparisons on a worker thread
    pub fn offload(mut self) -> Self {
        self.worker = Some(ComparisonWorker::spawn(self.session.engine().clone()));
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick with the given actions
    pub fn tick(&mut self, actions: impl IntoIterator<Item = Action>) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport::default();

        for action in actions {
            self.apply(action, &mut report);
        }

        self.collect_worker_results(&mut report);

        if report.quit {
            return report;
        }

        let Some(frame) = self.source.next_frame() else {
            tracing::trace!(tick = self.ticks, "No frame this tick");
            self.events.send(Event::Monitor(MonitorEvent::NoFrame));
            return report;
        };
        report.frame = Some(frame.sequence());

        if std::mem::take(&mut self.pending_capture) {
            self.capture(&frame, &mut report);
        }

        let single_shot = std::mem::take(&mut self.pending_compare);
        if single_shot || (self.continuous && self.session.has_reference()) {
            self.compare(&frame, &mut report);
        }

        report
    }

    /// Tick until `Quit` arrives, the action channel closes, or
    /// `max_ticks` is reached. Returns the number of ticks run.
    pub fn run(&mut self, actions: &Receiver<Action>, options: &RunOptions) -> u64 {
        self.events.send(Event::Monitor(MonitorEvent::Started {
            source: self.source.describe(),
        }));
        tracing::info!("Monitoring {}", self.source.describe());

        let start = self.ticks;
        let mut carried: Option<Action> = None;
        loop {
            let batch: Vec<Action> = carried.take().into_iter().chain(actions.try_iter()).collect();
            if self.tick(batch).quit {
                break;
            }
            if options.max_ticks.is_some_and(|max| self.ticks - start >= max) {
                break;
            }

            // Wait out the interval, waking early for the next action
            match actions.recv_timeout(options.interval) {
                Ok(action) => carried = Some(action),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("Action channel closed");
                    break;
                }
            }
        }

        let ticks = self.ticks - start;
        self.events
            .send(Event::Monitor(MonitorEvent::Stopped { ticks }));
        ticks
    }

    fn apply(&mut self, action: Action, report: &mut TickReport) {
        match action {
            Action::Capture => self.pending_capture = true,
            Action::Compare => self.pending_compare = true,
            Action::UpdateRegion(bounds) => match self.session.update_region(bounds) {
                Ok(region) => {
                    self.persist_config();
                    self.events
                        .send(Event::Session(SessionEvent::RegionUpdated { region }));
                }
                Err(e) => self.fail("update-region", e.to_string(), report),
            },
            Action::UpdateThreshold(value) => {
                let threshold = self.session.update_threshold(value);
                self.persist_config();
                self.events
                    .send(Event::Session(SessionEvent::ThresholdUpdated { threshold }));
            }
            Action::SetContinuous(enabled) => {
                self.continuous = enabled;
                self.events
                    .send(Event::Monitor(MonitorEvent::ContinuousChanged { enabled }));
            }
            Action::SetResolution(resolution) => {
                self.source.set_resolution(resolution);
                tracing::info!(
                    "Requested resolution {}",
                    resolution.map_or_else(|| "native".to_string(), |r| r.to_string())
                );
                self.events
                    .send(Event::Monitor(MonitorEvent::ResolutionChanged { resolution }));
            }
            Action::Quit => report.quit = true,
        }
    }

    fn capture(&mut self, frame: &Frame, report: &mut TickReport) {
        let reference = match self.session.capture(frame) {
            Ok(reference) => reference,
            Err(e) => {
                self.fail(Action::Capture.name(), e.to_string(), report);
                return;
            }
        };
        report.captured = true;

        let saved_to = self.store.as_ref().and_then(|store| {
            store
                .save_reference(&reference)
                .map_err(|e| tracing::warn!("Reference not persisted: {}", e))
                .ok()
        });
        // Capture may have adopted new geometry
        self.persist_config();

        self.events.send(Event::Session(SessionEvent::Captured {
            width: reference.width(),
            height: reference.height(),
            frame: frame.sequence(),
            saved_to,
        }));
    }

    fn compare(&mut self, frame: &Frame, report: &mut TickReport) {
        if let Some(worker) = self.worker.as_mut() {
            match self.session.prepare_comparison(frame) {
                Ok(job) => worker.submit(job),
                Err(e) => self.fail(Action::Compare.name(), e.to_string(), report),
            }
            return;
        }

        match self.session.compare_live(frame) {
            Ok(comparison) => self.publish(comparison, report),
            Err(e) => self.fail(Action::Compare.name(), e.to_string(), report),
        }
    }

    fn collect_worker_results(&mut self, report: &mut TickReport) {
        let Some(worker) = self.worker.as_ref() else {
            return;
        };

        for result in worker.poll() {
            match result {
                Ok(comparison) => {
                    // Dropped when queued before a recapture
                    if self.session.record(comparison.clone()) {
                        self.publish(comparison, report);
                    }
                }
                Err(e) => self.fail(Action::Compare.name(), e.to_string(), report),
            }
        }
    }

    fn publish(&self, comparison: Comparison, report: &mut TickReport) {
        let (width, height) = comparison.result.dimensions();
        self.events
            .send(Event::Session(SessionEvent::Compared(ComparisonSummary {
                score: comparison.result.score(),
                threshold: comparison.threshold,
                label: comparison.decision.label,
                frame: comparison.frame_sequence,
                width,
                height,
            })));
        report.comparisons.push(comparison);
    }

    fn fail(&self, action: &str, message: String, report: &mut TickReport) {
        tracing::warn!("{} failed: {}", action, message);
        self.events.send(Event::Session(SessionEvent::ActionFailed {
            action: action.to_string(),
            message: message.clone(),
        }));
        report.errors.push(message);
    }

    fn persist_config(&self) {
        if let Some(store) = &self.store {
            let config = SessionConfig {
                region: self.session.region(),
                threshold: self.session.threshold(),
            };
            if let Err(e) = store.save_config(&config) {
                tracing::warn!("Config not persisted: {}", e);
            }
        }
    }
}

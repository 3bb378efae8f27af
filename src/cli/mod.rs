//! # CLI Module
//!
//! Command-line interface for region-of-interest matching.
//!
//! ## Usage
//! ```bash
//! # Compare two images directly
//! roi-match compare before.png after.png --diff diff.png
//!
//! # Capture the region of a snapshot as the reference
//! roi-match capture snapshot.jpg --region 0.2 0.2 0.8 0.8
//!
//! # Check a later snapshot against it
//! roi-match check snapshot.jpg --annotate annotated.png
//!
//! # Interactive loop over a watched folder
//! roi-match watch ~/camera/frames --follow --continuous
//!
//! # JSON output
//! roi-match check snapshot.jpg --output json
//! ```

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::{parse_command, parse_threshold, HELP};
use console::{style, Term};
use image::{GrayImage, RgbImage};
use roi_match::core::decision::{DecisionPolicy, Label, ThresholdPolicy};
use roi_match::core::frame::Frame;
use roi_match::core::monitor::{Monitor, RunOptions};
use roi_match::core::region::{Region, RegionBounds};
use roi_match::core::render::{annotate, DiffVisualizer};
use roi_match::core::session::{Comparison, SessionConfig, SessionState};
use roi_match::core::similarity::{SimilarityResult, SsimConfig};
use roi_match::core::source::{load_frame, open_source, FrameSource, Resolution};
use roi_match::core::storage::SessionStore;
use roi_match::error::{Result, RegionError, SessionError, SourceError, StorageError};
use roi_match::events::{Event, EventChannel, MonitorEvent, SessionEvent};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// ROI Match - Is the scene still what you captured?
#[derive(Parser, Debug)]
#[command(name = "roi-match")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// State directory holding config.json and reference.png
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two images of the same size
    Compare {
        reference: PathBuf,
        candidate: PathBuf,

        /// Similarity threshold (0-1)
        #[arg(short, long, default_value = "0.85")]
        threshold: f64,

        /// SSIM window side (odd)
        #[arg(long, default_value = "7")]
        window: u32,

        /// Write the SSIM diff map here
        #[arg(long)]
        diff: Option<PathBuf>,

        /// Print an ASCII map of where the images differ
        #[arg(long)]
        map: bool,
    },

    /// Capture the region of a frame as the new reference
    Capture {
        /// Image file, or a directory whose first frame is used
        source: PathBuf,

        /// Region as fractions of the frame
        #[arg(long, num_args = 4, value_names = ["TOP", "LEFT", "BOTTOM", "RIGHT"])]
        region: Option<Vec<f64>>,

        /// Resize the frame first (WIDTHxHEIGHT or native)
        #[arg(long)]
        resolution: Option<String>,
    },

    /// Compare the region of a frame against the stored reference
    Check {
        /// Image file, or a directory whose first frame is used
        source: PathBuf,

        /// Override the stored threshold for this check
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Resize the frame first (WIDTHxHEIGHT or native)
        #[arg(long)]
        resolution: Option<String>,

        /// Write the SSIM diff map here
        #[arg(long)]
        diff: Option<PathBuf>,

        /// Write the frame with the region outlined here
        #[arg(long)]
        annotate: Option<PathBuf>,

        /// Print an ASCII map of where the region differs
        #[arg(long)]
        map: bool,
    },

    /// Watch a frame source and take commands from stdin
    Watch {
        /// Image file, or a directory of frames
        source: PathBuf,

        /// Watch the directory for new frames instead of replaying it
        #[arg(long)]
        follow: bool,

        /// Replay a directory forever
        #[arg(long = "loop")]
        looping: bool,

        /// Compare on every frame from the start
        #[arg(long)]
        continuous: bool,

        /// Milliseconds between ticks
        #[arg(long, default_value = "500")]
        interval_ms: u64,

        /// Stop after this many ticks
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Initial frame size (WIDTHxHEIGHT or native)
        #[arg(long)]
        resolution: Option<String>,

        /// Run comparisons on a background thread
        #[arg(long)]
        offload: bool,
    },

    /// Show or change the stored configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the stored region, threshold and reference
    Show,
    /// Store a new region
    SetRegion {
        top: f64,
        left: f64,
        bottom: f64,
        right: f64,
    },
    /// Store a new threshold
    SetThreshold { value: f64 },
    /// Restore defaults and forget the reference
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    roi_match::init_tracing(cli.verbose);

    let output = cli.output;
    let term = Term::stderr();

    match cli.command {
        Commands::Compare {
            reference,
            candidate,
            threshold,
            window,
            diff,
            map,
        } => run_compare(&reference, &candidate, threshold, window, diff, map, output),
        Commands::Capture {
            source,
            region,
            resolution,
        } => {
            let store = open_store(cli.state_dir)?;
            run_capture(&store, &source, region, resolution, output, &term)
        }
        Commands::Check {
            source,
            threshold,
            resolution,
            diff,
            annotate,
            map,
        } => {
            let store = open_store(cli.state_dir)?;
            let options = CheckOptions {
                threshold,
                resolution,
                diff,
                annotate,
                map,
            };
            run_check(&store, &source, options, output, &term)
        }
        Commands::Watch {
            source,
            follow,
            looping,
            continuous,
            interval_ms,
            max_ticks,
            resolution,
            offload,
        } => {
            let store = open_store(cli.state_dir)?;
            let mut source = open_source(&source, follow, looping)?;
            source.set_resolution(parse_resolution(resolution)?);
            let options = RunOptions {
                interval: Duration::from_millis(interval_ms),
                max_ticks,
            };
            run_watch(store, source, continuous, offload, options, output, &term)
        }
        Commands::Config { action } => {
            let store = open_store(cli.state_dir)?;
            run_config(&store, action, output)
        }
    }
}

fn open_store(dir: Option<PathBuf>) -> Result<SessionStore> {
    let store = match dir {
        Some(dir) => SessionStore::open(dir)?,
        None => SessionStore::open_default()?,
    };
    tracing::debug!("Using state directory {}", store.dir().display());
    Ok(store)
}

fn parse_resolution(text: Option<String>) -> Result<Option<Resolution>> {
    match text {
        Some(text) => Ok(Resolution::parse(&text)?),
        None => Ok(None),
    }
}

/// Pull one frame from a file or directory
fn first_frame(path: &Path, resolution: Option<Resolution>) -> Result<Frame> {
    let mut source = open_source(path, false, false)?;
    source.set_resolution(resolution);
    source.next_frame().ok_or_else(|| {
        SourceError::NoFrames {
            path: path.to_path_buf(),
        }
        .into()
    })
}

fn run_compare(
    reference: &Path,
    candidate: &Path,
    threshold: f64,
    window: u32,
    diff: Option<PathBuf>,
    map: bool,
    output: OutputFormat,
) -> Result<()> {
    let policy = ThresholdPolicy::new(parse_threshold(threshold)?);
    let engine = SsimConfig::new().window_size(window).build()?;

    let a = load_frame(reference, 0, None)?;
    let b = load_frame(candidate, 1, None)?;
    let result = engine.compare(a.pixels(), b.pixels())?;
    let decision = policy.decide(result.score());

    if let Some(path) = &diff {
        save_gray(result.diff_map(), path)?;
    }

    match output {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            write_score_line(&term, &result, decision.label, policy.threshold());
            if map {
                term.write_line(&DiffVisualizer::default().heat_map(result.diff_map()))
                    .ok();
            }
            if let Some(path) = &diff {
                term.write_line(&format!("  {} {}", style("Diff map:").dim(), path.display()))
                    .ok();
            }
        }
        OutputFormat::Json => {
            let (width, height) = result.dimensions();
            print_json(&serde_json::json!({
                "reference": reference,
                "candidate": candidate,
                "score": result.score(),
                "threshold": policy.threshold(),
                "label": decision.label,
                "width": width,
                "height": height,
                "diff_map": diff,
            }));
        }
    }

    Ok(())
}

fn run_capture(
    store: &SessionStore,
    source: &Path,
    region: Option<Vec<f64>>,
    resolution: Option<String>,
    output: OutputFormat,
    term: &Term,
) -> Result<()> {
    let frame = first_frame(source, parse_resolution(resolution)?)?;
    let mut session = store.load_session();

    let reference = match region {
        Some(values) => {
            let region = Region::try_from(bounds_from(&values)?)?;
            session.capture_region(&frame, region)?
        }
        None => session.capture(&frame)?,
    };

    let path = store.save_reference(&reference)?;
    store.save_config(&session_config(&session))?;

    match output {
        OutputFormat::Pretty => {
            term.write_line(&format!(
                "{} Captured {}x{} reference from {}",
                style("✓").green().bold(),
                reference.width(),
                reference.height(),
                source.display()
            ))
            .ok();
            term.write_line(&format!("  {} {}", style("Region:").dim(), session.region()))
                .ok();
            term.write_line(&format!("  {} {}", style("Saved to:").dim(), path.display()))
                .ok();
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "width": reference.width(),
            "height": reference.height(),
            "region": session.region(),
            "captured_at": reference.captured_at(),
            "path": path,
        })),
    }

    Ok(())
}

struct CheckOptions {
    threshold: Option<f64>,
    resolution: Option<String>,
    diff: Option<PathBuf>,
    annotate: Option<PathBuf>,
    map: bool,
}

fn run_check(
    store: &SessionStore,
    source: &Path,
    options: CheckOptions,
    output: OutputFormat,
    term: &Term,
) -> Result<()> {
    let mut session = store.load_session();
    if !session.has_reference() {
        return Err(SessionError::NoReference.into());
    }
    if let Some(threshold) = options.threshold {
        session.update_threshold(parse_threshold(threshold)?);
    }

    let frame = first_frame(source, parse_resolution(options.resolution)?)?;
    let comparison = session.compare_live(&frame)?;

    if let Some(path) = &options.diff {
        save_gray(comparison.result.diff_map(), path)?;
    }
    if let Some(path) = &options.annotate {
        let rect = session.region().to_pixel_rect(frame.width(), frame.height())?;
        save_rgb(&annotate(&frame, rect, Some(comparison.decision.emphasis)), path)?;
    }

    match output {
        OutputFormat::Pretty => {
            let stdout = Term::stdout();
            write_score_line(
                &stdout,
                &comparison.result,
                comparison.decision.label,
                comparison.threshold,
            );
            if options.map {
                stdout
                    .write_line(&DiffVisualizer::default().heat_map(comparison.result.diff_map()))
                    .ok();
            }
            for (label, path) in [("Diff map:", &options.diff), ("Annotated:", &options.annotate)] {
                if let Some(path) = path {
                    term.write_line(&format!("  {} {}", style(label).dim(), path.display()))
                        .ok();
                }
            }
        }
        OutputFormat::Json => print_json(&comparison_json(&comparison, source)),
    }

    Ok(())
}

fn run_watch(
    store: SessionStore,
    source: Box<dyn FrameSource>,
    continuous: bool,
    offload: bool,
    options: RunOptions,
    output: OutputFormat,
    term: &Term,
) -> Result<()> {
    if output == OutputFormat::Pretty {
        term.write_line(&format!(
            "{} {}",
            style("ROI Match").bold().cyan(),
            style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line(HELP).ok();
        term.write_line("").ok();
    }

    let session = store.load_session();
    let (sender, receiver) = EventChannel::new();
    let mut monitor = Monitor::new(source, session)
        .with_store(store)
        .with_events(sender)
        .continuous(continuous);
    if offload {
        monitor = monitor.offload();
    }

    let event_thread = thread::spawn(move || {
        let term = Term::stdout();
        for event in receiver.iter() {
            match output {
                OutputFormat::Pretty => write_event(&term, &event),
                OutputFormat::Json => match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Failed to serialize event: {}", e),
                },
            }
        }
    });

    let (actions, action_receiver) = crossbeam_channel::unbounded();
    // Closed stdin ends the run only when nothing else would keep it going
    let _keepalive = outlives_stdin(options.max_ticks, continuous).then(|| actions.clone());

    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_command(&line) {
                Ok(Some(action)) => {
                    if actions.send(action).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => eprintln!("{} {}", style("✗").red(), e),
            }
        }
    });

    monitor.run(&action_receiver, &options);

    // Dropping the monitor closes the event channel
    drop(monitor);
    event_thread.join().ok();
    Ok(())
}

/// Bounded and continuous runs keep going after stdin closes
fn outlives_stdin(max_ticks: Option<u64>, continuous: bool) -> bool {
    max_ticks.is_some() || continuous
}

fn run_config(
    store: &SessionStore,
    action: ConfigCommand,
    output: OutputFormat,
) -> Result<()> {
    let mut session = SessionState::new(store.load_config());

    match action {
        ConfigCommand::Show => {}
        ConfigCommand::SetRegion {
            top,
            left,
            bottom,
            right,
        } => {
            session.update_region(RegionBounds {
                top,
                left,
                bottom,
                right,
            })?;
            store.save_config(&session_config(&session))?;
        }
        ConfigCommand::SetThreshold { value } => {
            session.update_threshold(parse_threshold(value)?);
            store.save_config(&session_config(&session))?;
        }
        ConfigCommand::Reset => {
            session = SessionState::default();
            store.save_config(&SessionConfig::default())?;
            store.clear_reference()?;
        }
    }

    let reference = match store.load_reference() {
        Ok(reference) => reference,
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    };

    match output {
        OutputFormat::Pretty => {
            let stdout = Term::stdout();
            stdout
                .write_line(&format!("{} {}", style("State:").bold(), store.dir().display()))
                .ok();
            stdout
                .write_line(&format!("  {} {}", style("Region:").dim(), session.region()))
                .ok();
            stdout
                .write_line(&format!(
                    "  {} {:.2}",
                    style("Threshold:").dim(),
                    session.threshold()
                ))
                .ok();
            let reference_line = match &reference {
                Some(r) => format!(
                    "{}x{} captured {}",
                    r.width(),
                    r.height(),
                    r.captured_at().format("%Y-%m-%d %H:%M:%S UTC")
                ),
                None => style("none").dim().to_string(),
            };
            stdout
                .write_line(&format!("  {} {}", style("Reference:").dim(), reference_line))
                .ok();
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "state_dir": store.dir(),
            "region": session.region(),
            "threshold": session.threshold(),
            "reference": reference.map(|r| serde_json::json!({
                "width": r.width(),
                "height": r.height(),
                "captured_at": r.captured_at(),
            })),
        })),
    }

    Ok(())
}

fn session_config(session: &SessionState) -> SessionConfig {
    SessionConfig {
        region: session.region(),
        threshold: session.threshold(),
    }
}

fn bounds_from(values: &[f64]) -> std::result::Result<RegionBounds, RegionError> {
    match values {
        [top, left, bottom, right] => Ok(RegionBounds {
            top: *top,
            left: *left,
            bottom: *bottom,
            right: *right,
        }),
        _ => Err(RegionError::InvalidBounds {
            reason: format!("expected 4 values, got {}", values.len()),
        }),
    }
}

fn write_score_line(term: &Term, result: &SimilarityResult, label: Label, threshold: f64) {
    let label_text = match label {
        Label::Similar => style(label.to_string()).green().bold(),
        Label::Dissimilar => style(label.to_string()).red().bold(),
    };
    term.write_line(&format!(
        "{} {}",
        label_text,
        DiffVisualizer::default().similarity_bar(result.percent())
    ))
    .ok();
    term.write_line(&format!(
        "  {}",
        style(DiffVisualizer::default().summarize(result, threshold)).dim()
    ))
    .ok();
}

fn write_event(term: &Term, event: &Event) {
    let line = match event {
        Event::Session(SessionEvent::Compared(summary)) => {
            let label = match summary.label {
                Label::Similar => style(summary.label.to_string()).green().bold(),
                Label::Dissimilar => style(summary.label.to_string()).red().bold(),
            };
            format!(
                "{} {} SSIM {:.4} (threshold {:.2}, frame {})",
                label,
                DiffVisualizer::default().similarity_bar(summary.score * 100.0),
                summary.score,
                summary.threshold,
                summary.frame
            )
        }
        Event::Session(SessionEvent::Captured {
            width,
            height,
            frame,
            ..
        }) => format!(
            "{} Captured {}x{} reference from frame {}",
            style("✓").green().bold(),
            width,
            height,
            frame
        ),
        Event::Session(SessionEvent::RegionUpdated { region }) => {
            format!("{} Region {}", style("•").cyan(), region)
        }
        Event::Session(SessionEvent::ThresholdUpdated { threshold }) => {
            format!("{} Threshold {:.2}", style("•").cyan(), threshold)
        }
        Event::Session(SessionEvent::ActionFailed { action, message }) => {
            format!("{} {}: {}", style("✗").red().bold(), action, message)
        }
        Event::Monitor(MonitorEvent::Started { source }) => {
            format!("{} Watching {}", style("▶").cyan(), source)
        }
        Event::Monitor(MonitorEvent::ContinuousChanged { enabled }) => format!(
            "{} Continuous comparison {}",
            style("•").cyan(),
            if *enabled { "on" } else { "off" }
        ),
        Event::Monitor(MonitorEvent::ResolutionChanged { resolution }) => format!(
            "{} Resolution {}",
            style("•").cyan(),
            resolution.map_or_else(|| "native".to_string(), |r| r.to_string())
        ),
        Event::Monitor(MonitorEvent::NoFrame) => return,
        Event::Monitor(MonitorEvent::Stopped { ticks }) => {
            format!("{} Stopped after {} ticks", style("■").dim(), ticks)
        }
    };
    term.write_line(&line).ok();
}

fn comparison_json(comparison: &Comparison, source: &Path) -> serde_json::Value {
    let (width, height) = comparison.result.dimensions();
    serde_json::json!({
        "source": source,
        "score": comparison.result.score(),
        "threshold": comparison.threshold,
        "label": comparison.decision.label,
        "width": width,
        "height": height,
        "compared_at": comparison.compared_at,
    })
}

fn print_json(value: &serde_json::Value) {
    println!("{:#}", value);
}

fn save_gray(image: &GrayImage, path: &Path) -> Result<()> {
    image.save(path).map_err(|e| StorageError::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}

fn save_rgb(image: &RgbImage, path: &Path) -> Result<()> {
    image.save(path).map_err(|e| StorageError::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_watch_outlives_stdin() {
        assert!(outlives_stdin(None, true));
        assert!(outlives_stdin(Some(10), false));
        assert!(!outlives_stdin(None, false));
    }

    #[test]
    fn closed_action_channel_ends_interactive_watch_only() {
        for (continuous, alive) in [(true, true), (false, false)] {
            let (actions, receiver) = crossbeam_channel::unbounded::<()>();
            let keepalive = outlives_stdin(None, continuous).then(|| actions.clone());
            drop(actions);

            let closed = receiver.recv_timeout(Duration::from_millis(10))
                == Err(crossbeam_channel::RecvTimeoutError::Disconnected);
            assert_eq!(closed, !alive);
            drop(keepalive);
        }
    }
}

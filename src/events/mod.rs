//! # Events Module
//!
//! Event-driven reporting so any UI can follow the monitor loop.
//!
//! ## Design
//! The core emits events through channels; the CLI (or any other front end)
//! subscribes and renders them.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Session(SessionEvent::Compared(s)) = event {
//!             println!("{} {:.3}", s.label, s.score);
//!         }
//!     }
//! });
//!
//! let mut monitor = Monitor::new(source, session).with_events(sender);
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;

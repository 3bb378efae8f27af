//! # roi-match CLI
//!
//! Command-line interface for region-of-interest matching.
//!
//! ## Usage
//! ```bash
//! roi-match capture snapshot.jpg --region 0.2 0.2 0.8 0.8
//! roi-match check snapshot.jpg --output json
//! roi-match watch ~/camera/frames --follow --continuous
//! ```

mod cli;

use roi_match::Result;

fn main() -> Result<()> {
    cli::run()
}

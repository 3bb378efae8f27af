//! Operator commands typed while watching.

use roi_match::core::monitor::Action;
use roi_match::core::region::RegionBounds;
use roi_match::core::source::Resolution;
use roi_match::error::ConfigError;

pub const HELP: &str = "\
  c                      capture the region as the new reference
  v                      compare the region against the reference
  region T L B R         set the region (fractions of the frame)
  threshold X            set the similarity threshold (0-1)
  continuous on|off      compare on every frame
  resolution WxH|native  change the frame size
  q                      quit";

/// Parse one line of operator input. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Action>, ConfigError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();
    let invalid = || ConfigError::InvalidCommand(line.trim().to_string());

    let action = match (command.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("c" | "capture", []) => Action::Capture,
        ("v" | "compare", []) => Action::Compare,
        ("q" | "quit" | "exit", []) => Action::Quit,
        ("region", [top, left, bottom, right]) => {
            let parse = |s: &str| s.parse::<f64>().map_err(|_| invalid());
            Action::UpdateRegion(RegionBounds {
                top: parse(*top)?,
                left: parse(*left)?,
                bottom: parse(*bottom)?,
                right: parse(*right)?,
            })
        }
        ("threshold", [value]) => {
            Action::UpdateThreshold(value.parse().map_err(|_| invalid())?)
        }
        ("continuous", [state]) => match *state {
            "on" => Action::SetContinuous(true),
            "off" => Action::SetContinuous(false),
            _ => return Err(invalid()),
        },
        ("resolution", [value]) => Action::SetResolution(Resolution::parse(value)?),
        _ => return Err(invalid()),
    };

    Ok(Some(action))
}

/// Strict threshold check for command-line flags
pub fn parse_threshold(value: f64) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::ThresholdOutOfRange { value })
    }
}

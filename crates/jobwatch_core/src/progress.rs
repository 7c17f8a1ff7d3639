//! Status-message progress grammar.
//!
//! The remote pipeline reports progress as free text of the form
//! `Progress <N>%: <description>`. This module is the only place that knows
//! that convention; pollers and the store see [`ProgressSnapshot`] values.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::JobStatus;

pub const COMPLETED_STEP: &str = "Processing completed";
pub const FAILED_STEP: &str = "Processing failed";

// ASCII digits only; `\d` would also accept other Unicode digit scripts.
const PROGRESS_PATTERN: &str = r"Progress ([0-9]+)%: (.*)";

static PROGRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PROGRESS_PATTERN).expect("valid progress regex"));

/// Structured progress derived from the last status message.
///
/// `percent == None` means the message carried no number, not zero progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub percent: Option<u8>,
    pub step: String,
}

impl ProgressSnapshot {
    pub fn new(percent: Option<u8>, step: impl Into<String>) -> Self {
        Self {
            percent,
            step: step.into(),
        }
    }
}

/// Turns a status message into structured progress.
///
/// `previous` is the snapshot currently held for the job; it is only
/// consulted for failed jobs, whose percent stays frozen at the last value.
pub fn parse_progress(
    message: Option<&str>,
    status: JobStatus,
    previous: Option<&ProgressSnapshot>,
) -> Option<ProgressSnapshot> {
    let matched = message.and_then(match_grammar);

    match status {
        JobStatus::Completed => Some(ProgressSnapshot::new(Some(100), COMPLETED_STEP)),
        JobStatus::Failed => {
            let step = match (&matched, message) {
                (Some((_, description)), _) if !description.is_empty() => description.clone(),
                (_, Some(text)) if !text.trim().is_empty() => text.trim().to_string(),
                _ => FAILED_STEP.to_string(),
            };
            Some(ProgressSnapshot::new(
                previous.and_then(|snapshot| snapshot.percent),
                step,
            ))
        }
        JobStatus::Pending | JobStatus::Processing => {
            if let Some((percent, step)) = matched {
                return Some(ProgressSnapshot::new(Some(percent), step));
            }
            match message {
                Some(text) if status == JobStatus::Processing && !text.trim().is_empty() => {
                    Some(ProgressSnapshot::new(None, text.trim()))
                }
                _ => None,
            }
        }
    }
}

fn match_grammar(message: &str) -> Option<(u8, String)> {
    // `.` stops at a newline, so the step is the rest of the matching line.
    let captures = PROGRESS_RE.captures(message)?;
    let percent = clamp_percent(captures.get(1)?.as_str());
    let step = captures.get(2).map_or("", |m| m.as_str()).trim().to_string();
    Some((percent, step))
}

// Digit runs too long for u32 saturate to 100 as well.
fn clamp_percent(digits: &str) -> u8 {
    match digits.parse::<u32>() {
        Ok(value) => value.min(100) as u8,
        Err(_) => 100,
    }
}

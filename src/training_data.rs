//! `WHST` training-label files: ASCII spans of `label=start,stop` marking
//! which samples of a recording belong to which class.

use crate::error::{Result, WhistleError};
use crate::feature::TrainingLabel;
use std::fs;
use std::path::Path;

const HEADER: &str = "WHST\n";

/// Parses a `WHST` file into a sorted list of [`TrainingLabel`]s.
///
/// Enforces the invariant that records are sorted with `prev.stop <=
/// next.start` and, within a record, `start <= stop`; any violation
/// aborts the whole load with `InvalidFormat`, matching the original's
/// all-or-nothing parse.
pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<TrainingLabel>> {
    let text = fs::read_to_string(path)?;
    parse_labels(&text)
}

fn parse_labels(text: &str) -> Result<Vec<TrainingLabel>> {
    if !text.starts_with(HEADER) {
        return Err(WhistleError::invalid_format("missing WHST header"));
    }
    let mut labels = Vec::new();
    let mut prev_stop: u64 = 0;

    for line in text[HEADER.len()..].lines() {
        if line.is_empty() {
            continue;
        }
        let (label_str, rest) = line
            .split_once('=')
            .ok_or_else(|| WhistleError::invalid_format("missing '=' in WHST record"))?;
        let (start_str, stop_str) = rest
            .split_once(',')
            .ok_or_else(|| WhistleError::invalid_format("missing ',' in WHST record"))?;

        let label: i32 = label_str
            .parse()
            .map_err(|_| WhistleError::invalid_format("bad label in WHST record"))?;
        let start: u64 = start_str
            .parse()
            .map_err(|_| WhistleError::invalid_format("bad start offset in WHST record"))?;
        let stop: u64 = stop_str
            .parse()
            .map_err(|_| WhistleError::invalid_format("bad stop offset in WHST record"))?;

        if start > stop {
            return Err(WhistleError::invalid_format("start after stop"));
        }
        if prev_stop > start {
            return Err(WhistleError::invalid_format(
                "records are not sorted: previous stop exceeds next start",
            ));
        }
        prev_stop = stop;
        labels.push(TrainingLabel::new(label, start, stop));
    }

    Ok(labels)
}

/// Writes `labels` as a `WHST` file. Records with `label == -1` are
/// skipped (matching the original's save-time filter); callers are
/// expected to pass an already-sorted, non-overlapping sequence.
pub fn save_labels(labels: &[TrainingLabel], path: impl AsRef<Path>) -> Result<()> {
    let mut out = String::from(HEADER);
    for l in labels {
        if l.label == -1 {
            continue;
        }
        out.push_str(&format!("{}={},{}\n", l.label, l.start, l.stop));
    }
    fs::write(path, out)?;
    Ok(())
}

/// Given the absolute sample span `[pos, pos + frame_len)`, returns the
/// label of the (sorted, non-overlapping) training label whose span fully
/// covers it, or `None` if no label fully covers the frame.
pub fn label_for_frame(labels: &[TrainingLabel], pos: u64, frame_len: u64) -> Option<i32> {
    let end = pos + frame_len;
    labels
        .iter()
        .find(|l| l.start <= pos && end <= l.stop)
        .map(|l| l.label)
}

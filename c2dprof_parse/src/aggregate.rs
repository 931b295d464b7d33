//! Aggregation of report lines into per-function percentages.

use crate::line::{LineKind, classify_line, match_sample_line};
use crate::{FunctionPercents, ParseError, Result, TargetFunctions};
use std::io::{BufRead, BufReader, Read};
use tracing::debug;

/// What to do when a symbol has more than one sample header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// The last header seen wins.
    #[default]
    Overwrite,
    /// Self percentages of all headers are added up.
    Sum,
}

/// Self-time totals, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfTimeSummary {
    /// Sum over the returned map.
    pub target_total: f64,
    /// Sum over every matched header, whatever its shared object.
    pub all_total: f64,
}

/// Self-time percentages of the symbols belonging to `target_binary`.
///
/// Every line of the report is scanned; lines that are not sample headers are
/// ignored. Samples attributed to other shared objects (libc, the kernel, ...)
/// are dropped.
pub fn self_time_percents<R: Read>(
    reader: R,
    target_binary: &str,
    policy: DuplicatePolicy,
) -> Result<(FunctionPercents, SelfTimeSummary)> {
    let mut percents = FunctionPercents::new();
    let mut all_total = 0.0;

    for line_result in BufReader::new(reader).lines() {
        let line = line_result?;
        let Some(sample) = match_sample_line(&line) else {
            continue;
        };
        all_total += sample.self_pct;
        if sample.shared_object != target_binary {
            continue;
        }
        match policy {
            DuplicatePolicy::Overwrite => {
                percents.insert(sample.symbol, sample.self_pct);
            }
            DuplicatePolicy::Sum => percents.add(&sample.symbol, sample.self_pct),
        }
    }

    percents.sort_descending();
    let summary = SelfTimeSummary {
        target_total: percents.total(),
        all_total,
    };
    debug!(
        "Total self pct: {}/{}",
        summary.target_total, summary.all_total
    );

    Ok((percents, summary))
}

/// Call-graph percentages of the tracked functions.
///
/// Each sample header opens a section for its symbol; sections of untracked
/// symbols are skipped. Inside a tracked section every folded stack line is
/// scanned from its last frame backwards, and its percentage is credited to
/// the section's function only if that function is the first tracked frame
/// found. Scanning stops at the first blank line.
///
/// Every tracked function appears in the result, at zero if never credited.
pub fn call_graph_percents<R: Read>(
    reader: R,
    targets: &TargetFunctions,
) -> Result<FunctionPercents> {
    let mut percents: FunctionPercents = targets.iter().map(|f| (f.to_string(), 0.0)).collect();
    let mut current_fn: Option<String> = None;
    let mut skip_section = false;

    for (line_num, line_result) in BufReader::new(reader).lines().enumerate() {
        let line = line_result?;

        match classify_line(&line) {
            LineKind::Blank => break,
            LineKind::Comment => continue,
            LineKind::SampleHeader(sample) => {
                skip_section = !targets.contains(&sample.symbol);
                current_fn = Some(sample.symbol);
            }
            _ if skip_section => continue,
            LineKind::CallStack(stack) => {
                let nearest = stack.frames.iter().rev().find(|f| targets.contains(f));
                match (nearest, current_fn.as_deref()) {
                    (Some(frame), Some(current)) if frame == current => {
                        percents.add(current, stack.percent)
                    }
                    _ => {}
                }
            }
            LineKind::Unrecognized => {
                return Err(ParseError::Malformed {
                    line: line_num + 1,
                    message: format!("expected '<pct> frame;frame;...', found '{}'", line.trim()),
                });
            }
        }
    }

    debug!("Total function percents: {}", percents.total());
    normalize(&mut percents);
    percents.sort_descending();
    Ok(percents)
}

/// Rescale so the values sum to 100 when they currently exceed it.
///
/// Totals at or below 100 are left alone; the remainder is time spent outside
/// the tracked functions.
pub fn normalize(percents: &mut FunctionPercents) {
    let total = percents.total();
    if total > 100.0 {
        for pct in percents.values_mut() {
            *pct = *pct / total * 100.0;
        }
    }
}

//! Line classification for `perf report --stdio` output.

use regex::Regex;
use std::sync::LazyLock;

/// `<children>% <self>% <command> <shared object> [.] <symbol>`
///
/// Both percentages must carry a decimal point, which is how `perf report`
/// prints them; integer percentages are rejected.
static SAMPLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?P<children_pct>\d+\.\d+)%",
        r"\s+(?P<self_pct>\d+\.\d+)%",
        r"\s+(?P<command>\S+)",
        r"\s+(?P<shared_object>\S+)",
        r"\s+\[\.\]\s+(?P<symbol>\S+)$",
    ))
    .expect("sample line pattern is valid")
});

/// A top-level sample header from a `perf report`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleLine {
    pub children_pct: f64,
    pub self_pct: f64,
    pub command: String,
    /// Binary or library the sample is attributed to (`miniC2D`, `libc.so.6`, ...).
    pub shared_object: String,
    pub symbol: String,
}

/// A folded call-graph line: a percentage and the frames it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct CallStackLine {
    pub percent: f64,
    /// Frames in the order they appear in the report, separated by `;`.
    pub frames: Vec<String>,
}

/// Classification of one report line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    Blank,
    Comment,
    SampleHeader(SampleLine),
    CallStack(CallStackLine),
    Unrecognized,
}

/// Match a line against the sample header format.
///
/// Returns `None` when the line is not a header, which callers treat as a
/// continuation line rather than an error.
pub fn match_sample_line(line: &str) -> Option<SampleLine> {
    let caps = SAMPLE_LINE.captures(line.trim())?;
    Some(SampleLine {
        children_pct: caps["children_pct"].parse().ok()?,
        self_pct: caps["self_pct"].parse().ok()?,
        command: caps["command"].to_string(),
        shared_object: caps["shared_object"].to_string(),
        symbol: caps["symbol"].to_string(),
    })
}

impl CallStackLine {
    /// Parse `<pct>[%] frame;frame;...`.
    pub fn parse(line: &str) -> Option<Self> {
        let (pct, rest) = line.trim().split_once(char::is_whitespace)?;
        let percent = pct.replace('%', "").parse().ok()?;
        let frames = rest.trim_start().split(';').map(str::to_string).collect();
        Some(Self { percent, frames })
    }
}

/// Classify a single line of a report.
///
/// Leading and trailing whitespace is ignored. Sample headers take precedence
/// over call-stack lines.
pub fn classify_line(line: &str) -> LineKind {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }
    if line.starts_with('#') {
        return LineKind::Comment;
    }
    if let Some(sample) = match_sample_line(line) {
        return LineKind::SampleHeader(sample);
    }
    match CallStackLine::parse(line) {
        Some(stack) => LineKind::CallStack(stack),
        None => LineKind::Unrecognized,
    }
}

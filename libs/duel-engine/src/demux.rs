/// Output Demultiplexer
///
/// The harness shares stdout with the user's own prints. Everything before
/// the first line carrying [`MARKER`] belongs to the user; that line holds the
/// serialized results; anything after it is dropped.
use crate::error::EngineError;
use crate::Result;

/// Prefix of the line carrying serialized results
pub const MARKER: &str = "STORAGE=";
/// Separator between per-test results on the marker line
pub const SEPARATOR: &str = "==SEP==";

const LINE_BREAKS: &[char] = &['\n', '\r'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demuxed {
    /// User-visible lines, in print order
    pub output_lines: Vec<String>,
    /// The marker line, when the harness reached its print trailer
    pub storage_line: Option<String>,
}

impl Demuxed {
    /// The marker line, or `MarkerNotFound` when the harness never printed it
    pub fn require_storage_line(&self) -> Result<&str> {
        self.storage_line
            .as_deref()
            .ok_or(EngineError::MarkerNotFound)
    }
}

/// Split raw stdout into user lines and the marker line.
/// Accepts `\n`, `\r\n` and lone `\r` line endings.
pub fn demux(raw_stdout: &str) -> Demuxed {
    let mut output_lines = Vec::new();
    let mut storage_line = None;

    let trimmed = raw_stdout.trim();
    if !trimmed.is_empty() {
        for line in trimmed.split("\r\n").flat_map(|chunk| chunk.split(LINE_BREAKS)) {
            if line.contains(MARKER) {
                storage_line = Some(line.to_string());
                break;
            }
            output_lines.push(line.to_string());
        }
    }

    Demuxed {
        output_lines,
        storage_line,
    }
}

/// Per-test result segments of a marker line
pub fn split_results(storage_line: &str) -> Vec<&str> {
    let payload = match storage_line.find(MARKER) {
        Some(at) => &storage_line[at + MARKER.len()..],
        None => storage_line,
    };
    payload.split(SEPARATOR).collect()
}

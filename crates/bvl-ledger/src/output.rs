//! Step outputs handed back to the calling workflow.
//!
//! Outputs use the GitHub Actions `$GITHUB_OUTPUT` file format:
//!
//! ```text
//! full_version=v1.0.5-beta
//! tags<<EOF
//! ["v1-beta","v1.0-beta","v1.0.5-beta","beta"]
//! EOF
//! ```
//!
//! Single-line values are written as `name=value`; multi-line values use a
//! heredoc block closed by `EOF`.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use bvl_types::VersionRecord;
use serde_json::{Map, Value};

/// Heredoc delimiter for block values.
const DELIMITER: &str = "EOF";

#[derive(Clone, Debug, PartialEq, Eq)]
enum OutputValue {
    Line(String),
    Block(String),
}

/// An ordered set of named outputs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outputs {
    entries: Vec<(String, OutputValue)>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// The outputs of an advance: `full_version` and the JSON `tags` block.
    pub fn for_record(record: &VersionRecord) -> Self {
        let tags = Value::from(record.tags.clone()).to_string();
        Self::new()
            .line("full_version", &record.version)
            .block("tags", tags)
    }

    /// Add a `name=value` output.
    pub fn line(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .push((name.into(), OutputValue::Line(value.into())));
        self
    }

    /// Add a heredoc output.
    pub fn block(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .push((name.into(), OutputValue::Block(value.into())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an output value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| match v {
            OutputValue::Line(s) | OutputValue::Block(s) => s.as_str(),
        })
    }

    /// Render in `$GITHUB_OUTPUT` format.
    ///
    /// Fails if a name is empty or contains `=` or a newline, if a line value
    /// contains a newline, or if a block value contains the delimiter line.
    pub fn render(&self) -> io::Result<String> {
        let mut out = String::new();
        for (name, value) in &self.entries {
            if name.is_empty() || name.contains(['=', '\n', '\r']) {
                return Err(invalid(format!("invalid output name {name:?}")));
            }
            match value {
                OutputValue::Line(v) => {
                    if v.contains(['\n', '\r']) {
                        return Err(invalid(format!("output {name} must be a single line")));
                    }
                    out.push_str(&format!("{name}={v}\n"));
                }
                OutputValue::Block(v) => {
                    if v.lines().any(|l| l == DELIMITER) {
                        return Err(invalid(format!(
                            "output {name} contains the delimiter line {DELIMITER}"
                        )));
                    }
                    out.push_str(&format!("{name}<<{DELIMITER}\n{v}\n{DELIMITER}\n"));
                }
            }
        }
        Ok(out)
    }

    /// A JSON object of all outputs, for machine-readable CLI output.
    ///
    /// Block values that hold JSON are embedded as JSON, not as strings.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in &self.entries {
            let v = match value {
                OutputValue::Line(s) => Value::String(s.clone()),
                OutputValue::Block(s) => {
                    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
                }
            };
            map.insert(name.clone(), v);
        }
        Value::Object(map)
    }
}

/// A write-once destination for outputs.
///
/// `emit` consumes the sink, so a sink can never be written twice.
pub trait OutputSink {
    fn emit(self, outputs: &Outputs) -> io::Result<()>;
}

/// Appends outputs to a file such as the one named by `$GITHUB_OUTPUT`.
#[derive(Clone, Debug)]
pub struct OutputFile {
    path: PathBuf,
}

impl OutputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputSink for OutputFile {
    fn emit(self, outputs: &Outputs) -> io::Result<()> {
        let rendered = outputs.render()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(rendered.as_bytes())?;
        file.flush()
    }
}

/// Writes outputs to any [`Write`], e.g. stdout.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    inner: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> OutputSink for WriterSink<W> {
    fn emit(mut self, outputs: &Outputs) -> io::Result<()> {
        let rendered = outputs.render()?;
        self.inner.write_all(rendered.as_bytes())?;
        self.inner.flush()
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

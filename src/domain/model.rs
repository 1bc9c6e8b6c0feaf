use crate::analysis::{AnalysisKind, Direction, Leak};
use crate::cfg::builder::Granularity;
use crate::cfg::graph::BlockId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
    Tsv,
}

impl OutputFormat {
    pub const NAMES: [&'static str; 4] = ["text", "json", "csv", "tsv"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "csv" => Some(OutputFormat::Csv),
            "tsv" => Some(OutputFormat::Tsv),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockSummary {
    pub id: BlockId,
    pub statements: Vec<String>,
    pub jump: String,
    pub successors: Vec<BlockId>,
}

/// Facts holding at the start and end of one block, rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockFacts {
    pub block: BlockId,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub kind: AnalysisKind,
    pub direction: Direction,
    pub iterations: usize,
    pub facts: Vec<BlockFacts>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub program: String,
    pub granularity: Granularity,
    pub generated_at: DateTime<Utc>,
    pub entry: BlockId,
    pub blocks: Vec<BlockSummary>,
    pub analyses: Vec<AnalysisResult>,
    /// Present only when information flow was requested.
    pub leaks: Option<Vec<Leak>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Files were written; holds the path of every report or the archive.
    Written(Vec<String>),
    /// No output directory; holds the text rendering for stdout.
    Rendered(String),
}

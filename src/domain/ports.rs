use crate::analysis::AnalysisKind;
use crate::cfg::builder::Granularity;
use crate::domain::ast::Program;
use crate::domain::model::{AnalysisReport, LoadOutcome, OutputFormat};
use crate::utils::error::Result;

pub trait Storage {
    /// Writes `data` under the storage root and returns the full path.
    fn write_file(&self, path: &str, data: &[u8]) -> Result<String>;
}

pub trait ConfigProvider {
    fn program_name(&self) -> Option<&str>;
    fn program_path(&self) -> Option<&str>;
    fn granularity(&self) -> Granularity;
    fn analyses(&self) -> Vec<AnalysisKind>;
    fn output_path(&self) -> Option<&str>;
    fn output_formats(&self) -> Vec<OutputFormat>;
    /// Archive file name when outputs should be zipped together.
    fn archive_name(&self) -> Option<&str>;
    fn max_iterations(&self) -> usize;
}

pub trait Pipeline {
    fn extract(&self) -> Result<Program>;
    fn transform(&self, program: Program) -> Result<AnalysisReport>;
    fn load(&self, report: AnalysisReport) -> Result<LoadOutcome>;
}

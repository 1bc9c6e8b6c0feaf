pub mod cli;
pub mod toml_config;

use crate::analysis::AnalysisKind;
use crate::cfg::builder::Granularity;
use crate::core::ConfigProvider;
use crate::domain::model::OutputFormat;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;

pub const DEFAULT_MAX_ITERATIONS: usize = 100_000;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "flowlab", version)]
#[command(about = "Control-flow graphs and dataflow analyses for a small while-language")]
pub struct CliConfig {
    /// Program to analyse (JSON)
    pub program: Option<String>,

    /// TOML run configuration; other flags override its values
    #[arg(short, long)]
    pub config: Option<String>,

    /// CFG granularity [default: atomic]
    #[arg(long, value_enum)]
    pub builder: Option<Granularity>,

    /// Analyses to run [default: all]
    #[arg(long, value_enum, value_delimiter = ',')]
    pub analyses: Vec<AnalysisKind>,

    /// Report formats written to --output-path [default: text]
    #[arg(long, value_enum, value_delimiter = ',')]
    pub formats: Vec<OutputFormat>,

    /// Directory for report files; without it the text report goes to stdout
    #[arg(long)]
    pub output_path: Option<String>,

    /// Bundle all report files into this zip archive
    #[arg(long)]
    pub archive: Option<String>,

    /// Give up when the solver needs more iterations than this
    #[arg(long)]
    pub max_iterations: Option<usize>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Whether anything was asked of the tool at all.
    pub fn has_input(&self) -> bool {
        self.program.is_some() || self.config.is_some()
    }
}

impl ConfigProvider for CliConfig {
    fn program_name(&self) -> Option<&str> {
        None
    }

    fn program_path(&self) -> Option<&str> {
        self.program.as_deref()
    }

    fn granularity(&self) -> Granularity {
        self.builder.unwrap_or(Granularity::Atomic)
    }

    fn analyses(&self) -> Vec<AnalysisKind> {
        if self.analyses.is_empty() {
            AnalysisKind::ALL.to_vec()
        } else {
            self.analyses.clone()
        }
    }

    fn output_path(&self) -> Option<&str> {
        self.output_path.as_deref()
    }

    fn output_formats(&self) -> Vec<OutputFormat> {
        if self.formats.is_empty() {
            vec![OutputFormat::Text]
        } else {
            self.formats.clone()
        }
    }

    fn archive_name(&self) -> Option<&str> {
        self.archive.as_deref()
    }

    fn max_iterations(&self) -> usize {
        self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(program) = &self.program {
            validation::validate_path("program", program)?;
        }
        if let Some(output_path) = &self.output_path {
            validation::validate_path("output_path", output_path)?;
        }
        if let Some(archive) = &self.archive {
            validation::validate_non_empty_string("archive", archive)?;
            if self.output_path.is_none() {
                return Err(crate::utils::error::FlowError::MissingConfigError {
                    field: "output_path".to_string(),
                });
            }
        }
        validation::validate_positive_number("max_iterations", self.max_iterations(), 1)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_means_no_input() {
        let config = CliConfig::try_parse_from(["flowlab"]).unwrap();
        assert!(!config.has_input());
        assert!(config.validate().is_ok());
        assert_eq!(config.granularity(), Granularity::Atomic);
        assert_eq!(config.analyses().len(), AnalysisKind::ALL.len());
        assert_eq!(config.output_formats(), vec![OutputFormat::Text]);
        assert_eq!(config.max_iterations(), DEFAULT_MAX_ITERATIONS);
    }

    #[test]
    fn test_parse_flags() {
        let config = CliConfig::try_parse_from([
            "flowlab",
            "demo.json",
            "--builder",
            "basic",
            "--analyses",
            "liveness,very-busy-expressions",
            "--formats",
            "json,csv",
            "--output-path",
            "out",
            "--max-iterations",
            "50",
        ])
        .unwrap();

        assert_eq!(config.program_path(), Some("demo.json"));
        assert_eq!(config.granularity(), Granularity::Basic);
        assert_eq!(
            config.analyses(),
            vec![AnalysisKind::Liveness, AnalysisKind::VeryBusyExpressions]
        );
        assert_eq!(config.output_formats(), vec![OutputFormat::Json, OutputFormat::Csv]);
        assert_eq!(config.max_iterations(), 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        assert!(CliConfig::try_parse_from(["flowlab", "p.json", "--builder", "huge"]).is_err());

        let config = CliConfig::try_parse_from(["flowlab", "p.json", "--max-iterations", "0"]).unwrap();
        assert!(config.validate().is_err());

        let config = CliConfig::try_parse_from(["flowlab", "p.json", "--archive", "r.zip"]).unwrap();
        assert!(config.validate().is_err());
    }
}

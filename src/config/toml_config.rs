use crate::analysis::AnalysisKind;
use crate::cfg::builder::Granularity;
use crate::config::{CliConfig, DEFAULT_MAX_ITERATIONS};
use crate::core::ConfigProvider;
use crate::domain::model::OutputFormat;
use crate::utils::error::{FlowError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub run: RunConfig,
    pub output: Option<OutputConfig>,
    pub monitoring: Option<MonitoringConfig>,
    /// `--archive` given on the command line without anywhere to write it.
    #[serde(skip)]
    pending_archive: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: Option<String>,
    pub program: String,
    pub builder: Option<String>,
    pub analyses: Option<Vec<String>>,
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub formats: Option<Vec<String>>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: Option<String>,
    /// `compact` (default) or `json`
    pub format: Option<String>,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["compact", "json"];

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"))
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${PROGRAM_DIR})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 命令列參數優先於檔案設定
    pub fn apply_overrides(&mut self, cli: &CliConfig) {
        if let Some(program) = &cli.program {
            self.run.program = program.clone();
        }
        if let Some(builder) = cli.builder {
            self.run.builder = Some(builder.name().to_string());
        }
        if !cli.analyses.is_empty() {
            self.run.analyses = Some(cli.analyses.iter().map(|a| a.name().to_string()).collect());
        }
        if let Some(max_iterations) = cli.max_iterations {
            self.run.max_iterations = Some(max_iterations);
        }

        if let Some(path) = &cli.output_path {
            let output = self.output.get_or_insert_with(|| OutputConfig {
                path: path.clone(),
                formats: None,
                compression: None,
            });
            output.path = path.clone();
        }
        if let Some(output) = self.output.as_mut() {
            if !cli.formats.is_empty() {
                output.formats = Some(cli.formats.iter().map(|f| f.to_string()).collect());
            }
            if let Some(archive) = &cli.archive {
                output.compression = Some(CompressionConfig {
                    enabled: true,
                    filename: Some(archive.clone()),
                });
            }
        } else if let Some(archive) = &cli.archive {
            // 沒有輸出目錄，留給 validate_config 回報
            self.pending_archive = Some(archive.clone());
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("run.program", &self.run.program)?;

        if let Some(name) = &self.run.name {
            validation::validate_non_empty_string("run.name", name)?;
        }

        if let Some(builder) = &self.run.builder {
            validation::validate_allowed_value("run.builder", builder, &Granularity::NAMES)?;
        }

        if let Some(analyses) = &self.run.analyses {
            if analyses.is_empty() {
                return Err(FlowError::invalid_value(
                    "run.analyses",
                    "[]",
                    "At least one analysis must be listed",
                ));
            }
            for analysis in analyses {
                if AnalysisKind::from_name(analysis).is_none() {
                    let names: Vec<&str> = AnalysisKind::ALL.iter().map(|a| a.name()).collect();
                    validation::validate_allowed_value("run.analyses", analysis, &names)?;
                }
            }
        }

        if let Some(max_iterations) = self.run.max_iterations {
            validation::validate_positive_number("run.max_iterations", max_iterations, 1)?;
        }

        if self.pending_archive.is_some() {
            return Err(FlowError::MissingConfigError {
                field: "output.path".to_string(),
            });
        }

        if let Some(output) = &self.output {
            validation::validate_path("output.path", &output.path)?;
            if output.formats.as_ref().is_some_and(|formats| formats.is_empty()) {
                return Err(FlowError::invalid_value(
                    "output.formats",
                    "[]",
                    "At least one output format must be listed",
                ));
            }
            for format in output.formats.iter().flatten() {
                validation::validate_allowed_value("output.formats", format, &OutputFormat::NAMES)?;
            }
            if let Some(CompressionConfig {
                enabled: true,
                filename: Some(filename),
            }) = &output.compression
            {
                validation::validate_non_empty_string("output.compression.filename", filename)?;
            }
        }

        if let Some(monitoring) = &self.monitoring {
            if let Some(level) = &monitoring.log_level {
                validation::validate_allowed_value("monitoring.log_level", level, &LOG_LEVELS)?;
            }
            if let Some(format) = &monitoring.format {
                validation::validate_allowed_value("monitoring.format", format, &LOG_FORMATS)?;
            }
        }

        Ok(())
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.format.as_deref())
            .map(|format| format == "json")
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn program_name(&self) -> Option<&str> {
        self.run.name.as_deref()
    }

    fn program_path(&self) -> Option<&str> {
        Some(&self.run.program)
    }

    fn granularity(&self) -> Granularity {
        self.run
            .builder
            .as_deref()
            .and_then(Granularity::from_name)
            .unwrap_or(Granularity::Atomic)
    }

    fn analyses(&self) -> Vec<AnalysisKind> {
        match &self.run.analyses {
            Some(names) => names.iter().filter_map(|name| AnalysisKind::from_name(name)).collect(),
            None => AnalysisKind::ALL.to_vec(),
        }
    }

    fn output_path(&self) -> Option<&str> {
        self.output.as_ref().map(|output| output.path.as_str())
    }

    fn output_formats(&self) -> Vec<OutputFormat> {
        match self.output.as_ref().and_then(|output| output.formats.as_ref()) {
            Some(names) => names.iter().filter_map(|name| OutputFormat::from_name(name)).collect(),
            None => vec![OutputFormat::Text],
        }
    }

    fn archive_name(&self) -> Option<&str> {
        let compression = self.output.as_ref()?.compression.as_ref()?;
        if !compression.enabled {
            return None;
        }
        Some(compression.filename.as_deref().unwrap_or("report.zip"))
    }

    fn max_iterations(&self) -> usize {
        self.run.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[run]
name = "demo"
program = "programs/demo.json"
builder = "basic"
analyses = ["liveness", "sign"]
max_iterations = 500

[output]
path = "./out"
formats = ["text", "json"]

[output.compression]
enabled = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.program_name(), Some("demo"));
        assert_eq!(config.granularity(), Granularity::Basic);
        assert_eq!(config.analyses(), vec![AnalysisKind::Liveness, AnalysisKind::Sign]);
        assert_eq!(config.output_formats(), vec![OutputFormat::Text, OutputFormat::Json]);
        assert_eq!(config.archive_name(), Some("report.zip"));
        assert_eq!(config.max_iterations(), 500);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("[run]\nprogram = \"p.json\"\n").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.granularity(), Granularity::Atomic);
        assert_eq!(config.analyses().len(), AnalysisKind::ALL.len());
        assert_eq!(config.output_path(), None);
        assert_eq!(config.archive_name(), None);
        assert!(!config.json_logs());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("FLOWLAB_TEST_PROGRAM_DIR", "/tmp/programs");

        let toml_content = r#"
[run]
program = "${FLOWLAB_TEST_PROGRAM_DIR}/demo.json"

[output]
path = "${FLOWLAB_TEST_UNSET_DIR}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.run.program, "/tmp/programs/demo.json");
        assert_eq!(config.output_path(), Some("${FLOWLAB_TEST_UNSET_DIR}"));

        std::env::remove_var("FLOWLAB_TEST_PROGRAM_DIR");
    }

    #[test]
    fn test_config_validation() {
        let bad_builder = TomlConfig::from_toml_str("[run]\nprogram = \"p.json\"\nbuilder = \"huge\"\n").unwrap();
        assert!(bad_builder.validate().is_err());

        let bad_analysis =
            TomlConfig::from_toml_str("[run]\nprogram = \"p.json\"\nanalyses = [\"constant\"]\n").unwrap();
        assert!(bad_analysis.validate().is_err());

        let bad_level = TomlConfig::from_toml_str(
            "[run]\nprogram = \"p.json\"\n[monitoring]\nlog_level = \"loud\"\n",
        )
        .unwrap();
        assert!(bad_level.validate().is_err());

        assert!(TomlConfig::from_toml_str("[run]\nbuilder = \"basic\"\n").is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = TomlConfig::from_toml_str("[run]\nprogram = \"p.json\"\nbuilder = \"basic\"\n").unwrap();
        let cli = CliConfig::try_parse_from([
            "flowlab",
            "--builder",
            "atomic",
            "--analyses",
            "reaching-definitions",
            "--output-path",
            "out",
            "--archive",
            "all.zip",
        ])
        .unwrap();

        config.apply_overrides(&cli);

        assert_eq!(config.run.program, "p.json");
        assert_eq!(config.granularity(), Granularity::Atomic);
        assert_eq!(config.analyses(), vec![AnalysisKind::ReachingDefinitions]);
        assert_eq!(config.output_path(), Some("out"));
        assert_eq!(config.archive_name(), Some("all.zip"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_output_formats_rejected() {
        let config = TomlConfig::from_toml_str(
            "[run]\nprogram = \"p.json\"\n[output]\npath = \"out\"\nformats = []\n",
        )
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(FlowError::InvalidConfigValueError { ref field, .. }) if field == "output.formats"
        ));
    }

    #[test]
    fn test_archive_override_requires_output_path() {
        let mut config = TomlConfig::from_toml_str("[run]\nprogram = \"p.json\"\n").unwrap();
        let cli = CliConfig::try_parse_from(["flowlab", "--archive", "r.zip"]).unwrap();

        config.apply_overrides(&cli);

        assert_eq!(config.archive_name(), None);
        assert!(matches!(
            config.validate(),
            Err(FlowError::MissingConfigError { ref field }) if field == "output.path"
        ));

        // with a directory on the command line the archive is kept
        let mut config = TomlConfig::from_toml_str("[run]\nprogram = \"p.json\"\n").unwrap();
        let cli =
            CliConfig::try_parse_from(["flowlab", "--archive", "r.zip", "--output-path", "out"]).unwrap();
        config.apply_overrides(&cli);
        assert_eq!(config.archive_name(), Some("r.zip"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[run]\nname = \"file-test\"\nprogram = \"p.json\"\n[monitoring]\nformat = \"json\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.program_name(), Some("file-test"));
        assert!(config.json_logs());
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Program error: {message}")]
    ProgramError { message: String },

    #[error("Fixpoint solver did not converge after {iterations} iterations")]
    SolverDiverged { iterations: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Configuration,
    Program,
    Analysis,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FlowError {
    pub fn program(message: impl Into<String>) -> Self {
        FlowError::ProgramError {
            message: message.into(),
        }
    }

    pub fn invalid_value(field: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        FlowError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            FlowError::IoError(_) => ErrorCategory::Io,
            FlowError::SerializationError(_) | FlowError::ProgramError { .. } => {
                ErrorCategory::Program
            }
            FlowError::TomlError(_)
            | FlowError::MissingConfigError { .. }
            | FlowError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            FlowError::SolverDiverged { .. } => ErrorCategory::Analysis,
            FlowError::CsvError(_) | FlowError::ZipError(_) => ErrorCategory::Output,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Analysis => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Program => ErrorSeverity::High,
            ErrorCategory::Io | ErrorCategory::Output => ErrorSeverity::Critical,
        }
    }

    /// 對應嚴重程度的行程結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            FlowError::IoError(_) => "Check that the file exists and the output directory is writable",
            FlowError::SerializationError(_) => {
                "Check the program file: statements and expressions need a \"kind\" tag"
            }
            FlowError::TomlError(_) => "Check the TOML syntax of the run configuration",
            FlowError::MissingConfigError { .. } => "Add the missing field to the configuration",
            FlowError::InvalidConfigValueError { .. } => {
                "Use one of the documented values for this field"
            }
            FlowError::ProgramError { .. } => "Fix the program and run the analysis again",
            FlowError::SolverDiverged { .. } => "Raise --max-iterations or simplify the program",
            FlowError::CsvError(_) | FlowError::ZipError(_) => {
                "Check free disk space and the output path"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            FlowError::IoError(e) => format!("Could not read or write a file: {}", e),
            FlowError::SerializationError(e) => format!("The program file is not valid: {}", e),
            FlowError::SolverDiverged { iterations } => format!(
                "The analysis gave up after {} iterations without reaching a fixpoint",
                iterations
            ),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;

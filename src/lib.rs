pub mod analysis;
pub mod cfg;
pub mod config;
pub mod core;
pub mod domain;
pub mod lattice;
pub mod solver;
pub mod utils;

pub use config::{cli::LocalStorage, toml_config::TomlConfig, CliConfig};
pub use core::{engine::AnalysisEngine, pipeline::AnalysisPipeline};
pub use utils::error::{FlowError, Result};

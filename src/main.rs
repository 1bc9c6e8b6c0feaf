use anyhow::Context;
use clap::Parser;
use flowlab::core::{ConfigProvider, LoadOutcome};
use flowlab::utils::{logger, validation::Validate};
use flowlab::{AnalysisEngine, AnalysisPipeline, CliConfig, FlowError, LocalStorage, TomlConfig};
use std::io::Write;

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    match cli.config.clone() {
        Some(config_path) => {
            let mut config = match TomlConfig::from_file(&config_path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load {}: {}", config_path, e.user_friendly_message());
                    std::process::exit(e.exit_code());
                }
            };

            // 依 [monitoring] 設定初始化日誌
            if config.json_logs() {
                logger::init_json_logger(cli.verbose, config.log_level());
            } else {
                logger::init_cli_logger(cli.verbose, config.log_level());
            }

            tracing::info!("Loaded run configuration from {}", config_path);
            config.apply_overrides(&cli);
            run(config)
        }
        None => {
            logger::init_cli_logger(cli.verbose, None);

            if !cli.has_input() {
                tracing::debug!("No program given, nothing to analyse");
                return Ok(());
            }

            if cli.verbose {
                tracing::debug!("CLI config: {:?}", cli);
            }
            run(cli)
        }
    }
}

fn run<C: ConfigProvider + Validate>(config: C) -> anyhow::Result<()> {
    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        fail(e);
    }

    let storage = LocalStorage::new(config.output_path().unwrap_or(".").to_string());
    let pipeline = AnalysisPipeline::new(storage, config);
    let engine = AnalysisEngine::new(pipeline);

    match engine.run() {
        Ok(LoadOutcome::Rendered(text)) => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .context("Failed to write report to stdout")?;
            stdout.flush().context("Failed to flush stdout")?;
        }
        Ok(LoadOutcome::Written(paths)) => {
            for path in paths {
                println!("📁 Report saved to: {}", path);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            fail(e);
        }
    }

    Ok(())
}

fn fail(e: FlowError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code())
}

use crate::core::report::{build_report, render, render_text};
use crate::core::{AnalysisReport, ConfigProvider, LoadOutcome, Pipeline, Storage};
use crate::domain::ast::Program;
use crate::domain::visit::block_variables;
use crate::utils::error::{FlowError, Result};
use crate::utils::validation;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub struct AnalysisPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> AnalysisPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn write_archive(&self, archive: &str, files: &[(String, String)]) -> Result<String> {
        tracing::debug!("Creating ZIP archive {} with {} files", archive, files.len());

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            for (name, content) in files {
                zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
                zip.write_all(content.as_bytes())?;
            }

            // 完成並取回底層 Vec<u8>
            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(archive, &zip_data)
    }
}

impl<S: Storage, C: ConfigProvider> Pipeline for AnalysisPipeline<S, C> {
    fn extract(&self) -> Result<Program> {
        let program_path = self.config.program_path();
        let path = validation::validate_required_field("run.program", &program_path)?;

        tracing::debug!("Reading program from: {}", path);
        let content = std::fs::read_to_string(path)?;
        let mut program = Program::from_json_str(&content)?;

        if let Some(name) = self.config.program_name() {
            program.name = name.to_string();
        }

        tracing::info!(
            "Loaded program '{}' with {} top-level statements over {} variables",
            program.name,
            program.body.statements().len(),
            block_variables(&program.body).len()
        );
        Ok(program)
    }

    fn transform(&self, program: Program) -> Result<AnalysisReport> {
        let analyses = self.config.analyses();
        if analyses.is_empty() {
            return Err(FlowError::invalid_value(
                "run.analyses",
                "[]",
                "At least one analysis must be requested",
            ));
        }

        build_report(
            &program,
            self.config.granularity(),
            &analyses,
            self.config.max_iterations(),
        )
    }

    fn load(&self, report: AnalysisReport) -> Result<LoadOutcome> {
        if self.config.output_path().is_none() {
            return Ok(LoadOutcome::Rendered(render_text(&report)));
        }

        let files = self
            .config
            .output_formats()
            .into_iter()
            .map(|format| Ok((format!("report.{}", format.extension()), render(&report, format)?)))
            .collect::<Result<Vec<_>>>()?;

        if let Some(archive) = self.config.archive_name() {
            let path = self.write_archive(archive, &files)?;
            return Ok(LoadOutcome::Written(vec![path]));
        }

        let mut written = Vec::with_capacity(files.len());
        for (name, content) in &files {
            written.push(self.storage.write_file(name, content.as_bytes())?);
        }
        Ok(LoadOutcome::Written(written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisKind;
    use crate::cfg::builder::Granularity;
    use crate::domain::model::OutputFormat;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemoryStorage {
        files: RefCell<Vec<(String, Vec<u8>)>>,
    }

    impl Storage for &MemoryStorage {
        fn write_file(&self, path: &str, data: &[u8]) -> Result<String> {
            self.files.borrow_mut().push((path.to_string(), data.to_vec()));
            Ok(format!("mem://{}", path))
        }
    }

    struct FixedConfig {
        program: Option<String>,
        output: Option<String>,
        formats: Vec<OutputFormat>,
        archive: Option<String>,
    }

    impl ConfigProvider for FixedConfig {
        fn program_name(&self) -> Option<&str> {
            None
        }

        fn program_path(&self) -> Option<&str> {
            self.program.as_deref()
        }

        fn granularity(&self) -> Granularity {
            Granularity::Atomic
        }

        fn analyses(&self) -> Vec<AnalysisKind> {
            vec![AnalysisKind::Liveness]
        }

        fn output_path(&self) -> Option<&str> {
            self.output.as_deref()
        }

        fn output_formats(&self) -> Vec<OutputFormat> {
            self.formats.clone()
        }

        fn archive_name(&self) -> Option<&str> {
            self.archive.as_deref()
        }

        fn max_iterations(&self) -> usize {
            1000
        }
    }

    fn program() -> Program {
        Program::new(
            "p",
            vec![crate::domain::ast::Stmt::output(crate::domain::ast::Expr::lit(1))],
        )
    }

    #[test]
    fn test_missing_program_path() {
        let storage = MemoryStorage::default();
        let config = FixedConfig {
            program: None,
            output: None,
            formats: vec![],
            archive: None,
        };
        let pipeline = AnalysisPipeline::new(&storage, config);
        assert!(matches!(
            pipeline.extract(),
            Err(FlowError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_load_without_output_path_renders_text() {
        let storage = MemoryStorage::default();
        let config = FixedConfig {
            program: None,
            output: None,
            formats: vec![OutputFormat::Json],
            archive: None,
        };
        let pipeline = AnalysisPipeline::new(&storage, config);

        let report = pipeline.transform(program()).unwrap();
        match pipeline.load(report).unwrap() {
            LoadOutcome::Rendered(text) => assert!(text.contains("== liveness")),
            other => panic!("expected rendered text, got {:?}", other),
        }
        assert!(storage.files.borrow().is_empty());
    }

    #[test]
    fn test_load_writes_each_format() {
        let storage = MemoryStorage::default();
        let config = FixedConfig {
            program: None,
            output: Some("out".into()),
            formats: vec![OutputFormat::Text, OutputFormat::Csv],
            archive: None,
        };
        let pipeline = AnalysisPipeline::new(&storage, config);

        let report = pipeline.transform(program()).unwrap();
        let outcome = pipeline.load(report).unwrap();

        assert_eq!(
            outcome,
            LoadOutcome::Written(vec!["mem://report.txt".into(), "mem://report.csv".into()])
        );
    }

    #[test]
    fn test_load_bundles_archive() {
        let storage = MemoryStorage::default();
        let config = FixedConfig {
            program: None,
            output: Some("out".into()),
            formats: vec![OutputFormat::Json, OutputFormat::Tsv],
            archive: Some("report.zip".into()),
        };
        let pipeline = AnalysisPipeline::new(&storage, config);

        let report = pipeline.transform(program()).unwrap();
        pipeline.load(report).unwrap();

        let files = storage.files.borrow();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "report.zip");

        let archive = zip::ZipArchive::new(std::io::Cursor::new(files[0].1.clone())).unwrap();
        let names: Vec<_> = archive.file_names().map(str::to_string).collect();
        assert!(names.contains(&"report.json".to_string()));
        assert!(names.contains(&"report.tsv".to_string()));
    }
}

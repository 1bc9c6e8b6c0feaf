use crate::core::{LoadOutcome, Pipeline};
use crate::utils::error::Result;
use std::time::Instant;

pub struct AnalysisEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> AnalysisEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn run(&self) -> Result<LoadOutcome> {
        let started = Instant::now();
        tracing::info!("Starting analysis run");

        // Extract
        let program = self.pipeline.extract()?;

        // Transform
        tracing::info!("Analysing program '{}'", program.name);
        let report = self.pipeline.transform(program)?;
        tracing::info!(
            "Built CFG with {} blocks and ran {} analyses",
            report.blocks.len(),
            report.analyses.len()
        );

        // Load
        let outcome = self.pipeline.load(report)?;
        if let LoadOutcome::Written(paths) = &outcome {
            for path in paths {
                tracing::info!("Report saved to: {}", path);
            }
        }

        tracing::info!("Analysis run finished in {:?}", started.elapsed());
        Ok(outcome)
    }
}

use crate::analysis::{
    analyze, find_leaks, AnalysisKind, AvailableExpressions, DataflowAnalysis, Fact,
    InformationFlowAnalysis, Liveness, ReachingDefinitions, SignAnalysis, Solution, VeryBusyExpressions,
};
use crate::cfg::builder::{build_cfg, Granularity};
use crate::cfg::graph::ControlFlowGraph;
use crate::domain::ast::Program;
use crate::domain::model::{AnalysisReport, AnalysisResult, BlockFacts, BlockSummary, OutputFormat};
use crate::utils::error::{FlowError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Write};

/// Text form of a dataflow fact, used by every report format.
pub trait RenderFact {
    fn render(&self) -> String;
}

impl<T: Display> RenderFact for BTreeSet<T> {
    fn render(&self) -> String {
        let items: Vec<String> = self.iter().map(|item| item.to_string()).collect();
        format!("{{{}}}", items.join(", "))
    }
}

impl<K: Display, V: Display> RenderFact for BTreeMap<K, V> {
    fn render(&self) -> String {
        let items: Vec<String> = self.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        format!("{{{}}}", items.join(", "))
    }
}

fn collect<A>(kind: AnalysisKind, analysis: &A, cfg: &ControlFlowGraph, max_iterations: usize) -> Result<AnalysisResult>
where
    A: DataflowAnalysis,
    Fact<A>: RenderFact,
{
    let solution = analyze(analysis, cfg, max_iterations)?;
    Ok(summarize(kind, analysis, cfg, &solution))
}

fn summarize<A>(kind: AnalysisKind, analysis: &A, cfg: &ControlFlowGraph, solution: &Solution<Fact<A>>) -> AnalysisResult
where
    A: DataflowAnalysis,
    Fact<A>: RenderFact,
{
    let facts = cfg
        .blocks()
        .into_iter()
        .map(|block| BlockFacts {
            block: block.id,
            before: solution.before(block.id).map(RenderFact::render).unwrap_or_default(),
            after: solution.after(block.id).map(RenderFact::render).unwrap_or_default(),
        })
        .collect();

    tracing::info!("{} finished after {} iterations", kind, solution.iterations);
    AnalysisResult {
        kind,
        direction: analysis.direction(),
        iterations: solution.iterations,
        facts,
    }
}

pub fn run_analysis(kind: AnalysisKind, cfg: &ControlFlowGraph, max_iterations: usize) -> Result<AnalysisResult> {
    match kind {
        AnalysisKind::Liveness => collect(kind, &Liveness::new(), cfg, max_iterations),
        AnalysisKind::AvailableExpressions => {
            collect(kind, &AvailableExpressions::new(cfg), cfg, max_iterations)
        }
        AnalysisKind::VeryBusyExpressions => {
            collect(kind, &VeryBusyExpressions::new(cfg), cfg, max_iterations)
        }
        AnalysisKind::ReachingDefinitions => collect(kind, &ReachingDefinitions::new(), cfg, max_iterations),
        AnalysisKind::Sign => collect(kind, &SignAnalysis::new(cfg), cfg, max_iterations),
        AnalysisKind::InformationFlow => {
            collect(kind, &InformationFlowAnalysis::new(cfg), cfg, max_iterations)
        }
    }
}

/// Builds the CFG of `program` and runs every requested analysis on it.
pub fn build_report(
    program: &Program,
    granularity: Granularity,
    analyses: &[AnalysisKind],
    max_iterations: usize,
) -> Result<AnalysisReport> {
    let cfg = build_cfg(&program.body, granularity);

    let blocks = cfg
        .blocks()
        .into_iter()
        .map(|block| BlockSummary {
            id: block.id,
            statements: block.statements.iter().map(|stmt| stmt.to_string()).collect(),
            jump: block.jump.to_string(),
            successors: block.jump.targets(),
        })
        .collect();

    let mut results = Vec::with_capacity(analyses.len());
    let mut leaks = None;
    for kind in analyses {
        if *kind == AnalysisKind::InformationFlow {
            // 同一個解同時用於報表與洩漏檢查
            let analysis = InformationFlowAnalysis::new(&cfg);
            let solution = analyze(&analysis, &cfg, max_iterations)?;
            leaks = Some(find_leaks(&analysis, &cfg, &solution));
            results.push(summarize(*kind, &analysis, &cfg, &solution));
        } else {
            results.push(run_analysis(*kind, &cfg, max_iterations)?);
        }
    }

    Ok(AnalysisReport {
        program: program.name.clone(),
        granularity,
        generated_at: chrono::Utc::now(),
        entry: cfg.entry(),
        blocks,
        analyses: results,
        leaks,
    })
}

pub fn render_text(report: &AnalysisReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "program: {} ({} CFG, {} blocks, entry {})\n",
        report.program,
        report.granularity,
        report.blocks.len(),
        report.entry
    );

    for block in &report.blocks {
        let _ = writeln!(out, "{}", block.id);
        for stmt in &block.statements {
            let _ = writeln!(out, "{};", stmt);
        }
        let _ = writeln!(out, "{}\n", block.jump);
    }

    for result in &report.analyses {
        let _ = writeln!(
            out,
            "== {} ({}, {} iterations) ==",
            result.kind, result.direction, result.iterations
        );
        for facts in &result.facts {
            let _ = writeln!(
                out,
                "block {}: before {} | after {}",
                facts.block, facts.before, facts.after
            );
        }
        out.push('\n');
    }

    if let Some(leaks) = &report.leaks {
        if leaks.is_empty() {
            out.push_str("information flow: no leaks\n");
        } else {
            let _ = writeln!(out, "information flow: {} leak(s)", leaks.len());
            for leak in leaks {
                let _ = writeln!(out, "  block {}: output({})", leak.block, leak.expr);
            }
        }
    }

    out
}

pub fn render_json(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// One row per analysis and block: `analysis, block, before, after`.
pub fn render_delimited(report: &AnalysisReport, delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(["analysis", "block", "before", "after"])?;
    for result in &report.analyses {
        for facts in &result.facts {
            let block = facts.block.to_string();
            writer.write_record([
                result.kind.name(),
                block.as_str(),
                facts.before.as_str(),
                facts.after.as_str(),
            ])?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FlowError::IoError(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn render(report: &AnalysisReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => render_json(report),
        OutputFormat::Csv => render_delimited(report, b','),
        OutputFormat::Tsv => render_delimited(report, b'\t'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ast::{Expr, Stmt};

    fn leaky_program() -> Program {
        Program::new(
            "leaky",
            vec![
                Stmt::assign("s", Expr::Input),
                Stmt::output(Expr::mul(Expr::var("s"), Expr::lit(2))),
            ],
        )
    }

    #[test]
    fn test_render_fact() {
        assert_eq!(BTreeSet::from([2, 1]).render(), "{1, 2}");
        assert_eq!(BTreeSet::<u8>::new().render(), "{}");
        assert_eq!(BTreeMap::from([("x", "+"), ("y", "0")]).render(), "{x: +, y: 0}");
    }

    #[test]
    fn test_report_contains_requested_analyses() {
        let report = build_report(
            &leaky_program(),
            Granularity::Basic,
            &[AnalysisKind::Liveness, AnalysisKind::InformationFlow],
            1000,
        )
        .unwrap();

        assert_eq!(report.program, "leaky");
        assert_eq!(report.blocks.len(), 1);
        assert_eq!(report.analyses.len(), 2);
        assert_eq!(report.analyses[0].kind, AnalysisKind::Liveness);
        assert_eq!(report.analyses[0].facts[0].before, "{}");
        assert_eq!(report.leaks.as_ref().map(Vec::len), Some(1));

        let text = render_text(&report);
        assert!(text.starts_with("program: leaky (basic CFG, 1 blocks, entry 0)"));
        assert!(text.contains("== liveness (backward, "));
        assert!(text.contains("information flow: 1 leak(s)"));
        assert!(text.contains("block 0: output((s * 2))"));
    }

    #[test]
    fn test_information_flow_facts_and_leaks_agree() {
        let report = build_report(&leaky_program(), Granularity::Basic, &[AnalysisKind::InformationFlow], 1000)
            .unwrap();

        assert_eq!(report.analyses.len(), 1);
        assert_eq!(report.analyses[0].facts[0].after, "{s: secret}");

        let leaks = report.leaks.unwrap();
        assert_eq!(leaks.len(), 1);
        assert_eq!(leaks[0].expr, Expr::mul(Expr::var("s"), Expr::lit(2)));
    }

    #[test]
    fn test_delimited_rows() {
        let report = build_report(&leaky_program(), Granularity::Atomic, &[AnalysisKind::Sign], 1000).unwrap();
        assert!(report.leaks.is_none());

        let csv = render(&report, OutputFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("analysis,block,before,after"));
        assert_eq!(lines.count(), report.blocks.len());

        let tsv = render(&report, OutputFormat::Tsv).unwrap();
        assert!(tsv.starts_with("analysis\tblock\tbefore\tafter"));
    }

    #[test]
    fn test_json_report() {
        let report = build_report(&leaky_program(), Granularity::Basic, &[AnalysisKind::Sign], 1000).unwrap();
        let json: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();

        assert_eq!(json["program"], "leaky");
        assert_eq!(json["granularity"], "basic");
        assert_eq!(json["analyses"][0]["kind"], "sign");
        assert_eq!(json["analyses"][0]["direction"], "forward");
        assert_eq!(json["analyses"][0]["facts"][0]["after"], "{s: ⊤}");
        assert!(json["leaks"].is_null());
    }
}

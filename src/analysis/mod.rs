//! Dataflow analyses over a [`ControlFlowGraph`].
//!
//! An analysis supplies a lattice, a direction and transfer functions for
//! atomic statements and branch guards. [`analyze`] turns the CFG into one
//! equation per block and hands it to the [`FixpointSolver`].

pub mod available;
pub mod information_flow;
pub mod liveness;
pub mod reaching;
pub mod sign;
pub mod very_busy;

pub use available::AvailableExpressions;
pub use information_flow::{check_information_flow, find_leaks, is_secure, InformationFlowAnalysis, Leak};
pub use liveness::Liveness;
pub use reaching::{Definition, ReachingDefinitions};
pub use sign::SignAnalysis;
pub use very_busy::VeryBusyExpressions;

use crate::cfg::graph::{BasicBlock, BlockId, ControlFlowGraph};
use crate::domain::ast::{AtomicStmt, Expr};
use crate::lattice::Lattice;
use crate::solver::FixpointSolver;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Backward => f.write_str("backward"),
        }
    }
}

/// Position of an atomic statement inside the CFG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementSite {
    pub block: BlockId,
    pub index: usize,
}

pub type Fact<A> = <<A as DataflowAnalysis>::Lattice as Lattice>::Elem;

pub trait DataflowAnalysis {
    type Lattice: Lattice;

    fn lattice(&self) -> &Self::Lattice;

    fn direction(&self) -> Direction;

    /// Fact assumed at the entry block (forward) or at `halt` blocks (backward).
    fn boundary(&self) -> <Self::Lattice as Lattice>::Elem {
        self.lattice().bottom()
    }

    fn transfer_statement(
        &self,
        site: StatementSite,
        stmt: &AtomicStmt,
        input: <Self::Lattice as Lattice>::Elem,
    ) -> <Self::Lattice as Lattice>::Elem;

    fn transfer_guard(
        &self,
        guard: &Expr,
        input: <Self::Lattice as Lattice>::Elem,
    ) -> <Self::Lattice as Lattice>::Elem;
}

/// Applies a whole block in the analysis direction.
pub fn transfer_block<A: DataflowAnalysis>(analysis: &A, block: &BasicBlock, input: Fact<A>) -> Fact<A> {
    let site = |index| StatementSite {
        block: block.id,
        index,
    };

    match analysis.direction() {
        Direction::Forward => {
            let after_statements = block
                .statements
                .iter()
                .enumerate()
                .fold(input, |fact, (i, stmt)| analysis.transfer_statement(site(i), stmt, fact));
            match block.jump.guard() {
                Some(guard) => analysis.transfer_guard(guard, after_statements),
                None => after_statements,
            }
        }
        Direction::Backward => {
            let after_guard = match block.jump.guard() {
                Some(guard) => analysis.transfer_guard(guard, input),
                None => input,
            };
            block
                .statements
                .iter()
                .enumerate()
                .rev()
                .fold(after_guard, |fact, (i, stmt)| analysis.transfer_statement(site(i), stmt, fact))
        }
    }
}

/// Facts at both ends of every block.
#[derive(Debug, Clone)]
pub struct Solution<T> {
    pub before: BTreeMap<BlockId, T>,
    pub after: BTreeMap<BlockId, T>,
    pub iterations: usize,
}

impl<T> Solution<T> {
    pub fn before(&self, block: BlockId) -> Option<&T> {
        self.before.get(&block)
    }

    pub fn after(&self, block: BlockId) -> Option<&T> {
        self.after.get(&block)
    }
}

/// Runs `analysis` over `cfg` to its least fixpoint.
///
/// Forward analyses solve for the fact after each block, backward ones for
/// the fact before it; the other side is recovered by joining neighbours.
pub fn analyze<A: DataflowAnalysis>(
    analysis: &A,
    cfg: &ControlFlowGraph,
    max_iterations: usize,
) -> Result<Solution<Fact<A>>> {
    let lattice = analysis.lattice();
    let direction = analysis.direction();

    let mut solver = FixpointSolver::new();
    let ids: Vec<BlockId> = cfg.block_ids().collect();
    let vars: BTreeMap<BlockId, _> = ids.iter().map(|id| (*id, solver.fresh_variable())).collect();

    for block in cfg.blocks() {
        for target in block.jump.targets() {
            let (Some(&from), Some(&to)) = (vars.get(&block.id), vars.get(&target)) else {
                continue;
            };
            match direction {
                Direction::Forward => solver.add_dependency(from, to),
                Direction::Backward => solver.add_dependency(to, from),
            }
        }
    }

    let boundary_blocks: HashSet<BlockId> = match direction {
        Direction::Forward => HashSet::from([cfg.entry()]),
        Direction::Backward => cfg.exit_blocks().into_iter().collect(),
    };
    let boundary = analysis.boundary();

    // 依變數編號反查區塊
    let blocks: Vec<&BasicBlock> = ids.iter().filter_map(|id| cfg.block(*id)).collect();

    let fixpoint = solver.solve(lattice, max_iterations, |var, input| {
        let block = blocks[var.index()];
        let input = if boundary_blocks.contains(&block.id) {
            lattice.join(&boundary, &input)
        } else {
            input
        };
        transfer_block(analysis, block, input)
    })?;

    let iterations = fixpoint.iterations;
    let solved: BTreeMap<BlockId, Fact<A>> = ids.iter().copied().zip(fixpoint.into_values()).collect();

    // the side the solver did not compute: join of the neighbours' solved facts
    let neighbours: BTreeMap<BlockId, BTreeSet<BlockId>> = match direction {
        Direction::Forward => cfg.predecessors(),
        Direction::Backward => ids
            .iter()
            .map(|id| (*id, cfg.successors(*id).into_iter().collect()))
            .collect(),
    };
    let derived: BTreeMap<BlockId, Fact<A>> = ids
        .iter()
        .map(|id| {
            let incoming = neighbours
                .get(id)
                .into_iter()
                .flatten()
                .filter_map(|n| solved.get(n).cloned());
            let mut fact = lattice.join_all(incoming);
            if boundary_blocks.contains(id) {
                fact = lattice.join(&boundary, &fact);
            }
            (*id, fact)
        })
        .collect();

    tracing::debug!(
        "{} analysis over {} blocks converged in {} iterations",
        direction,
        ids.len(),
        iterations
    );

    Ok(match direction {
        Direction::Forward => Solution {
            before: derived,
            after: solved,
            iterations,
        },
        Direction::Backward => Solution {
            before: solved,
            after: derived,
            iterations,
        },
    })
}

/// Every complex expression computed by a statement or guard of `cfg`.
pub(crate) fn program_expressions(cfg: &ControlFlowGraph) -> BTreeSet<Expr> {
    let mut exprs: BTreeSet<Expr> = cfg
        .statements()
        .flat_map(crate::domain::visit::atomic_complex_expressions)
        .collect();
    exprs.extend(cfg.guards().flat_map(crate::domain::visit::complex_expressions));
    exprs
}

/// Every variable mentioned by a statement or guard of `cfg`.
pub(crate) fn program_variables(cfg: &ControlFlowGraph) -> BTreeSet<String> {
    let mut vars: BTreeSet<String> = cfg
        .statements()
        .flat_map(crate::domain::visit::atomic_statement_variables)
        .collect();
    vars.extend(cfg.guards().flat_map(crate::domain::visit::expression_variables));
    vars
}

/// The analyses a run can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Liveness,
    AvailableExpressions,
    VeryBusyExpressions,
    ReachingDefinitions,
    Sign,
    InformationFlow,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 6] = [
        AnalysisKind::Liveness,
        AnalysisKind::AvailableExpressions,
        AnalysisKind::VeryBusyExpressions,
        AnalysisKind::ReachingDefinitions,
        AnalysisKind::Sign,
        AnalysisKind::InformationFlow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisKind::Liveness => "liveness",
            AnalysisKind::AvailableExpressions => "available_expressions",
            AnalysisKind::VeryBusyExpressions => "very_busy_expressions",
            AnalysisKind::ReachingDefinitions => "reaching_definitions",
            AnalysisKind::Sign => "sign",
            AnalysisKind::InformationFlow => "information_flow",
        }
    }

    /// Accepts both `snake_case` and the `kebab-case` spelling of the CLI.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.replace('-', "_");
        Self::ALL.into_iter().find(|kind| kind.name() == normalized)
    }

    pub fn direction(&self) -> Direction {
        match self {
            AnalysisKind::Liveness | AnalysisKind::VeryBusyExpressions => Direction::Backward,
            _ => Direction::Forward,
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_kind_names() {
        assert_eq!(AnalysisKind::from_name("very-busy-expressions"), Some(AnalysisKind::VeryBusyExpressions));
        assert_eq!(AnalysisKind::from_name("sign"), Some(AnalysisKind::Sign));
        assert_eq!(AnalysisKind::from_name("constant_propagation"), None);
        assert_eq!(AnalysisKind::Liveness.direction(), Direction::Backward);
        assert_eq!(AnalysisKind::ReachingDefinitions.direction(), Direction::Forward);
    }
}

use crate::analysis::{analyze, program_variables, DataflowAnalysis, Direction, Solution, StatementSite};
use crate::cfg::graph::{BlockId, ControlFlowGraph};
use crate::domain::ast::{AtomicStmt, Expr};
use crate::domain::visit::ExprFold;
use crate::lattice::{Lattice, SecurityLattice, SecurityLevel, StoreLattice};
use crate::utils::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;

pub type SecurityStore = BTreeMap<String, SecurityLevel>;

/// Forward analysis labelling each variable public or secret. Values read
/// with `input` are secret; literals are public.
///
/// Only direct flows are tracked: branching on a secret does not taint the
/// variables assigned under the branch.
#[derive(Debug, Clone)]
pub struct InformationFlowAnalysis {
    lattice: StoreLattice<SecurityLattice>,
}

impl InformationFlowAnalysis {
    pub fn new(cfg: &ControlFlowGraph) -> Self {
        Self {
            lattice: StoreLattice::new(SecurityLattice, program_variables(cfg)),
        }
    }

    pub fn eval(&self, store: &SecurityStore, expr: &Expr) -> SecurityLevel {
        LevelEval {
            store,
            lattice: &self.lattice,
        }
        .fold(expr)
    }
}

struct LevelEval<'a> {
    store: &'a SecurityStore,
    lattice: &'a StoreLattice<SecurityLattice>,
}

impl ExprFold for LevelEval<'_> {
    type Output = SecurityLevel;

    fn literal(&self, _value: i64) -> SecurityLevel {
        SecurityLevel::Public
    }

    fn var(&self, name: &str) -> SecurityLevel {
        self.lattice.lookup(self.store, name)
    }

    fn input(&self) -> SecurityLevel {
        SecurityLevel::Secret
    }

    fn add(&self, lhs: SecurityLevel, rhs: SecurityLevel) -> SecurityLevel {
        self.lattice.inner().join(&lhs, &rhs)
    }

    fn multiply(&self, lhs: SecurityLevel, rhs: SecurityLevel) -> SecurityLevel {
        self.lattice.inner().join(&lhs, &rhs)
    }
}

impl DataflowAnalysis for InformationFlowAnalysis {
    type Lattice = StoreLattice<SecurityLattice>;

    fn lattice(&self) -> &Self::Lattice {
        &self.lattice
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn transfer_statement(
        &self,
        _site: StatementSite,
        stmt: &AtomicStmt,
        mut store: SecurityStore,
    ) -> SecurityStore {
        if let AtomicStmt::Assign { var, rhs } = stmt {
            let level = self.eval(&store, rhs);
            store.insert(var.clone(), level);
        }
        store
    }

    fn transfer_guard(&self, _guard: &Expr, store: SecurityStore) -> SecurityStore {
        store
    }
}

/// An `output` statement that may publish secret data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leak {
    pub block: BlockId,
    pub index: usize,
    pub expr: Expr,
}

/// Finds every `output(e)` where `e` may depend on `input`.
pub fn check_information_flow(cfg: &ControlFlowGraph, max_iterations: usize) -> Result<Vec<Leak>> {
    let analysis = InformationFlowAnalysis::new(cfg);
    let solution = analyze(&analysis, cfg, max_iterations)?;
    Ok(find_leaks(&analysis, cfg, &solution))
}

/// Leaks under an already solved information-flow analysis.
///
/// Each block is replayed from the store holding at its start, so the
/// level is taken exactly at the output statement.
pub fn find_leaks(
    analysis: &InformationFlowAnalysis,
    cfg: &ControlFlowGraph,
    solution: &Solution<SecurityStore>,
) -> Vec<Leak> {
    let mut leaks = Vec::new();
    for id in cfg.block_ids() {
        let (Some(block), Some(start)) = (cfg.block(id), solution.before(id)) else {
            continue;
        };

        let mut store = start.clone();
        for (index, stmt) in block.statements.iter().enumerate() {
            if let AtomicStmt::Output { expr } = stmt {
                if analysis.eval(&store, expr) == SecurityLevel::Secret {
                    tracing::warn!("secret data may reach output in block {}: {}", id, stmt);
                    leaks.push(Leak {
                        block: id,
                        index,
                        expr: expr.clone(),
                    });
                }
            }
            store = analysis.transfer_statement(StatementSite { block: id, index }, stmt, store);
        }
    }

    leaks
}

pub fn is_secure(cfg: &ControlFlowGraph, max_iterations: usize) -> Result<bool> {
    Ok(check_information_flow(cfg, max_iterations)?.is_empty())
}

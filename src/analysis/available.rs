use crate::analysis::{program_expressions, DataflowAnalysis, Direction, StatementSite};
use crate::cfg::graph::ControlFlowGraph;
use crate::domain::ast::{AtomicStmt, Expr};
use crate::domain::visit::{complex_expressions, expression_variables};
use crate::lattice::ReversePowersetLattice;
use std::collections::BTreeSet;

/// Forward must-analysis: complex expressions that have definitely been
/// computed, and not invalidated since, on every path to a point.
#[derive(Debug, Clone)]
pub struct AvailableExpressions {
    lattice: ReversePowersetLattice<Expr>,
}

impl AvailableExpressions {
    pub fn new(cfg: &ControlFlowGraph) -> Self {
        Self {
            lattice: ReversePowersetLattice::new(program_expressions(cfg)),
        }
    }
}

/// Drops every expression that reads `var`.
pub(crate) fn kill_mentions(exprs: &mut BTreeSet<Expr>, var: &str) {
    exprs.retain(|expr| !expression_variables(expr).contains(var));
}

impl DataflowAnalysis for AvailableExpressions {
    type Lattice = ReversePowersetLattice<Expr>;

    fn lattice(&self) -> &Self::Lattice {
        &self.lattice
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    /// Nothing has been computed before the program starts.
    fn boundary(&self) -> BTreeSet<Expr> {
        BTreeSet::new()
    }

    fn transfer_statement(
        &self,
        _site: StatementSite,
        stmt: &AtomicStmt,
        mut available: BTreeSet<Expr>,
    ) -> BTreeSet<Expr> {
        match stmt {
            AtomicStmt::Assign { var, rhs } => {
                available.extend(complex_expressions(rhs));
                // 被重新賦值的變數讓相關運算式失效
                kill_mentions(&mut available, var);
            }
            AtomicStmt::Output { expr } => available.extend(complex_expressions(expr)),
        }
        available
    }

    fn transfer_guard(&self, guard: &Expr, mut available: BTreeSet<Expr>) -> BTreeSet<Expr> {
        available.extend(complex_expressions(guard));
        available
    }
}

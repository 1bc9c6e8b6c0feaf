use crate::analysis::{DataflowAnalysis, Direction, StatementSite};
use crate::domain::ast::{AtomicStmt, Expr};
use crate::domain::visit::expression_variables;
use crate::lattice::PowersetLattice;
use std::collections::BTreeSet;

/// Backward may-analysis: variables whose current value may still be read.
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    lattice: PowersetLattice<String>,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataflowAnalysis for Liveness {
    type Lattice = PowersetLattice<String>;

    fn lattice(&self) -> &Self::Lattice {
        &self.lattice
    }

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn transfer_statement(
        &self,
        _site: StatementSite,
        stmt: &AtomicStmt,
        mut live: BTreeSet<String>,
    ) -> BTreeSet<String> {
        match stmt {
            AtomicStmt::Assign { var, rhs } => {
                live.remove(var);
                live.extend(expression_variables(rhs));
            }
            AtomicStmt::Output { expr } => live.extend(expression_variables(expr)),
        }
        live
    }

    fn transfer_guard(&self, guard: &Expr, mut live: BTreeSet<String>) -> BTreeSet<String> {
        live.extend(expression_variables(guard));
        live
    }
}

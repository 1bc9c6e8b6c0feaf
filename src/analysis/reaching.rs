use crate::analysis::{DataflowAnalysis, Direction, StatementSite};
use crate::cfg::graph::BlockId;
use crate::domain::ast::{AtomicStmt, Expr};
use crate::lattice::PowersetLattice;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// One assignment of the program, identified by where it sits in the CFG.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Definition {
    pub block: BlockId,
    pub index: usize,
    pub var: String,
    pub rhs: Expr,
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def({}.{}, {}, {})", self.block, self.index, self.var, self.rhs)
    }
}

/// Forward may-analysis: assignments whose value may still be held when
/// control reaches a point.
#[derive(Debug, Clone, Default)]
pub struct ReachingDefinitions {
    lattice: PowersetLattice<Definition>,
}

impl ReachingDefinitions {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataflowAnalysis for ReachingDefinitions {
    type Lattice = PowersetLattice<Definition>;

    fn lattice(&self) -> &Self::Lattice {
        &self.lattice
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn transfer_statement(
        &self,
        site: StatementSite,
        stmt: &AtomicStmt,
        mut reaching: BTreeSet<Definition>,
    ) -> BTreeSet<Definition> {
        if let AtomicStmt::Assign { var, rhs } = stmt {
            reaching.retain(|def| def.var != *var);
            reaching.insert(Definition {
                block: site.block,
                index: site.index,
                var: var.clone(),
                rhs: rhs.clone(),
            });
        }
        reaching
    }

    fn transfer_guard(&self, _guard: &Expr, reaching: BTreeSet<Definition>) -> BTreeSet<Definition> {
        reaching
    }
}

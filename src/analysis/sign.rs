use crate::analysis::{program_variables, DataflowAnalysis, Direction, StatementSite};
use crate::cfg::graph::ControlFlowGraph;
use crate::domain::ast::{AtomicStmt, Expr};
use crate::domain::visit::ExprFold;
use crate::lattice::{Sign, SignLattice, StoreLattice};
use std::collections::BTreeMap;

pub type SignStore = BTreeMap<String, Sign>;

/// Forward analysis tracking the sign of every variable.
#[derive(Debug, Clone)]
pub struct SignAnalysis {
    lattice: StoreLattice<SignLattice>,
}

impl SignAnalysis {
    pub fn new(cfg: &ControlFlowGraph) -> Self {
        Self {
            lattice: StoreLattice::new(SignLattice, program_variables(cfg)),
        }
    }

    /// Abstract value of `expr` under `store`.
    pub fn eval(&self, store: &SignStore, expr: &Expr) -> Sign {
        SignEval {
            store,
            lattice: &self.lattice,
        }
        .fold(expr)
    }
}

struct SignEval<'a> {
    store: &'a SignStore,
    lattice: &'a StoreLattice<SignLattice>,
}

impl ExprFold for SignEval<'_> {
    type Output = Sign;

    fn literal(&self, value: i64) -> Sign {
        Sign::of(value)
    }

    fn var(&self, name: &str) -> Sign {
        self.lattice.lookup(self.store, name)
    }

    fn input(&self) -> Sign {
        Sign::Unknown
    }

    fn add(&self, lhs: Sign, rhs: Sign) -> Sign {
        lhs.add(rhs)
    }

    fn multiply(&self, lhs: Sign, rhs: Sign) -> Sign {
        lhs.multiply(rhs)
    }
}

impl DataflowAnalysis for SignAnalysis {
    type Lattice = StoreLattice<SignLattice>;

    fn lattice(&self) -> &Self::Lattice {
        &self.lattice
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn transfer_statement(&self, _site: StatementSite, stmt: &AtomicStmt, mut store: SignStore) -> SignStore {
        if let AtomicStmt::Assign { var, rhs } = stmt {
            let sign = self.eval(&store, rhs);
            store.insert(var.clone(), sign);
        }
        store
    }

    // guards are not used to refine the store
    fn transfer_guard(&self, _guard: &Expr, store: SignStore) -> SignStore {
        store
    }
}

//! Worklist solver for systems of monotone lattice equations.

use crate::lattice::Lattice;
use crate::utils::error::{FlowError, Result};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

/// Handle to one unknown of the equation system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataflowVar(usize);

impl DataflowVar {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for DataflowVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var({})", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Fixpoint<T> {
    values: Vec<T>,
    pub iterations: usize,
}

impl<T> Fixpoint<T> {
    pub fn value(&self, var: DataflowVar) -> &T {
        &self.values[var.0]
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

#[derive(Debug, Clone, Default)]
pub struct FixpointSolver {
    // variables that read each variable
    children: Vec<BTreeSet<usize>>,
    // variables each variable reads
    parents: Vec<BTreeSet<usize>>,
}

impl FixpointSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_variable(&mut self) -> DataflowVar {
        let var = DataflowVar(self.children.len());
        self.children.push(BTreeSet::new());
        self.parents.push(BTreeSet::new());
        var
    }

    pub fn variable_count(&self) -> usize {
        self.children.len()
    }

    /// Records that `to` reads the value of `from`.
    ///
    /// Both variables must come from [`FixpointSolver::fresh_variable`] on
    /// this solver; any other index panics.
    pub fn add_dependency(&mut self, from: DataflowVar, to: DataflowVar) {
        self.children[from.0].insert(to.0);
        self.parents[to.0].insert(from.0);
    }

    pub fn parents(&self, var: DataflowVar) -> impl Iterator<Item = DataflowVar> + '_ {
        self.parents[var.0].iter().map(|&p| DataflowVar(p))
    }

    /// Least fixpoint of `x = transfer(x, ⊔ parents(x))` for every variable.
    ///
    /// `transfer` must be monotone. Each evaluation counts as one iteration;
    /// more than `max_iterations` of them is reported as divergence.
    pub fn solve<L, F>(&self, lattice: &L, max_iterations: usize, mut transfer: F) -> Result<Fixpoint<L::Elem>>
    where
        L: Lattice,
        F: FnMut(DataflowVar, L::Elem) -> L::Elem,
    {
        let count = self.variable_count();
        let mut values = vec![lattice.bottom(); count];
        let mut worklist: VecDeque<usize> = (0..count).collect();
        let mut queued = vec![true; count];
        let mut iterations = 0;

        while let Some(var) = worklist.pop_front() {
            queued[var] = false;

            iterations += 1;
            if iterations > max_iterations {
                tracing::warn!("solver stopped after {} iterations", max_iterations);
                return Err(FlowError::SolverDiverged {
                    iterations: max_iterations,
                });
            }

            let input = lattice.join_all(self.parents(DataflowVar(var)).map(|p| values[p.index()].clone()));
            let output = transfer(DataflowVar(var), input);

            if output != values[var] {
                values[var] = output;
                for &child in &self.children[var] {
                    if !queued[child] {
                        queued[child] = true;
                        worklist.push_back(child);
                    }
                }
            }
        }

        tracing::debug!("solved {} variables in {} iterations", count, iterations);
        Ok(Fixpoint { values, iterations })
    }
}

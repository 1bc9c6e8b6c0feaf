use crate::lattice::Lattice;
use std::collections::{BTreeMap, BTreeSet};

/// Maps from a fixed set of variables to elements of `L`, joined pointwise.
///
/// A variable missing from an element reads as `L`'s bottom, so every
/// joined store is total over the variable set.
#[derive(Debug, Clone)]
pub struct StoreLattice<L> {
    inner: L,
    variables: BTreeSet<String>,
}

impl<L: Lattice> StoreLattice<L> {
    pub fn new(inner: L, variables: BTreeSet<String>) -> Self {
        Self { inner, variables }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn variables(&self) -> &BTreeSet<String> {
        &self.variables
    }

    /// Value of `var` in `store`, bottom when absent.
    pub fn lookup(&self, store: &BTreeMap<String, L::Elem>, var: &str) -> L::Elem {
        store.get(var).cloned().unwrap_or_else(|| self.inner.bottom())
    }
}

impl<L: Lattice> Lattice for StoreLattice<L> {
    type Elem = BTreeMap<String, L::Elem>;

    fn join_all<I>(&self, elements: I) -> Self::Elem
    where
        I: IntoIterator<Item = Self::Elem>,
    {
        let bottom = self.inner.bottom();
        let mut result: Self::Elem = self
            .variables
            .iter()
            .map(|var| (var.clone(), bottom.clone()))
            .collect();

        for element in elements {
            for (var, slot) in result.iter_mut() {
                if let Some(value) = element.get(var) {
                    *slot = self.inner.join(slot, value);
                }
            }
        }

        result
    }
}

use crate::lattice::Lattice;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::marker::PhantomData;

/// Sets ordered by inclusion; bottom is the empty set.
#[derive(Debug, Clone)]
pub struct PowersetLattice<T> {
    _marker: PhantomData<T>,
}

impl<T> PowersetLattice<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

// 手寫 Default，避免 derive 對 T 加上 Default 限制
impl<T> Default for PowersetLattice<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone + Debug> Lattice for PowersetLattice<T> {
    type Elem = BTreeSet<T>;

    fn join_all<I>(&self, elements: I) -> Self::Elem
    where
        I: IntoIterator<Item = Self::Elem>,
    {
        elements.into_iter().flatten().collect()
    }
}

/// Subsets of a fixed universe ordered by reverse inclusion; bottom is the
/// universe and join is intersection. The domain of must-analyses.
#[derive(Debug, Clone)]
pub struct ReversePowersetLattice<T> {
    universe: BTreeSet<T>,
}

impl<T: Ord> ReversePowersetLattice<T> {
    pub fn new(universe: BTreeSet<T>) -> Self {
        Self { universe }
    }

    pub fn universe(&self) -> &BTreeSet<T> {
        &self.universe
    }
}

impl<T: Ord + Clone + Debug> Lattice for ReversePowersetLattice<T> {
    type Elem = BTreeSet<T>;

    fn join_all<I>(&self, elements: I) -> Self::Elem
    where
        I: IntoIterator<Item = Self::Elem>,
    {
        elements.into_iter().fold(self.universe.clone(), |acc, element| {
            acc.intersection(&element).cloned().collect()
        })
    }
}

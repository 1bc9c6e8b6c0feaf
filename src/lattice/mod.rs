//! Complete upper semi-lattices used as dataflow domains.
//!
//! Every set of elements has a least upper bound, so bottom is simply the
//! join of the empty set.

pub mod powerset;
pub mod security;
pub mod sign;
pub mod store;

pub use powerset::{PowersetLattice, ReversePowersetLattice};
pub use security::{SecurityLattice, SecurityLevel};
pub use sign::{Sign, SignLattice};
pub use store::StoreLattice;

use std::fmt::Debug;

pub trait Lattice {
    type Elem: Clone + PartialEq + Debug;

    /// Least upper bound of `elements`.
    fn join_all<I>(&self, elements: I) -> Self::Elem
    where
        I: IntoIterator<Item = Self::Elem>;

    fn join(&self, a: &Self::Elem, b: &Self::Elem) -> Self::Elem {
        self.join_all([a.clone(), b.clone()])
    }

    fn bottom(&self) -> Self::Elem {
        self.join_all(std::iter::empty())
    }

    /// Lattice order: `a ⊑ b` iff `a ⊔ b = b`.
    fn leq(&self, a: &Self::Elem, b: &Self::Elem) -> bool {
        self.join(a, b) == *b
    }
}

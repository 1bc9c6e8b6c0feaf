use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    Public,
    Secret,
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityLevel::Public => f.write_str("public"),
            SecurityLevel::Secret => f.write_str("secret"),
        }
    }
}

/// Two-point lattice `Public ⊑ Secret`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityLattice;

impl Lattice for SecurityLattice {
    type Elem = SecurityLevel;

    fn join_all<I>(&self, elements: I) -> SecurityLevel
    where
        I: IntoIterator<Item = SecurityLevel>,
    {
        elements
            .into_iter()
            .max()
            .unwrap_or(SecurityLevel::Public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_join() {
        let lattice = SecurityLattice;
        assert_eq!(lattice.bottom(), SecurityLevel::Public);
        assert_eq!(
            lattice.join(&SecurityLevel::Public, &SecurityLevel::Secret),
            SecurityLevel::Secret
        );
        assert_eq!(
            lattice.join_all([SecurityLevel::Public, SecurityLevel::Public]),
            SecurityLevel::Public
        );
    }
}

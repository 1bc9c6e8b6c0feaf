use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Abstract sign of an integer. `NoSign` is bottom (no value seen yet) and
/// `Unknown` is top (any value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    NoSign,
    Unknown,
    Pos,
    Neg,
    Zero,
}

impl Sign {
    pub fn of(value: i64) -> Self {
        match value {
            0 => Sign::Zero,
            v if v > 0 => Sign::Pos,
            _ => Sign::Neg,
        }
    }

    /// Abstract addition.
    pub fn add(self, rhs: Sign) -> Sign {
        use Sign::*;
        match (self, rhs) {
            (NoSign, other) | (other, NoSign) => other,
            (Zero, Zero) => Zero,
            (Pos | Zero, Pos | Zero) => Pos,
            (Neg | Zero, Neg | Zero) => Neg,
            _ => Unknown,
        }
    }

    /// Abstract multiplication.
    pub fn multiply(self, rhs: Sign) -> Sign {
        use Sign::*;
        match (self, rhs) {
            (NoSign, other) | (other, NoSign) => other,
            (Zero, _) | (_, Zero) => Zero,
            (Pos, Pos) | (Neg, Neg) => Pos,
            (Pos, Neg) | (Neg, Pos) => Neg,
            _ => Unknown,
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Sign::NoSign => "⊥",
            Sign::Unknown => "⊤",
            Sign::Pos => "+",
            Sign::Neg => "-",
            Sign::Zero => "0",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignLattice;

impl SignLattice {
    fn join_pair(a: Sign, b: Sign) -> Sign {
        match (a, b) {
            (Sign::Unknown, _) | (_, Sign::Unknown) => Sign::Unknown,
            (Sign::NoSign, other) | (other, Sign::NoSign) => other,
            (a, b) if a == b => a,
            _ => Sign::Unknown,
        }
    }
}

impl Lattice for SignLattice {
    type Elem = Sign;

    fn join_all<I>(&self, elements: I) -> Sign
    where
        I: IntoIterator<Item = Sign>,
    {
        elements.into_iter().fold(Sign::NoSign, Self::join_pair)
    }

    fn join(&self, a: &Sign, b: &Sign) -> Sign {
        Self::join_pair(*a, *b)
    }
}

//! Arithmetic logic unit.
//!
//! Only ADD and MUL are wired up. Results wrap modulo 256 and no overflow
//! condition is reported.

use serde::{Serialize, Deserialize};

/// An ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AluOp {
    Add,
    Mul,
}

impl AluOp {
    /// Apply the operation to two register values.
    #[inline]
    pub fn apply(self, a: u8, b: u8) -> u8 {
        match self {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Mul => a.wrapping_mul(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wraparound_boundaries() {
        assert_eq!(AluOp::Add.apply(255, 1), 0);
        assert_eq!(AluOp::Mul.apply(255, 2), 254);
        assert_eq!(AluOp::Mul.apply(16, 16), 0);
        assert_eq!(AluOp::Mul.apply(8, 9), 72);
    }

    proptest! {
        #[test]
        fn add_is_mod_256(a in any::<u8>(), b in any::<u8>()) {
            prop_assert_eq!(AluOp::Add.apply(a, b) as u32, (a as u32 + b as u32) % 256);
        }

        #[test]
        fn mul_is_mod_256(a in any::<u8>(), b in any::<u8>()) {
            prop_assert_eq!(AluOp::Mul.apply(a, b) as u32, (a as u32 * b as u32) % 256);
        }
    }
}

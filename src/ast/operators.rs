use std::{cmp::Ordering, fmt};

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Comparison
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessThanOrEqualTo,
    /// Greater than or equal (`>=`)
    GreaterThanOrEqualTo,

    // Logical
    /// Logical AND (`and`)
    And,
    /// Logical OR (`or`)
    Or,
}

impl BinOp {
    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    /// `==` and `!=`, which fall back to string comparison.
    pub fn is_equality(self) -> bool {
        matches!(self, BinOp::Equal | BinOp::NotEqual)
    }

    /// `<`, `>`, `<=`, `>=`, which require numbers or versions.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            BinOp::LessThan
                | BinOp::GreaterThan
                | BinOp::LessThanOrEqualTo
                | BinOp::GreaterThanOrEqualTo
        )
    }

    /// Applies a comparison operator to the ordering of its operands.
    ///
    /// Logical operators never reach here; they answer `false`.
    pub fn test(self, ordering: Ordering) -> bool {
        match self {
            BinOp::Equal => ordering == Ordering::Equal,
            BinOp::NotEqual => ordering != Ordering::Equal,
            BinOp::LessThan => ordering == Ordering::Less,
            BinOp::GreaterThan => ordering == Ordering::Greater,
            BinOp::LessThanOrEqualTo => ordering != Ordering::Greater,
            BinOp::GreaterThanOrEqualTo => ordering != Ordering::Less,
            BinOp::And | BinOp::Or => false,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Equal => "==",
            BinOp::NotEqual => "!=",
            BinOp::LessThan => "<",
            BinOp::GreaterThan => ">",
            BinOp::LessThanOrEqualTo => "<=",
            BinOp::GreaterThanOrEqualTo => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

//! Detection of conditions that mix `and` and `or` without parentheses.
//!
//! Older engines gave such conditions a surprising precedence, so build
//! tools used to warn about them. This pass only reports; it never affects
//! evaluation.

use crate::{
    ast::{BinOp, Expr, ExprKind},
    parser::Condition,
};

impl Expr {
    /// Whether an `and` appears in this subtree outside nested parentheses.
    pub fn detect_and(&self) -> bool {
        self.detect(BinOp::And)
    }

    /// Whether an `or` appears in this subtree outside nested parentheses.
    pub fn detect_or(&self) -> bool {
        self.detect(BinOp::Or)
    }

    /// Both operators appear at this nesting level.
    pub fn potential_and_or_conflict(&self) -> bool {
        // Both walks always run.
        let detect_or = self.detect_or();
        let detect_and = self.detect_and();
        detect_or && detect_and
    }

    fn detect(&self, wanted: BinOp) -> bool {
        let here = matches!(&self.kind, ExprKind::BinaryOp { op, .. } if *op == wanted);

        // Visit every child, even once something was found.
        let mut found = here;
        for child in self.children() {
            if !child.grouped {
                found |= child.detect(wanted);
            }
        }
        found
    }
}

impl Condition {
    /// Whether any nesting level of the condition mixes `and` and `or`
    /// without parentheses separating them.
    ///
    /// # Examples
    ///
    /// ```
    /// use buildcond::Condition;
    ///
    /// let ambiguous = Condition::parse("a == b or c == d and e == f").unwrap();
    /// assert!(ambiguous.has_and_or_conflict());
    ///
    /// let explicit = Condition::parse("a == b or (c == d and e == f)").unwrap();
    /// assert!(!explicit.has_and_or_conflict());
    /// ```
    pub fn has_and_or_conflict(&self) -> bool {
        let mut conflict = false;
        self.root().walk(&mut |node| {
            if (node.id == self.root().id || node.grouped) && node.potential_and_or_conflict() {
                conflict = true;
            }
        });
        conflict
    }
}

#[cfg(test)]
mod tests {
    use crate::Condition;

    fn conflict(text: &str) -> bool {
        Condition::parse(text).unwrap().has_and_or_conflict()
    }

    #[test]
    fn test_detect_operators() {
        let condition = Condition::parse("a == b and c == d").unwrap();
        assert!(condition.root().detect_and());
        assert!(!condition.root().detect_or());
    }

    #[test]
    fn test_conflicts() {
        assert!(conflict("a or b and c"));
        assert!(conflict("a and b or c"));
        assert!(conflict("x and (a or b and c)"));
        assert!(conflict("!(a or b and c)"));
    }

    #[test]
    fn test_no_conflicts() {
        assert!(!conflict("a and b and c"));
        assert!(!conflict("a or b or c"));
        assert!(!conflict("a or (b and c)"));
        assert!(!conflict("(a or b) and c"));
        assert!(!conflict("'a' == 'b'"));
    }
}

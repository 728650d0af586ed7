use crate::ast::{BinOp, Span};

/// Dense index of a node within its tree, used to key per-evaluation caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Abstract Syntax Tree node for a condition.
///
/// The tree owns its children and never changes after parsing; anything
/// computed during evaluation lives in an [`EvalContext`](crate::EvalContext).
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    /// Source range, including enclosing parentheses when `grouped`.
    pub span: Span,
    /// Written inside explicit parentheses.
    pub grouped: bool,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // Leaves
    /// Quoted string or bare identifier
    ///
    /// # Examples
    /// ```text
    /// 'Debug'           // String { value: "Debug", expandable: false }
    /// '$(Config)|x64'   // String { value: "$(Config)|x64", expandable: true }
    /// true              // String { value: "true", expandable: false }
    /// ```
    String { value: String, expandable: bool },

    /// Numeric literal, kept as written
    ///
    /// # Examples
    /// ```text
    /// 10
    /// 0x1F
    /// 1.2.3
    /// ```
    Numeric(String),

    /// Unquoted property reference (`$(Name)`), expanded on demand
    Property(String),

    /// Unquoted item list reference (`@(Name)`)
    ItemList(String),

    /// Unquoted metadata reference (`%(Name)`)
    ItemMetadata(String),

    /// Built-in function call
    ///
    /// # Examples
    /// ```text
    /// Exists('$(OutDir)')
    /// HasTrailingSlash($(Dir))
    /// ```
    FunctionCall { name: String, args: Vec<Expr> },

    // Operators
    /// Logical negation (`!` or `not`)
    Not(Box<Expr>),

    /// Logical or comparison operator
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn new(id: NodeId, span: Span, kind: ExprKind) -> Self {
        Expr {
            id,
            span,
            grouped: false,
            kind,
        }
    }

    /// Whether this node is a literal or reference rather than an operator.
    pub fn is_leaf(&self) -> bool {
        !matches!(
            self.kind,
            ExprKind::Not(_) | ExprKind::BinaryOp { .. } | ExprKind::FunctionCall { .. }
        )
    }

    /// Direct children, left to right.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Not(inner) => vec![inner.as_ref()],
            ExprKind::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ExprKind::FunctionCall { args, .. } => args.iter().collect(),
            _ => vec![],
        }
    }

    /// Visits this node and all its descendants, parents first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Text the leaf stands for before any expansion. `None` for operators.
    pub fn leaf_text(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::String { value, .. } => Some(value),
            ExprKind::Numeric(text)
            | ExprKind::Property(text)
            | ExprKind::ItemList(text)
            | ExprKind::ItemMetadata(text) => Some(text),
            _ => None,
        }
    }

    /// Whether the leaf text may contain references or escapes.
    pub fn is_expandable(&self) -> bool {
        match &self.kind {
            ExprKind::String { expandable, .. } => *expandable,
            ExprKind::Property(_) | ExprKind::ItemList(_) | ExprKind::ItemMetadata(_) => true,
            _ => false,
        }
    }

    /// Compact s-expression rendering for debugging and tests.
    pub fn debug_display(&self) -> String {
        match &self.kind {
            ExprKind::String { value, .. } => format!("'{}'", value),
            ExprKind::Numeric(text)
            | ExprKind::Property(text)
            | ExprKind::ItemList(text)
            | ExprKind::ItemMetadata(text) => text.clone(),
            ExprKind::FunctionCall { name, args } => {
                let args: Vec<String> = args.iter().map(Expr::debug_display).collect();
                format!("{}({})", name, args.join(", "))
            }
            ExprKind::Not(inner) => format!("(not {})", inner.debug_display()),
            ExprKind::BinaryOp { op, left, right } => format!(
                "({} {} {})",
                op,
                left.debug_display(),
                right.debug_display()
            ),
        }
    }
}

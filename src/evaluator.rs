use std::{cell::RefCell, fmt};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    ast::{BinOp, Expr, ExprKind, NodeId},
    expander,
    parser::{Condition, ParseError, ParserOptions},
    state::{ElementLocation, EvaluationState, ExpansionError},
    value::{self, Version},
};

/// Which operand of a binary operator an error is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// A value domain text can be coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Boolean,
    Numeric,
    Version,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Boolean => f.write_str("boolean"),
            Domain::Numeric => f.write_str("number"),
            Domain::Version => f.write_str("version"),
        }
    }
}

/// Errors that can occur while evaluating a condition.
///
/// Every variant carries the condition as written and where it came from.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Syntax(#[from] ParseError),

    /// The whole condition is not a boolean, e.g. `'abc'`.
    #[error("{location}: condition \"{condition}\" evaluated to \"{expanded}\" instead of a boolean")]
    NotBoolean {
        condition: String,
        expanded: String,
        location: ElementLocation,
    },

    /// An operand of `and`/`or` is not a boolean.
    #[error(
        "{location}: the {side} operand of '{op}' in condition \"{condition}\" is \"{unexpanded}\", which evaluated to \"{expanded}\" instead of a boolean"
    )]
    OperandNotBoolean {
        condition: String,
        op: BinOp,
        side: Side,
        unexpanded: String,
        expanded: String,
        location: ElementLocation,
    },

    /// Ordering comparison between values that are not both numbers or both
    /// versions. `side` is the first operand that does not fit.
    #[error(
        "{location}: cannot compare \"{left}\" {op} \"{right}\" in condition \"{condition}\": both operands must be numbers or both versions"
    )]
    NotComparable {
        condition: String,
        op: BinOp,
        side: Side,
        left: String,
        right: String,
        location: ElementLocation,
    },

    #[error("{location}: \"{expanded}\" in condition \"{condition}\" is not a {domain}")]
    NotCoercible {
        condition: String,
        domain: Domain,
        expanded: String,
        location: ElementLocation,
    },

    #[error("{location}: unknown function '{name}' in condition \"{condition}\"")]
    UndefinedFunction {
        condition: String,
        name: String,
        location: ElementLocation,
    },

    #[error(
        "{location}: function '{name}' takes {expected} argument(s) but {found} were given in condition \"{condition}\""
    )]
    IncorrectArgumentCount {
        condition: String,
        name: String,
        expected: usize,
        found: usize,
        location: ElementLocation,
    },

    #[error("{location}: cannot expand \"{text}\" in condition \"{condition}\": {source}")]
    Expansion {
        condition: String,
        text: String,
        location: ElementLocation,
        #[source]
        source: ExpansionError,
    },
}

impl EvalError {
    /// A value could not be used in the domain an operator needed.
    pub fn is_type_coercion(&self) -> bool {
        matches!(
            self,
            EvalError::NotBoolean { .. }
                | EvalError::OperandNotBoolean { .. }
                | EvalError::NotComparable { .. }
                | EvalError::NotCoercible { .. }
        )
    }

    pub fn location(&self) -> Option<&ElementLocation> {
        match self {
            EvalError::Syntax(_) => None,
            EvalError::NotBoolean { location, .. }
            | EvalError::OperandNotBoolean { location, .. }
            | EvalError::NotComparable { location, .. }
            | EvalError::NotCoercible { location, .. }
            | EvalError::UndefinedFunction { location, .. }
            | EvalError::IncorrectArgumentCount { location, .. }
            | EvalError::Expansion { location, .. } => Some(location),
        }
    }
}

/// Property values a condition compares against, e.g. the configurations a
/// project knows about from `'$(Configuration)' == 'Debug'`.
///
/// Names are case-insensitive; values keep the first spelling seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionedProperties {
    entries: Vec<(String, Vec<String>)>,
}

impl ConditionedProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &str, value: &str) {
        let index = match self
            .entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(index) => index,
            None => {
                self.entries.push((name.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };

        let values = &mut self.entries[index].1;
        if !values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
            values.push(value.to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn merge(&mut self, other: ConditionedProperties) {
        for (name, values) in other.entries {
            for value in values {
                self.record(&name, &value);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Memoized per-node results for one evaluation.
#[derive(Debug, Clone, Default)]
struct NodeCache {
    expanded: Option<String>,
    numeric: Option<Option<Decimal>>,
    version: Option<Option<Version>>,
}

/// Everything one evaluation of a tree needs: the state references are
/// expanded against and a side-table of per-node caches.
///
/// A context belongs to one tree and one state. Caches never leak into the
/// tree, so a parsed [`Condition`] can be shared between threads, each
/// evaluating with its own context.
pub struct EvalContext<'a> {
    source: &'a str,
    state: &'a dyn EvaluationState,
    cache: RefCell<Vec<NodeCache>>,
    conditioned: Option<RefCell<ConditionedProperties>>,
}

impl<'a> EvalContext<'a> {
    pub fn new(state: &'a dyn EvaluationState) -> Self {
        EvalContext {
            source: state.condition(),
            state,
            cache: RefCell::new(Vec::new()),
            conditioned: None,
        }
    }

    /// A context sized for `condition`, reporting its text in errors.
    pub fn for_condition(condition: &'a Condition, state: &'a dyn EvaluationState) -> Self {
        EvalContext {
            source: condition.text(),
            state,
            cache: RefCell::new(vec![NodeCache::default(); condition.node_count()]),
            conditioned: None,
        }
    }

    /// Also collects conditioned properties while evaluating.
    pub fn recording_conditioned_properties(mut self) -> Self {
        self.conditioned = Some(RefCell::new(ConditionedProperties::new()));
        self
    }

    pub fn state(&self) -> &'a dyn EvaluationState {
        self.state
    }

    /// Drops every cached result, so the next evaluation sees the state
    /// afresh.
    pub fn reset_state(&mut self) {
        for entry in self.cache.get_mut().iter_mut() {
            *entry = NodeCache::default();
        }
    }

    pub fn take_conditioned_properties(&mut self) -> Option<ConditionedProperties> {
        self.conditioned
            .as_mut()
            .map(|recorded| std::mem::take(recorded.get_mut()))
    }

    fn clear_node(&mut self, id: NodeId) {
        if let Some(entry) = self.cache.get_mut().get_mut(id.0) {
            *entry = NodeCache::default();
        }
    }

    fn cached<T>(&self, id: NodeId, read: impl FnOnce(&NodeCache) -> Option<T>) -> Option<T> {
        self.cache.borrow().get(id.0).and_then(read)
    }

    fn store(&self, id: NodeId, write: impl FnOnce(&mut NodeCache)) {
        let mut cache = self.cache.borrow_mut();
        if cache.len() <= id.0 {
            cache.resize(id.0 + 1, NodeCache::default());
        }
        write(&mut cache[id.0]);
    }

    fn record_conditioned(&self, name: &str, value: &str) {
        if let Some(recorded) = &self.conditioned {
            log::debug!("conditioned property {} = '{}'", name, value);
            recorded.borrow_mut().record(name, value);
        }
    }

    fn condition(&self) -> String {
        self.source.to_string()
    }

    fn location(&self) -> ElementLocation {
        self.state.location().clone()
    }
}

// Built-in functions: lowercase name and argument count.
const EXISTS: (&str, usize) = ("exists", 1);
const HAS_TRAILING_SLASH: (&str, usize) = ("hastrailingslash", 1);

impl Expr {
    /// Evaluates this node as a whole condition.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        if !self.can_bool_evaluate(ctx)? {
            return Err(EvalError::NotBoolean {
                condition: ctx.condition(),
                expanded: self.expanded_value(ctx)?,
                location: ctx.location(),
            });
        }
        self.bool_evaluate(ctx)
    }

    pub fn can_bool_evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        match &self.kind {
            ExprKind::Numeric(_) => Ok(false),
            ExprKind::Not(inner) => inner.can_bool_evaluate(ctx),
            ExprKind::BinaryOp { .. } | ExprKind::FunctionCall { .. } => Ok(true),
            _ => Ok(value::to_bool(&self.expanded_value(ctx)?).is_some()),
        }
    }

    pub fn can_numeric_evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        Ok(self.numeric(ctx)?.is_some())
    }

    pub fn can_version_evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        Ok(self.version(ctx)?.is_some())
    }

    pub fn bool_evaluate(&self, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        match &self.kind {
            ExprKind::Not(inner) => Ok(!inner.bool_evaluate(ctx)?),
            ExprKind::BinaryOp { op, left, right } if op.is_logical() => {
                self.logical(*op, left, right, ctx)
            }
            ExprKind::BinaryOp { op, left, right } => self.compare(*op, left, right, ctx),
            ExprKind::FunctionCall { name, args } => self.call(name, args, ctx),
            _ => {
                let expanded = self.expanded_value(ctx)?;
                value::to_bool(&expanded).ok_or_else(|| EvalError::NotCoercible {
                    condition: ctx.condition(),
                    domain: Domain::Boolean,
                    expanded,
                    location: ctx.location(),
                })
            }
        }
    }

    pub fn numeric_evaluate(&self, ctx: &EvalContext<'_>) -> Result<Decimal, EvalError> {
        match self.numeric(ctx)? {
            Some(number) => Ok(number),
            None => Err(self.not_coercible(Domain::Numeric, ctx)?),
        }
    }

    pub fn version_evaluate(&self, ctx: &EvalContext<'_>) -> Result<Version, EvalError> {
        match self.version(ctx)? {
            Some(version) => Ok(version),
            None => Err(self.not_coercible(Domain::Version, ctx)?),
        }
    }

    /// The node's text after reference expansion. Leaves are expanded at
    /// most once per context; operators and calls render their source.
    pub fn expanded_value(&self, ctx: &EvalContext<'_>) -> Result<String, EvalError> {
        match &self.kind {
            ExprKind::String {
                value,
                expandable: false,
            }
            | ExprKind::Numeric(value) => Ok(value.clone()),
            ExprKind::String { value: text, .. }
            | ExprKind::Property(text)
            | ExprKind::ItemList(text)
            | ExprKind::ItemMetadata(text) => {
                if let Some(expanded) = ctx.cached(self.id, |c| c.expanded.clone()) {
                    return Ok(expanded);
                }
                let expanded = ctx.state.expand(text).map_err(|source| EvalError::Expansion {
                    condition: ctx.condition(),
                    text: text.clone(),
                    location: ctx.location(),
                    source,
                })?;
                ctx.store(self.id, |c| c.expanded = Some(expanded.clone()));
                Ok(expanded)
            }
            ExprKind::Not(inner) => Ok(format!("!{}", inner.expanded_value(ctx)?)),
            ExprKind::BinaryOp { .. } | ExprKind::FunctionCall { .. } => {
                Ok(self.span.slice(ctx.source))
            }
        }
    }

    /// The node's text as written, for diagnostics.
    pub fn unexpanded_value(&self, ctx: &EvalContext<'_>) -> String {
        match &self.kind {
            ExprKind::Not(inner) => format!("!{}", inner.unexpanded_value(ctx)),
            ExprKind::BinaryOp { .. } | ExprKind::FunctionCall { .. } => {
                self.span.slice(ctx.source)
            }
            _ => self.leaf_text().unwrap_or_default().to_string(),
        }
    }

    /// Whether the node's value is the empty string. Unexpandable text
    /// answers without touching the state.
    pub fn evaluates_to_empty(&self, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        match &self.kind {
            ExprKind::String {
                value,
                expandable: false,
            } => Ok(value.is_empty()),
            ExprKind::String { .. }
            | ExprKind::Property(_)
            | ExprKind::ItemList(_)
            | ExprKind::ItemMetadata(_) => Ok(self.expanded_value(ctx)?.is_empty()),
            _ => Ok(false),
        }
    }

    /// Clears the cached results of this node and its descendants.
    pub fn reset_state(&self, ctx: &mut EvalContext<'_>) {
        let mut ids = Vec::new();
        self.walk(&mut |node| ids.push(node.id));
        for id in ids {
            ctx.clear_node(id);
        }
    }

    fn numeric(&self, ctx: &EvalContext<'_>) -> Result<Option<Decimal>, EvalError> {
        if !self.is_leaf() {
            return Ok(None);
        }
        if let Some(number) = ctx.cached(self.id, |c| c.numeric) {
            return Ok(number);
        }
        let number = if self.evaluates_to_empty(ctx)? {
            None
        } else {
            value::to_number(&self.expanded_value(ctx)?)
        };
        ctx.store(self.id, |c| c.numeric = Some(number));
        Ok(number)
    }

    fn version(&self, ctx: &EvalContext<'_>) -> Result<Option<Version>, EvalError> {
        if !self.is_leaf() {
            return Ok(None);
        }
        if let Some(version) = ctx.cached(self.id, |c| c.version) {
            return Ok(version);
        }
        let version = if self.evaluates_to_empty(ctx)? {
            None
        } else {
            value::to_version(&self.expanded_value(ctx)?)
        };
        ctx.store(self.id, |c| c.version = Some(version));
        Ok(version)
    }

    fn not_coercible(&self, domain: Domain, ctx: &EvalContext<'_>) -> Result<EvalError, EvalError> {
        Ok(EvalError::NotCoercible {
            condition: ctx.condition(),
            domain,
            expanded: self.expanded_value(ctx)?,
            location: ctx.location(),
        })
    }

    /// Boolean value of an `and`/`or` operand.
    fn operand(&self, op: BinOp, side: Side, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        if !self.can_bool_evaluate(ctx)? {
            return Err(EvalError::OperandNotBoolean {
                condition: ctx.condition(),
                op,
                side,
                unexpanded: self.unexpanded_value(ctx),
                expanded: self.expanded_value(ctx)?,
                location: ctx.location(),
            });
        }
        self.bool_evaluate(ctx)
    }

    fn logical(
        &self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        ctx: &EvalContext<'_>,
    ) -> Result<bool, EvalError> {
        let left_value = left.operand(op, Side::Left, ctx)?;

        match (op, left_value) {
            (BinOp::And, false) | (BinOp::Or, true) => {
                log::debug!(
                    "'{}' short-circuits on left operand {}",
                    op,
                    left_value
                );
                Ok(left_value)
            }
            _ => right.operand(op, Side::Right, ctx),
        }
    }

    fn compare(
        &self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        ctx: &EvalContext<'_>,
    ) -> Result<bool, EvalError> {
        if op.is_equality() {
            self.record_conditioned(left, right, ctx)?;
        }

        // A grouped expression or call has a truth value, not text.
        if !left.is_leaf() || !right.is_leaf() {
            return self.compare_booleans(op, left, right, ctx);
        }

        if let (Some(l), Some(r)) = (left.numeric(ctx)?, right.numeric(ctx)?) {
            log::debug!("comparing {} {} {} as numbers", l, op, r);
            return Ok(op.test(l.cmp(&r)));
        }

        if let (Some(l), Some(r)) = (left.version(ctx)?, right.version(ctx)?) {
            log::debug!("comparing {} {} {} as versions", l, op, r);
            return Ok(op.test(l.cmp(&r)));
        }

        let l = left.expanded_value(ctx)?;
        let r = right.expanded_value(ctx)?;

        if op.is_ordering() {
            let left_ok = left.numeric(ctx)?.is_some() || left.version(ctx)?.is_some();
            return Err(EvalError::NotComparable {
                condition: ctx.condition(),
                op,
                side: if left_ok { Side::Right } else { Side::Left },
                left: l,
                right: r,
                location: ctx.location(),
            });
        }

        log::debug!("comparing '{}' {} '{}' as strings", l, op, r);
        let equal = value::eq_ignore_case(&l, &r);
        Ok(if op == BinOp::NotEqual { !equal } else { equal })
    }

    /// `==`/`!=` where at least one side is an operator or a call: both
    /// sides must be booleans.
    fn compare_booleans(
        &self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        ctx: &EvalContext<'_>,
    ) -> Result<bool, EvalError> {
        if op.is_ordering() {
            let left_ok = left.numeric(ctx)?.is_some() || left.version(ctx)?.is_some();
            return Err(EvalError::NotComparable {
                condition: ctx.condition(),
                op,
                side: if left_ok { Side::Right } else { Side::Left },
                left: left.unexpanded_value(ctx),
                right: right.unexpanded_value(ctx),
                location: ctx.location(),
            });
        }

        for side in [left, right] {
            if !side.can_bool_evaluate(ctx)? {
                return Err(side.not_coercible(Domain::Boolean, ctx)?);
            }
        }
        let l = left.bool_evaluate(ctx)?;
        let r = right.bool_evaluate(ctx)?;

        log::debug!("comparing {} {} {} as booleans", l, op, r);
        Ok(if op == BinOp::NotEqual { l != r } else { l == r })
    }

    /// For `'$(A)|$(B)' == 'x|y'`, records `A = x` and `B = y`.
    fn record_conditioned(
        &self,
        left: &Expr,
        right: &Expr,
        ctx: &EvalContext<'_>,
    ) -> Result<(), EvalError> {
        if ctx.conditioned.is_none() {
            return Ok(());
        }

        let has_property = |node: &Expr| {
            node.is_expandable() && node.leaf_text().is_some_and(|text| text.contains("$("))
        };
        let is_literal = |node: &Expr| {
            node.is_leaf() && node.leaf_text().is_some_and(|t| !expander::contains_references(t))
        };

        let (pattern, literal) = if has_property(left) && is_literal(right) {
            (left, right)
        } else if has_property(right) && is_literal(left) {
            (right, left)
        } else {
            return Ok(());
        };

        let pattern = pattern.unexpanded_value(ctx);
        let literal = literal.expanded_value(ctx)?;
        let names: Vec<&str> = pattern.split('|').collect();
        let values: Vec<&str> = literal.split('|').collect();
        if names.len() != values.len() {
            return Ok(());
        }

        for (name, value) in names.iter().zip(values) {
            if let Some(name) = name
                .trim()
                .strip_prefix("$(")
                .and_then(|rest| rest.strip_suffix(')'))
                .map(str::trim)
                .filter(|n| !n.is_empty() && n.chars().all(crate::chars::is_simple_string_char))
            {
                ctx.record_conditioned(name, value);
            }
        }
        Ok(())
    }

    fn call(&self, name: &str, args: &[Expr], ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        let lowered = name.to_ascii_lowercase();
        let (_, expected) = [EXISTS, HAS_TRAILING_SLASH]
            .into_iter()
            .find(|(builtin, _)| *builtin == lowered)
            .ok_or_else(|| EvalError::UndefinedFunction {
                condition: ctx.condition(),
                name: name.to_string(),
                location: ctx.location(),
            })?;

        if args.len() != expected {
            return Err(EvalError::IncorrectArgumentCount {
                condition: ctx.condition(),
                name: name.to_string(),
                expected,
                found: args.len(),
                location: ctx.location(),
            });
        }

        let argument = args[0].expanded_value(ctx)?;
        let result = if lowered == EXISTS.0 {
            let path = argument.trim();
            !path.is_empty() && ctx.state.path_exists(path)
        } else {
            argument.ends_with('/') || argument.ends_with('\\')
        };

        log::debug!("{}('{}') = {}", name, argument, result);
        Ok(result)
    }
}

impl Condition {
    /// Evaluates against `state` with a fresh context.
    pub fn evaluate(&self, state: &dyn EvaluationState) -> Result<bool, EvalError> {
        let ctx = EvalContext::for_condition(self, state);
        self.evaluate_in(&ctx)
    }

    /// Evaluates with a caller-held context, reusing whatever it cached.
    pub fn evaluate_in(&self, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        self.root().evaluate(ctx)
    }
}

/// Evaluates parsed conditions, optionally collecting conditioned
/// properties across calls.
///
/// # Examples
///
/// ```
/// use buildcond::{Condition, Evaluator};
/// use buildcond::state::ElementLocation;
/// use buildcond::store::ProjectState;
///
/// let text = "'$(Configuration)|$(Platform)' == 'Debug|x64'";
/// let condition = Condition::parse(text).unwrap();
/// let project = ProjectState::new().with_property("Configuration", "Debug");
/// let state = project.condition_state(text, ElementLocation::default());
///
/// let mut evaluator = Evaluator::recording_conditioned_properties();
/// assert!(!evaluator.evaluate(&condition, &state).unwrap());
///
/// let seen = evaluator.conditioned_properties().unwrap();
/// assert_eq!(seen.get("platform").unwrap(), ["x64"]);
/// ```
#[derive(Debug, Default)]
pub struct Evaluator {
    conditioned: Option<ConditionedProperties>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recording_conditioned_properties() -> Self {
        Evaluator {
            conditioned: Some(ConditionedProperties::new()),
        }
    }

    pub fn evaluate(
        &mut self,
        condition: &Condition,
        state: &dyn EvaluationState,
    ) -> Result<bool, EvalError> {
        let mut ctx = EvalContext::for_condition(condition, state);
        if self.conditioned.is_some() {
            ctx = ctx.recording_conditioned_properties();
        }

        let result = condition.evaluate_in(&ctx);

        if let (Some(into), Some(recorded)) =
            (self.conditioned.as_mut(), ctx.take_conditioned_properties())
        {
            into.merge(recorded);
        }
        result
    }

    pub fn conditioned_properties(&self) -> Option<&ConditionedProperties> {
        self.conditioned.as_ref()
    }

    pub fn take_conditioned_properties(&mut self) -> ConditionedProperties {
        self.conditioned
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default()
    }
}

/// Parses and evaluates `text` in one step. A blank condition is true.
pub fn evaluate_condition(
    text: &str,
    options: ParserOptions,
    state: &dyn EvaluationState,
) -> Result<bool, EvalError> {
    if text.trim().is_empty() {
        return Ok(true);
    }
    let condition = Condition::parse_with_options(text, options)?;
    condition.evaluate(state)
}

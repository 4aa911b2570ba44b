use crate::ast::{Connector, OpId, TypeName};
use crate::registry::Registry;
use crate::value::Value;

/// Expression tree node.
///
/// The tree is strictly owned: every child belongs to exactly one parent.
/// Visitors only read it; editing goes through the methods on the node
/// structs, after which the caller reports the change (see
/// [`CodeBuilder::raise_change`](crate::CodeBuilder::raise_change)).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Expr {
    /// Placeholder meaning "no expression set"
    #[default]
    Empty,

    /// Boolean combination of child conditions
    ///
    /// # Example
    /// ```text
    /// (status == "open" && total > 10)
    /// ```
    CriteriaGroup(CriteriaGroup),

    /// Single boolean test
    ///
    /// # Example
    /// ```text
    /// status == "open"
    /// ```
    Criterion(Criterion),

    /// Dotted reference into the schema
    NestedField(NestedField),

    /// Literal value
    Parameter(Parameter),

    /// Named operation over positional operands
    ///
    /// # Example
    /// ```text
    /// sum(orders.amount)
    /// ```
    Operation(Operation),

    /// `if(condition, then, else)`
    If(IfOperation),

    /// `choose(when1, then1, when2, then2, ...)`
    Choose(ChooseOperation),
}

/// Variant discriminant of an [`Expr`], used where a constructor is needed
/// without an instance (registry entries, default-expression factories).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Empty,
    CriteriaGroup,
    Criterion,
    NestedField,
    Parameter,
    Operation,
    If,
    Choose,
}

impl ExprKind {
    /// Builds the zero-argument form of this variant.
    pub fn create_default(self) -> Expr {
        match self {
            ExprKind::Empty => Expr::Empty,
            ExprKind::CriteriaGroup => Expr::CriteriaGroup(CriteriaGroup::default()),
            ExprKind::Criterion => Expr::Criterion(Criterion::default()),
            ExprKind::NestedField => Expr::NestedField(NestedField::default()),
            ExprKind::Parameter => Expr::Parameter(Parameter::default()),
            ExprKind::Operation => Expr::Operation(Operation::default()),
            ExprKind::If => Expr::If(IfOperation::new()),
            ExprKind::Choose => Expr::Choose(ChooseOperation::new()),
        }
    }

    pub fn is_operation(self) -> bool {
        matches!(self, ExprKind::Operation | ExprKind::If | ExprKind::Choose)
    }
}

impl Expr {
    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::Empty => ExprKind::Empty,
            Expr::CriteriaGroup(_) => ExprKind::CriteriaGroup,
            Expr::Criterion(_) => ExprKind::Criterion,
            Expr::NestedField(_) => ExprKind::NestedField,
            Expr::Parameter(_) => ExprKind::Parameter,
            Expr::Operation(_) => ExprKind::Operation,
            Expr::If(_) => ExprKind::If,
            Expr::Choose(_) => ExprKind::Choose,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Expr::Empty)
    }

    /// Builds the most specific operation variant for `name`.
    ///
    /// # Examples
    ///
    /// ```
    /// use codebuilder::{Expr, ExprKind};
    ///
    /// assert_eq!(Expr::operation("IF", vec![]).kind(), ExprKind::If);
    /// assert_eq!(Expr::operation("sum", vec![]).kind(), ExprKind::Operation);
    /// ```
    pub fn operation(name: impl Into<String>, operands: Vec<Option<Expr>>) -> Expr {
        Operation::new(name, operands).specialize()
    }

    /// Value type known from the node itself.
    ///
    /// Operations have no intrinsic type; their return type comes from the
    /// operation catalog.
    pub fn value_type(&self) -> Option<TypeName> {
        match self {
            Expr::CriteriaGroup(_) | Expr::Criterion(_) => Some(TypeName::BOOLEAN),
            Expr::NestedField(field) => Some(field.type_name),
            Expr::Parameter(param) => Some(param.type_name),
            _ => None,
        }
    }

    pub fn as_operation(&self) -> Option<&Operation> {
        match self {
            Expr::Operation(op) => Some(op),
            Expr::If(op) => Some(&op.op),
            Expr::Choose(op) => Some(&op.op),
            _ => None,
        }
    }

    pub fn as_operation_mut(&mut self) -> Option<&mut Operation> {
        match self {
            Expr::Operation(op) => Some(op),
            Expr::If(op) => Some(&mut op.op),
            Expr::Choose(op) => Some(&mut op.op),
            _ => None,
        }
    }

    pub fn into_operation(self) -> Option<Operation> {
        match self {
            Expr::Operation(op) => Some(op),
            Expr::If(op) => Some(op.op),
            Expr::Choose(op) => Some(op.op),
            _ => None,
        }
    }
}

impl From<CriteriaGroup> for Expr {
    fn from(group: CriteriaGroup) -> Self {
        Expr::CriteriaGroup(group)
    }
}

impl From<Criterion> for Expr {
    fn from(criterion: Criterion) -> Self {
        Expr::Criterion(criterion)
    }
}

impl From<NestedField> for Expr {
    fn from(field: NestedField) -> Self {
        Expr::NestedField(field)
    }
}

impl From<Parameter> for Expr {
    fn from(param: Parameter) -> Self {
        Expr::Parameter(param)
    }
}

impl From<Operation> for Expr {
    fn from(op: Operation) -> Self {
        Expr::Operation(op)
    }
}

impl From<IfOperation> for Expr {
    fn from(op: IfOperation) -> Self {
        Expr::If(op)
    }
}

impl From<ChooseOperation> for Expr {
    fn from(op: ChooseOperation) -> Self {
        Expr::Choose(op)
    }
}

/// Ordered boolean combination of conditions.
///
/// An empty `criteria` list is vacuously true under `and`; the compilers
/// render it as-is (an empty clause list or an empty expression).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CriteriaGroup {
    pub criteria: Vec<Expr>,
    pub connector: Connector,
    pub negate: bool,
}

impl CriteriaGroup {
    pub fn new(connector: Connector) -> Self {
        CriteriaGroup {
            connector,
            ..Default::default()
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    pub fn with(mut self, child: impl Into<Expr>) -> Self {
        self.add(child);
        self
    }

    pub fn add(&mut self, child: impl Into<Expr>) {
        self.criteria.push(child.into());
    }

    pub fn add_criterion(&mut self, criterion: Criterion) {
        self.criteria.push(Expr::Criterion(criterion));
    }

    pub fn add_sub_group(&mut self, group: CriteriaGroup) {
        self.criteria.push(Expr::CriteriaGroup(group));
    }

    /// Removes the child at `index`, if there is one.
    pub fn remove(&mut self, index: usize) -> Option<Expr> {
        (index < self.criteria.len()).then(|| self.criteria.remove(index))
    }
}

/// Leaf boolean test: `left <operator> right`.
///
/// All parts are optional so a half-built rule can still be rendered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Criterion {
    pub left_operand: Option<Box<Expr>>,
    pub operator: Option<OpId>,
    pub right_operand: Option<Box<Expr>>,
}

impl Criterion {
    pub fn new(left: impl Into<Expr>, operator: OpId, right: impl Into<Expr>) -> Self {
        Criterion {
            left_operand: Some(Box::new(left.into())),
            operator: Some(operator),
            right_operand: Some(Box::new(right.into())),
        }
    }

    /// A criterion whose operator takes no right operand (`Null`, `NotNull`).
    pub fn unary(left: impl Into<Expr>, operator: OpId) -> Self {
        Criterion {
            left_operand: Some(Box::new(left.into())),
            operator: Some(operator),
            right_operand: None,
        }
    }

    pub fn left(&self) -> Option<&Expr> {
        self.left_operand.as_deref()
    }

    pub fn right(&self) -> Option<&Expr> {
        self.right_operand.as_deref()
    }
}

/// Dotted path into the schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NestedField {
    pub path: Vec<String>,
    /// Path is relative to an enclosing `Has*` scope
    pub scoped: bool,
    pub type_name: TypeName,
}

impl Default for NestedField {
    fn default() -> Self {
        NestedField {
            path: Vec::new(),
            scoped: false,
            type_name: TypeName::STRING,
        }
    }
}

impl NestedField {
    pub fn new<I, S>(path: I, type_name: TypeName) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NestedField {
            path: path.into_iter().map(Into::into).collect(),
            scoped: false,
            type_name,
        }
    }

    /// Last path segment, or `"None"` for an empty path.
    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("None")
    }

    pub fn full_name(&self) -> String {
        self.path.join(".")
    }

    /// True when this field is `prefix` itself or lies below it.
    ///
    /// Paths compare segment by segment, so a segment that itself contains
    /// a `.` never matches two prefix segments.
    pub fn is_under<S: AsRef<str>>(&self, prefix: &[S]) -> bool {
        prefix.len() <= self.path.len()
            && self
                .path
                .iter()
                .zip(prefix)
                .all(|(segment, expected)| segment == expected.as_ref())
    }

    /// Re-roots this field below `prefix`, marking it scoped.
    ///
    /// # Examples
    ///
    /// ```
    /// use codebuilder::{NestedField, TypeName};
    ///
    /// let amount = NestedField::new(["orders", "amount"], TypeName::NUMBER);
    /// let scoped = amount.try_scope(&["orders"]).unwrap();
    /// assert_eq!(scoped.path, vec!["amount"]);
    /// assert!(scoped.scoped);
    ///
    /// let name = NestedField::new(["name"], TypeName::STRING);
    /// assert!(name.try_scope(&["orders"]).is_none());
    /// ```
    pub fn try_scope<S: AsRef<str>>(&self, prefix: &[S]) -> Option<NestedField> {
        self.is_under(prefix).then(|| NestedField {
            path: self.path[prefix.len()..].to_vec(),
            scoped: true,
            type_name: self.type_name,
        })
    }
}

/// Literal value with its declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub value: Value,
    pub type_name: TypeName,
}

impl Default for Parameter {
    fn default() -> Self {
        Parameter {
            value: Value::default(),
            type_name: TypeName::STRING,
        }
    }
}

impl Parameter {
    pub fn new(value: impl Into<Value>, type_name: TypeName) -> Self {
        Parameter {
            value: value.into(),
            type_name,
        }
    }

    /// A parameter typed after the shape of its value.
    pub fn literal(value: impl Into<Value>) -> Self {
        let value = value.into();
        let type_name = value.type_name();
        Parameter { value, type_name }
    }
}

/// Named operation over positional operands.
///
/// Operand slots may be unset (`None`), which is distinct from
/// [`Expr::Empty`]: an unset slot has never been assigned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Operation {
    pub name: String,
    pub operands: Vec<Option<Expr>>,
}

impl Operation {
    pub fn new(name: impl Into<String>, operands: Vec<Option<Expr>>) -> Self {
        Operation {
            name: name.into(),
            operands,
        }
    }

    pub fn operand(&self, index: usize) -> Option<&Expr> {
        self.operands.get(index).and_then(Option::as_ref)
    }

    /// Assigns slot `index`, back-filling any missing slots with `None`.
    pub fn set_operand(&mut self, index: usize, expr: Option<Expr>) {
        if self.operands.len() <= index {
            self.operands.resize(index + 1, None);
        }
        self.operands[index] = expr;
    }

    /// Rewraps as `If`/`Choose` when the name calls for it.
    pub fn specialize(self) -> Expr {
        match Registry::global().recognize_operation(&self.name) {
            ExprKind::If => Expr::If(IfOperation::from_operation(self)),
            ExprKind::Choose => Expr::Choose(ChooseOperation::from_operation(self)),
            _ => Expr::Operation(self),
        }
    }
}

/// `if(condition, then, else)` over the operation's operand list.
#[derive(Debug, Clone, PartialEq)]
pub struct IfOperation {
    op: Operation,
}

impl Default for IfOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl IfOperation {
    pub fn new() -> Self {
        IfOperation {
            op: Operation::new("if", Vec::new()),
        }
    }

    pub fn with_branches(
        condition: impl Into<Expr>,
        if_true: impl Into<Expr>,
        if_false: impl Into<Expr>,
    ) -> Self {
        let mut result = IfOperation::new();
        result.set_condition(Some(condition.into()));
        result.set_if_true(Some(if_true.into()));
        result.set_if_false(Some(if_false.into()));
        result
    }

    pub(crate) fn from_operation(op: Operation) -> Self {
        IfOperation { op }
    }

    pub fn operation(&self) -> &Operation {
        &self.op
    }

    pub fn operation_mut(&mut self) -> &mut Operation {
        &mut self.op
    }

    pub fn condition(&self) -> Option<&Expr> {
        self.op.operand(0)
    }

    pub fn if_true(&self) -> Option<&Expr> {
        self.op.operand(1)
    }

    pub fn if_false(&self) -> Option<&Expr> {
        self.op.operand(2)
    }

    pub fn set_condition(&mut self, expr: Option<Expr>) {
        self.op.set_operand(0, expr);
    }

    pub fn set_if_true(&mut self, expr: Option<Expr>) {
        self.op.set_operand(1, expr);
    }

    pub fn set_if_false(&mut self, expr: Option<Expr>) {
        self.op.set_operand(2, expr);
    }
}

/// `choose(when1, then1, when2, then2, ...)`: first matching condition wins.
#[derive(Debug, Clone, PartialEq)]
pub struct ChooseOperation {
    op: Operation,
}

impl Default for ChooseOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl ChooseOperation {
    pub fn new() -> Self {
        ChooseOperation {
            op: Operation::new("choose", Vec::new()),
        }
    }

    pub(crate) fn from_operation(op: Operation) -> Self {
        ChooseOperation { op }
    }

    pub fn operation(&self) -> &Operation {
        &self.op
    }

    pub fn operation_mut(&mut self) -> &mut Operation {
        &mut self.op
    }

    /// `(condition, result)` pairs in evaluation order.
    pub fn branches(&self) -> impl Iterator<Item = (Option<&Expr>, Option<&Expr>)> {
        (0..self.op.operands.len())
            .step_by(2)
            .map(|i| (self.op.operand(i), self.op.operand(i + 1)))
    }

    pub fn add_branch(&mut self, condition: Option<Expr>, result: Option<Expr>) {
        self.op.operands.push(condition);
        self.op.operands.push(result);
    }

    /// Removes both operands of the pair at `branch`.
    pub fn remove_branch(&mut self, branch: usize) {
        let start = branch * 2;
        if start < self.op.operands.len() {
            let end = (start + 2).min(self.op.operands.len());
            self.op.operands.drain(start..end);
        }
    }
}

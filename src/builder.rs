//! Editing configuration around an expression tree.
//!
//! A [`CodeBuilder`] answers the questions an editor asks while a user
//! builds an expression: which operators fit a criterion, which
//! expressions may fill a slot of a given type, how a fresh node of some
//! kind is created, and which fields exist. It never owns the tree; the
//! caller edits its tree and reports each edit through
//! [`CodeBuilder::raise_change`].

use std::cell::OnceCell;
use std::fmt;

use serde::Deserialize;

use crate::ast::{ChooseOperation, Criterion, Expr, ExprKind, NestedField, OpId, TypeName};
use crate::fields::{FieldTreeNode, create_sorted_field_tree};
use crate::registry::Registry;
use crate::serializer::copy_expr;

/// Operator with the label an editor shows for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UfOperator {
    pub id: OpId,
    pub uf_name: String,
}

impl UfOperator {
    pub fn new(id: OpId, uf_name: impl Into<String>) -> Self {
        UfOperator {
            id,
            uf_name: uf_name.into(),
        }
    }
}

fn operators_for_bit(bit: TypeName) -> &'static [(OpId, &'static str)] {
    match bit {
        TypeName::BOOLEAN => &[
            (OpId::Eq, "is equal to"),
            (OpId::Ne, "is not equal to"),
            (OpId::NotNull, "is set"),
            (OpId::Null, "is not set"),
        ],
        TypeName::ARRAY => &[
            (OpId::HasAll, "all are like"),
            (OpId::HasAny, "some are like"),
            (OpId::HasNone, "none are like"),
            (OpId::NotNull, "is set"),
            (OpId::Null, "is not set"),
        ],
        TypeName::OBJECT => &[(OpId::NotNull, "is set"), (OpId::Null, "is not set")],
        TypeName::DATE => &[
            (OpId::Eq, "is on"),
            (OpId::Ne, "is not on"),
            (OpId::Gt, "is after"),
            (OpId::Gte, "is on or after"),
            (OpId::Lt, "is before"),
            (OpId::Lte, "is on or before"),
            (OpId::In, "is any of"),
            (OpId::NotNull, "is set"),
            (OpId::Null, "is not set"),
        ],
        TypeName::STRING => &[
            (OpId::In, "is any of"),
            (OpId::Eq, "is same as"),
            (OpId::Ne, "is not same as"),
            (OpId::Like, "contains text"),
            (OpId::Gt, "is alphabetically after"),
            (OpId::Gte, "is same or alphabetically after"),
            (OpId::Lt, "is alphabetically before"),
            (OpId::Lte, "is same or alphabetically before"),
            (OpId::NotNull, "is set"),
            (OpId::Null, "is not set"),
        ],
        TypeName::NUMBER => &[
            (OpId::Eq, "is same as"),
            (OpId::Ne, "is not same as"),
            (OpId::Gt, "is greater than"),
            (OpId::Gte, "is equal or greater than"),
            (OpId::Lt, "is less than"),
            (OpId::Lte, "is equal or less than"),
            (OpId::In, "is any of"),
            (OpId::NotNull, "is set"),
            (OpId::Null, "is not set"),
        ],
        _ => &[],
    }
}

/// Operators for every type bit set in `type_name`, first label wins.
///
/// # Examples
///
/// ```
/// use codebuilder::builder::default_type_operators;
/// use codebuilder::{OpId, TypeName};
///
/// let ops = default_type_operators(TypeName::BOOLEAN);
/// assert_eq!(ops[0].id, OpId::Eq);
/// assert_eq!(ops[0].uf_name, "is equal to");
///
/// // `is set` appears once even though both types offer it
/// let ops = default_type_operators(TypeName::OBJECT | TypeName::BOOLEAN);
/// assert_eq!(ops.iter().filter(|o| o.uf_name == "is set").count(), 1);
/// ```
pub fn default_type_operators(type_name: TypeName) -> Vec<UfOperator> {
    let mut result: Vec<UfOperator> = Vec::new();
    for bit in TypeName::ALL {
        if !type_name.contains(bit) {
            continue;
        }
        for (id, label) in operators_for_bit(bit) {
            if !result.iter().any(|o| o.uf_name == *label) {
                result.push(UfOperator::new(*id, *label));
            }
        }
    }
    result
}

/// Operators whose right operand has the same shape; switching within a
/// group keeps the right operand.
fn operator_group(op: OpId) -> u8 {
    match op {
        OpId::Null | OpId::NotNull => 0,
        OpId::In => 1,
        OpId::HasAny | OpId::HasAll | OpId::HasNone => 2,
        _ => 3,
    }
}

/// Expression kind with its editor label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UfExpression {
    pub kind: ExprKind,
    pub uf_name: String,
}

pub fn default_expr_types() -> Vec<UfExpression> {
    [
        (ExprKind::Criterion, "Rule"),
        (ExprKind::CriteriaGroup, "Group"),
        (ExprKind::NestedField, "Field Data"),
        (ExprKind::Parameter, "Static Value"),
        (ExprKind::If, "If, Then, Else"),
    ]
    .into_iter()
    .map(|(kind, uf_name)| UfExpression {
        kind,
        uf_name: uf_name.to_string(),
    })
    .collect()
}

/// Positional parameter of a catalog operation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperationParam {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<TypeName>,
    /// Name of a custom editor to use for this slot
    pub editor: Option<String>,
}

/// Initial content of an operand slot in a freshly created operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperandTemplate {
    /// Created through the expression factory
    Kind(ExprKind),
    /// Cloned as-is
    Expr(Expr),
}

/// Entry of the operation catalog.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperationConfig {
    pub name: String,
    pub uf_name: Option<String>,
    pub description: Option<String>,
    pub parameters: Vec<OperationParam>,
    pub return_type: TypeName,
    #[serde(skip)]
    pub default_operands: Option<Vec<OperandTemplate>>,
    pub layout_vertically: bool,
}

impl OperationConfig {
    pub fn new(name: impl Into<String>, return_type: TypeName) -> Self {
        OperationConfig {
            name: name.into(),
            return_type,
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, param: OperationParam) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_default_operands(mut self, operands: Vec<OperandTemplate>) -> Self {
        self.default_operands = Some(operands);
        self
    }
}

/// Answer of a default-expression factory.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultExpr {
    /// Build the kind's zero-argument form
    UseDefault,
    /// Create nothing
    Decline,
    Provide(Expr),
}

/// Answer of an expression-options override.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsOverride {
    UseDefault,
    /// Offer no options at all
    Empty,
    List(Vec<ExprOption>),
}

/// What an [`ExprOption`] creates when picked.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionSource {
    Kind(ExprKind),
    /// Catalog operation, by name
    Operation(String),
    Custom(Expr),
}

/// Entry of the "what can go here" list shown for an empty slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprOption {
    pub name: String,
    pub uf_name: Option<String>,
    pub description: Option<String>,
    pub known_type: bool,
    pub source: OptionSource,
}

impl ExprOption {
    fn known(name: &str, kind: ExprKind) -> Self {
        ExprOption {
            name: name.to_string(),
            uf_name: None,
            description: None,
            known_type: true,
            source: OptionSource::Kind(kind),
        }
    }

    pub fn custom(name: impl Into<String>, expr: Expr) -> Self {
        ExprOption {
            name: name.into(),
            uf_name: None,
            description: None,
            known_type: false,
            source: OptionSource::Custom(expr),
        }
    }
}

pub type TypeOperatorProvider = Box<dyn Fn(TypeName) -> Vec<UfOperator>>;
pub type ExprFactory = Box<dyn Fn(ExprKind, Option<&Expr>, Option<&OperationConfig>) -> DefaultExpr>;
pub type ExprOptionsProvider =
    Box<dyn Fn(Option<&Expr>, TypeName, Option<&OperationParam>) -> OptionsOverride>;
pub type ChangeCallback = Box<dyn FnMut(Option<&Expr>)>;

pub struct BuilderConfig {
    pub fields: Vec<NestedField>,
    pub type_operators: TypeOperatorProvider,
    pub expr_types: Vec<UfExpression>,
    pub create_default_expr: Option<ExprFactory>,
    pub operations: Vec<OperationConfig>,
    pub expr_options: Option<ExprOptionsProvider>,
    pub view_only: bool,
    pub on_change: Option<ChangeCallback>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        BuilderConfig {
            fields: Vec::new(),
            type_operators: Box::new(default_type_operators),
            expr_types: default_expr_types(),
            create_default_expr: None,
            operations: Vec::new(),
            expr_options: None,
            view_only: false,
            on_change: None,
        }
    }
}

impl fmt::Debug for BuilderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderConfig")
            .field("fields", &self.fields)
            .field("expr_types", &self.expr_types)
            .field("operations", &self.operations)
            .field("view_only", &self.view_only)
            .field("has_factory", &self.create_default_expr.is_some())
            .field("has_on_change", &self.on_change.is_some())
            .finish()
    }
}

impl BuilderConfig {
    pub fn new(fields: Vec<NestedField>) -> Self {
        BuilderConfig {
            fields,
            ..Default::default()
        }
    }

    pub fn with_operations(mut self, operations: Vec<OperationConfig>) -> Self {
        self.operations = operations;
        self
    }

    pub fn with_type_operators(mut self, provider: impl Fn(TypeName) -> Vec<UfOperator> + 'static) -> Self {
        self.type_operators = Box::new(provider);
        self
    }

    pub fn with_factory(
        mut self,
        factory: impl Fn(ExprKind, Option<&Expr>, Option<&OperationConfig>) -> DefaultExpr + 'static,
    ) -> Self {
        self.create_default_expr = Some(Box::new(factory));
        self
    }

    pub fn with_expr_options(
        mut self,
        provider: impl Fn(Option<&Expr>, TypeName, Option<&OperationParam>) -> OptionsOverride + 'static,
    ) -> Self {
        self.expr_options = Some(Box::new(provider));
        self
    }

    pub fn on_change(mut self, callback: impl FnMut(Option<&Expr>) + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn view_only(mut self, view_only: bool) -> Self {
        self.view_only = view_only;
        self
    }
}

#[derive(Debug)]
pub struct CodeBuilder {
    config: BuilderConfig,
    nested_fields: Vec<NestedField>,
    field_tree: OnceCell<Vec<FieldTreeNode>>,
}

impl CodeBuilder {
    pub fn new(mut config: BuilderConfig) -> Self {
        let nested_fields = std::mem::take(&mut config.fields);
        CodeBuilder {
            config,
            nested_fields,
            field_tree: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn view_only(&self) -> bool {
        self.config.view_only
    }

    /// Operators offered for `criterion`, chosen by the left operand's type,
    /// else the right operand's, else those for objects.
    pub fn uf_operators(&self, criterion: &Criterion) -> Vec<UfOperator> {
        let known = |expr: Option<&Expr>| self.expr_value_type(expr).filter(|t| !t.is_any());
        let type_name = known(criterion.left())
            .or_else(|| known(criterion.right()))
            .unwrap_or(TypeName::OBJECT);
        (self.config.type_operators)(type_name)
    }

    /// The offered operator matching the one set on `criterion`.
    pub fn uf_operator(&self, criterion: &Criterion) -> Option<UfOperator> {
        let operator = criterion.operator?;
        self.uf_operators(criterion).into_iter().find(|o| o.id == operator)
    }

    /// Editor label of `kind`.
    pub fn expr_type_label(&self, kind: ExprKind) -> Option<&str> {
        self.config
            .expr_types
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| t.uf_name.as_str())
    }

    /// Value type of `expr`; operations take their catalog return type.
    pub fn expr_value_type(&self, expr: Option<&Expr>) -> Option<TypeName> {
        let expr = expr?;
        expr.value_type().or_else(|| {
            let op = expr.as_operation()?;
            self.operation_config(&op.name).map(|c| c.return_type)
        })
    }

    /// Case-insensitive catalog lookup.
    pub fn operation_config(&self, name: &str) -> Option<&OperationConfig> {
        let name = name.to_lowercase();
        self.config
            .operations
            .iter()
            .find(|o| o.name.to_lowercase() == name)
    }

    /// A fresh node of `kind`, unless the factory declines.
    pub fn create_default_expr(
        &self,
        kind: ExprKind,
        parent: Option<&Expr>,
        config: Option<&OperationConfig>,
    ) -> Option<Expr> {
        let answer = match &self.config.create_default_expr {
            Some(factory) => factory(kind, parent, config),
            None => DefaultExpr::UseDefault,
        };
        match answer {
            DefaultExpr::UseDefault => Some(kind.create_default()),
            DefaultExpr::Decline => None,
            DefaultExpr::Provide(expr) => Some(expr),
        }
    }

    /// Creates the catalog operation `config`, filling its default operands.
    ///
    /// # Panics
    ///
    /// Panics if the factory declines or hands back something other than an
    /// operation: an operation must always be creatable.
    pub fn create_operation(&self, config: &OperationConfig, parent: Option<&Expr>) -> Expr {
        let created = self
            .create_default_expr(ExprKind::Operation, parent, Some(config))
            .unwrap_or_else(|| {
                panic!(
                    "expression factory declined to create operation `{}`; answer UseDefault instead of Decline",
                    config.name
                )
            });
        let Some(mut op) = created.into_operation() else {
            panic!(
                "expression factory returned a non-operation for `{}`",
                config.name
            );
        };
        op.name = config.name.clone();

        if let Some(templates) = &config.default_operands {
            let parent = Expr::Operation(op.clone());
            op.operands = templates
                .iter()
                .map(|template| match template {
                    OperandTemplate::Kind(kind) => self.create_default_expr(*kind, Some(&parent), None),
                    OperandTemplate::Expr(expr) => Some(expr.clone()),
                })
                .collect();
        }

        op.specialize()
    }

    /// What may fill a slot expecting `type_name` (any type when `None`).
    pub fn expr_options(
        &self,
        parent: Option<&Expr>,
        type_name: Option<TypeName>,
        param: Option<&OperationParam>,
    ) -> Vec<ExprOption> {
        let type_name = type_name.unwrap_or(TypeName::ANY);
        let answer = match &self.config.expr_options {
            Some(provider) => provider(parent, type_name, param),
            None => OptionsOverride::UseDefault,
        };
        match answer {
            OptionsOverride::UseDefault => self.default_expr_options(type_name),
            OptionsOverride::Empty => Vec::new(),
            OptionsOverride::List(options) => options,
        }
    }

    /// Known expression kinds compatible with `type_name`, then compatible
    /// catalog operations.
    pub fn default_expr_options(&self, type_name: TypeName) -> Vec<ExprOption> {
        let compatible = |produced: TypeName| produced.contains(type_name) || produced.is_any();
        let registry = Registry::global();

        let mut result: Vec<ExprOption> = Vec::new();
        for kind in registry.kinds() {
            if !compatible(registry.type_of(kind)) {
                continue;
            }
            if let Some(option) = known_option(kind) {
                result.insert(0, option);
            }
        }

        result.extend(
            self.config
                .operations
                .iter()
                .filter(|o| compatible(o.return_type))
                .map(|o| ExprOption {
                    name: o.name.clone(),
                    uf_name: o.uf_name.clone(),
                    description: o.description.clone(),
                    known_type: false,
                    source: OptionSource::Operation(o.name.clone()),
                }),
        );
        result
    }

    /// Materializes a picked option.
    pub fn create_from_option(&self, option: &ExprOption, parent: Option<&Expr>) -> Option<Expr> {
        match &option.source {
            OptionSource::Kind(kind) => self.create_default_expr(*kind, parent, None),
            OptionSource::Operation(name) => match self.operation_config(name) {
                Some(config) => Some(self.create_operation(config, parent)),
                None => {
                    tracing::warn!(operation = name.as_str(), "option names an unknown operation");
                    None
                }
            },
            OptionSource::Custom(expr) => Some(expr.clone()),
        }
    }

    /// The sorted field forest, built on first use.
    pub fn fields(&self) -> &[FieldTreeNode] {
        self.field_tree
            .get_or_init(|| create_sorted_field_tree(&self.nested_fields))
    }

    pub fn set_fields(&mut self, fields: Vec<NestedField>) {
        self.field_tree = OnceCell::from(create_sorted_field_tree(&fields));
        self.nested_fields = fields;
    }

    pub fn nested_fields(&self) -> &[NestedField] {
        &self.nested_fields
    }

    /// Fields strictly below `scope`, re-rooted there, as a sorted forest.
    pub fn scoped_fields<S: AsRef<str>>(&self, scope: &[S]) -> Vec<FieldTreeNode> {
        let scoped: Vec<NestedField> = self
            .nested_fields
            .iter()
            .filter_map(|field| field.try_scope(scope))
            .filter(|field| !field.path.is_empty())
            .collect();
        create_sorted_field_tree(&scoped)
    }

    /// Condition and result for a new `choose` branch: a copy of the last
    /// condition, or a fresh rule when there is none.
    pub fn next_choose_branch(&self, choose: &ChooseOperation) -> (Option<Expr>, Option<Expr>) {
        let parent = Expr::Choose(choose.clone());
        let operands = &choose.operation().operands;
        let condition = if operands.len() > 1 {
            operands[operands.len() - 2]
                .as_ref()
                .map(|last| match copy_expr(last) {
                    Ok(copy) => copy,
                    Err(err) => {
                        tracing::warn!(%err, "choose condition did not round-trip; cloning");
                        last.clone()
                    }
                })
        } else {
            self.create_default_expr(ExprKind::Criterion, Some(&parent), None)
        };
        let result = self.create_default_expr(ExprKind::Parameter, Some(&parent), None);
        (condition, result)
    }

    /// Replaces the left operand; a change of value type invalidates the
    /// operator and right operand.
    pub fn set_left_operand(&self, criterion: &mut Criterion, operand: Option<Expr>) {
        let previous = criterion.left().and_then(Expr::value_type);
        let next = operand.as_ref().and_then(Expr::value_type);
        criterion.left_operand = operand.map(Box::new);
        if previous != next {
            criterion.operator = None;
            criterion.right_operand = None;
        }
    }

    /// Sets the operator, replacing the right operand when its expected
    /// shape changes: a group for `Has*`, a parameter otherwise.
    pub fn set_operator(&self, criterion: &mut Criterion, operator: OpId) {
        let previous = criterion.operator.map(operator_group);
        criterion.operator = Some(operator);
        if previous != Some(operator_group(operator)) {
            let parent = Expr::Criterion(criterion.clone());
            let kind = if operator.is_scope() {
                ExprKind::CriteriaGroup
            } else {
                ExprKind::Parameter
            };
            criterion.right_operand = self
                .create_default_expr(kind, Some(&parent), None)
                .map(Box::new);
        }
    }

    /// Reports an edit to the change callback, if one is set.
    pub fn raise_change(&mut self, expr: Option<&Expr>) {
        if let Some(on_change) = self.config.on_change.as_mut() {
            on_change(expr);
        }
    }
}

fn known_option(kind: ExprKind) -> Option<ExprOption> {
    let name = match kind {
        ExprKind::Criterion => "Rule",
        ExprKind::CriteriaGroup => "Rule Group",
        ExprKind::If => "If-then-else",
        ExprKind::NestedField => "Field Value",
        ExprKind::Parameter => "Static Value",
        ExprKind::Choose => "Choose",
        ExprKind::Empty | ExprKind::Operation => return None,
    };
    Some(ExprOption::known(name, kind))
}

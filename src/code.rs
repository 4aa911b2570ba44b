//! C#-style code generation.
//!
//! The target language has no expression-level branching, so `if` and
//! `choose` found in value position are hoisted: a fresh `valueN` variable
//! is declared and assigned by an `if`/`else` chain placed before the
//! enclosing statement, and the value position becomes a reference to the
//! variable.
//!
//! ```text
//! dynamic value1 = null;
//! if (status == "open")
//! {
//!     value1 = "1";
//! }
//! else
//! {
//!     value1 = "2";
//! }
//! return value1;
//! ```
//!
//! Statement boundaries are the root `return` and every branch body. Each
//! boundary opens its own list of hoisted statements, emitted right before
//! the boundary's own statement. Hoists from non-statement positions (a
//! criterion operand, a call argument) land in the nearest enclosing
//! boundary.

use std::collections::HashMap;

use crate::ast::{
    ChooseOperation, Connector, CriteriaGroup, Criterion, Expr, IfOperation, NestedField, OpId,
    Operation, Parameter,
};
use crate::builder::OperationConfig;
use crate::value::Value;
use crate::visitor::{Visitor, dispatch};

/// Rendered in place of anything that cannot be compiled.
pub const INVALID: &str = "[Invalid]";

/// Receives each emitted token together with the node that produced it.
pub type TokenSink<'a> = Box<dyn FnMut(&str, Option<&'a Expr>) + 'a>;

#[derive(Debug, Clone)]
pub struct CodeOptions {
    /// Namespace qualifying the built-in aggregate calls
    pub utils_namespace: String,
    /// Extra `operation name -> qualified call` mappings, keyed lowercase
    pub functions: HashMap<String, String>,
}

impl Default for CodeOptions {
    fn default() -> Self {
        CodeOptions {
            utils_namespace: "Utils".to_string(),
            functions: HashMap::new(),
        }
    }
}

impl CodeOptions {
    pub fn with_function(mut self, name: &str, qualified: impl Into<String>) -> Self {
        self.functions.insert(name.to_lowercase(), qualified.into());
        self
    }

    /// Maps every catalog operation without a built-in rendering to
    /// `<namespace>.<Name>`.
    pub fn with_operations(mut self, operations: &[OperationConfig]) -> Self {
        for op in operations {
            let key = op.name.to_lowercase();
            if builtin_function(&key).is_some() || self.functions.contains_key(&key) {
                continue;
            }
            let qualified = format!("{}.{}", self.utils_namespace, pascal_case(&op.name));
            self.functions.insert(key, qualified);
        }
        self
    }
}

fn builtin_function(name: &str) -> Option<&'static str> {
    Some(match name {
        "sum" => "Sum",
        "avg" => "Average",
        "min" => "Min",
        "max" => "Max",
        "round" => "Round",
        _ => return None,
    })
}

fn pascal_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn comparison_symbol(op: OpId) -> Option<&'static str> {
    Some(match op {
        OpId::Gte => ">=",
        OpId::Gt => ">",
        OpId::Lte => "<=",
        OpId::Lt => "<",
        OpId::Ne => "!=",
        OpId::Eq => "==",
        _ => return None,
    })
}

pub struct CodeVisitor<'a> {
    options: CodeOptions,
    indentation: usize,
    /// Innermost last; `true` at statement boundaries
    imperative: Vec<bool>,
    /// One pending statement list per open statement boundary
    hoisted: Vec<Vec<String>>,
    var_count: usize,
    sources: Vec<&'a Expr>,
    on_token: Option<TokenSink<'a>>,
}

impl<'a> CodeVisitor<'a> {
    pub fn new(options: CodeOptions) -> Self {
        CodeVisitor {
            options,
            indentation: 0,
            imperative: Vec::new(),
            hoisted: Vec::new(),
            var_count: 0,
            sources: Vec::new(),
            on_token: None,
        }
    }

    pub fn with_token_sink(mut self, sink: impl FnMut(&str, Option<&'a Expr>) + 'a) -> Self {
        self.on_token = Some(Box::new(sink));
        self
    }

    /// Renders `root` as a statement block ending in `return <value>;`.
    #[tracing::instrument(skip_all)]
    pub fn compile(&mut self, root: Option<&'a Expr>) -> String {
        self.visit_imperative(root, |v, node| format!("{} {};", v.token("return", None), node))
    }

    fn imperative_allowed(&self) -> bool {
        self.imperative.last().copied().unwrap_or(false)
    }

    fn current(&self) -> Option<&'a Expr> {
        self.sources.last().copied()
    }

    fn token(&mut self, text: &str, source: Option<&'a Expr>) -> String {
        if let Some(sink) = self.on_token.as_mut() {
            sink(text, source);
        }
        text.to_string()
    }

    fn invalid(&mut self) -> String {
        self.token(INVALID, None)
    }

    fn newline(&self) -> String {
        format!("\n{}", "    ".repeat(self.indentation))
    }

    fn create_var(&mut self) -> String {
        self.var_count += 1;
        format!("value{}", self.var_count)
    }

    fn hoist(&mut self, statement: String) {
        match self.hoisted.last_mut() {
            Some(pending) => pending.push(statement),
            None => tracing::warn!("hoisted statement outside a statement boundary dropped"),
        }
    }

    fn visit_non_imperative(&mut self, expr: Option<&'a Expr>) -> String {
        self.imperative.push(false);
        let result = self.visit(expr);
        self.imperative.pop();
        result
    }

    /// Visits `expr` as a statement boundary; `statement` wraps the value.
    fn visit_imperative(
        &mut self,
        expr: Option<&'a Expr>,
        statement: impl FnOnce(&mut Self, String) -> String,
    ) -> String {
        self.imperative.push(true);
        self.hoisted.push(Vec::new());
        let node = self.visit(expr);
        let hoisted = self.hoisted.pop().unwrap_or_default().concat();
        let result = hoisted + &statement(self, node);
        self.imperative.pop();
        result
    }

    fn visit_or_invalid(&mut self, expr: Option<&'a Expr>) -> String {
        match expr {
            Some(_) => self.visit(expr),
            None => self.invalid(),
        }
    }

    fn curly_brackets(&mut self, body: impl FnOnce(&mut Self) -> String) -> String {
        let open = format!("{}{{", self.newline());
        self.indentation += 1;
        let inner = self.newline() + &body(self);
        self.indentation -= 1;
        let close = format!("{}}}", self.newline());
        format!("{}{}{}{}", open, inner, close, self.newline())
    }

    fn assign(var: &str) -> impl FnOnce(&mut Self, String) -> String + '_ {
        move |_, node| format!("{} = {};", var, node)
    }

    fn render_if(&mut self, op: &'a Operation) -> String {
        let var = self.create_var();
        let source = self.current();
        tracing::debug!(var = var.as_str(), in_statement = self.imperative_allowed(), "hoisting if");

        let mut statement = format!("{} {} = null;", self.token("dynamic", source), var);
        statement += &self.newline();
        let condition = self.visit_non_imperative(op.operand(0));
        statement += &format!("{} ({})", self.token("if", source), condition);
        statement += &self.curly_brackets(|v| v.visit_imperative(op.operand(1), Self::assign(&var)));
        statement += &self.token("else", source);
        statement += &self.curly_brackets(|v| v.visit_imperative(op.operand(2), Self::assign(&var)));

        self.hoist(statement);
        var
    }

    fn render_choose(&mut self, op: &'a Operation) -> String {
        let var = self.create_var();
        let source = self.current();
        tracing::debug!(var = var.as_str(), in_statement = self.imperative_allowed(), "hoisting choose");

        let mut statement = format!("{} {} = null;", self.token("dynamic", source), var);
        statement += &self.newline();
        for i in (0..op.operands.len()).step_by(2) {
            let keyword = if i == 0 { "if" } else { "else if" };
            let keyword = self.token(keyword, source);
            let condition = self.visit_non_imperative(op.operand(i));
            statement += &format!("{} ({})", keyword, condition);
            statement +=
                &self.curly_brackets(|v| v.visit_imperative(op.operand(i + 1), Self::assign(&var)));
        }

        self.hoist(statement);
        var
    }

    fn function_name(&self, name: &str) -> Option<String> {
        if let Some(builtin) = builtin_function(name) {
            return Some(format!("{}.{}", self.options.utils_namespace, builtin));
        }
        self.options.functions.get(&name.to_lowercase()).cloned()
    }

    fn render_call(&mut self, op: &'a Operation) -> String {
        let source = self.current();
        let params: Vec<String> = op
            .operands
            .iter()
            .map(|operand| self.visit_non_imperative(operand.as_ref()))
            .collect();
        match self.function_name(&op.name) {
            Some(name) => format!("{}({})", self.token(&name, source), params.join(", ")),
            None => self.invalid(),
        }
    }

    fn literal(&mut self, value: &Value, source: Option<&'a Expr>) -> String {
        self.token(&format!("\"{}\"", value.as_string()), source)
    }
}

impl<'a> Visitor<'a> for CodeVisitor<'a> {
    type Output = String;

    fn visit(&mut self, expr: Option<&'a Expr>) -> String {
        if let Some(expr) = expr {
            self.sources.push(expr);
        }
        let result = dispatch(self, expr);
        if expr.is_some() {
            self.sources.pop();
        }
        result
    }

    fn visit_empty(&mut self) -> String {
        self.invalid()
    }

    fn visit_criteria_group(&mut self, group: &'a CriteriaGroup) -> String {
        let negator = if group.negate { "!" } else { "" };
        let connector = match group.connector {
            Connector::And => "&&",
            Connector::Or => "||",
        };
        let use_parens = group.criteria.len() > 1 || group.negate;

        self.indentation += 1;
        let mut items = String::new();
        for (i, criterion) in group.criteria.iter().enumerate() {
            let item = self.visit_non_imperative(Some(criterion));
            if i > 0 {
                items += &format!("{} {} {}", self.newline(), connector, item);
            } else {
                items += &item;
            }
        }
        self.indentation -= 1;

        if use_parens {
            format!("{}({})", negator, items)
        } else {
            items
        }
    }

    fn visit_criterion(&mut self, criterion: &'a Criterion) -> String {
        let source = self.current();
        let Some(operator) = criterion.operator else {
            return self.invalid();
        };
        let left = self.visit_or_invalid(criterion.left());
        let right = match criterion.right() {
            Some(right) if !operator.is_unary() => self.visit(Some(right)),
            _ => self.invalid(),
        };

        if let Some(symbol) = comparison_symbol(operator) {
            return format!("{}{}{}", left, self.token(&format!(" {} ", symbol), source), right);
        }

        match operator {
            OpId::Like => format!("{}.{}({})", left, self.token("Contains", source), right),
            OpId::In => format!("{}.{}({})", right, self.token("Contains", source), left),
            OpId::Null => format!("{}{}", left, self.token(" == null", source)),
            OpId::NotNull => format!("{}{}", left, self.token(" != null", source)),
            _ => self.invalid(),
        }
    }

    fn visit_nested_field(&mut self, field: &'a NestedField) -> String {
        let source = self.current();
        self.token(&field.full_name(), source)
    }

    fn visit_parameter(&mut self, param: &'a Parameter) -> String {
        let source = self.current();
        match &param.value {
            Value::Array(items) => {
                let items: Vec<String> = items.iter().map(|item| self.literal(item, source)).collect();
                format!("new[] {{ {} }}", items.join(", "))
            }
            value => self.literal(value, source),
        }
    }

    fn visit_operation(&mut self, op: &'a Operation) -> String {
        match op.name.as_str() {
            "filter" => self.visit(op.operand(0)),
            "if" => self.render_if(op),
            "choose" => self.render_choose(op),
            _ => self.render_call(op),
        }
    }

    fn visit_if(&mut self, op: &'a IfOperation) -> String {
        self.render_if(op.operation())
    }

    fn visit_choose(&mut self, op: &'a ChooseOperation) -> String {
        self.render_choose(op.operation())
    }

    fn visit_null(&mut self) -> String {
        self.invalid()
    }
}

/// Compiles `root` with default options.
///
/// # Examples
///
/// ```
/// use codebuilder::{Criterion, Expr, NestedField, OpId, Parameter, TypeName};
///
/// let rule: Expr = Criterion::new(
///     NestedField::new(["total"], TypeName::NUMBER),
///     OpId::Gt,
///     Parameter::literal(10i64),
/// )
/// .into();
///
/// assert_eq!(codebuilder::code::compile(Some(&rule)), "return total > \"10\";");
/// ```
pub fn compile(root: Option<&Expr>) -> String {
    CodeVisitor::new(CodeOptions::default()).compile(root)
}

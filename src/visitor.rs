//! Double-dispatch contract shared by every tree compiler.
//!
//! [`dispatch`] matches the runtime variant of a node and calls the
//! matching `visit_*` method. `If` and `Choose` are checked before the
//! generic operation case; by default they fall back to
//! [`Visitor::visit_operation`] with the underlying operation, so a
//! compiler that does not care about branching only implements the base
//! case.

use crate::ast::{
    ChooseOperation, CriteriaGroup, Criterion, Expr, IfOperation, NestedField, Operation,
    Parameter,
};

pub trait Visitor<'a> {
    type Output;

    /// Entry point for every recursive visit.
    ///
    /// Compilers that need to observe each node (for source tracking, say)
    /// override this and call [`dispatch`] themselves.
    fn visit(&mut self, expr: Option<&'a Expr>) -> Self::Output {
        dispatch(self, expr)
    }

    fn visit_empty(&mut self) -> Self::Output;
    fn visit_criteria_group(&mut self, group: &'a CriteriaGroup) -> Self::Output;
    fn visit_criterion(&mut self, criterion: &'a Criterion) -> Self::Output;
    fn visit_nested_field(&mut self, field: &'a NestedField) -> Self::Output;
    fn visit_parameter(&mut self, param: &'a Parameter) -> Self::Output;
    fn visit_operation(&mut self, op: &'a Operation) -> Self::Output;

    /// Absent node: an unset operand, a missing criterion side or no root.
    fn visit_null(&mut self) -> Self::Output;

    fn visit_if(&mut self, op: &'a IfOperation) -> Self::Output {
        self.visit_operation(op.operation())
    }

    fn visit_choose(&mut self, op: &'a ChooseOperation) -> Self::Output {
        self.visit_operation(op.operation())
    }
}

/// Calls the `visit_*` method for the variant of `expr`.
pub fn dispatch<'a, V>(visitor: &mut V, expr: Option<&'a Expr>) -> V::Output
where
    V: Visitor<'a> + ?Sized,
{
    match expr {
        None => visitor.visit_null(),
        Some(Expr::Empty) => visitor.visit_empty(),
        Some(Expr::CriteriaGroup(group)) => visitor.visit_criteria_group(group),
        Some(Expr::Criterion(criterion)) => visitor.visit_criterion(criterion),
        Some(Expr::NestedField(field)) => visitor.visit_nested_field(field),
        Some(Expr::Parameter(param)) => visitor.visit_parameter(param),
        Some(Expr::If(op)) => visitor.visit_if(op),
        Some(Expr::Choose(op)) => visitor.visit_choose(op),
        Some(Expr::Operation(op)) => visitor.visit_operation(op),
    }
}

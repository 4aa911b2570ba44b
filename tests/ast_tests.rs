use codebuilder::{
    ChooseOperation, Connector, CriteriaGroup, Criterion, Expr, ExprKind, IfOperation,
    NestedField, OpId, Operation, Parameter, TypeName, Value,
};

fn field(path: &[&str], type_name: TypeName) -> NestedField {
    NestedField::new(path.iter().copied(), type_name)
}

fn rule(name: &str, value: &str) -> Criterion {
    Criterion::new(
        field(&[name], TypeName::STRING),
        OpId::Eq,
        Parameter::literal(value),
    )
}

#[test]
fn test_type_matching_uses_shared_bits() {
    let declared = TypeName::STRING | TypeName::NUMBER;

    assert!(declared.matches(TypeName::STRING));
    assert!(declared.matches(TypeName::NUMBER | TypeName::DATE));
    assert!(!declared.matches(TypeName::BOOLEAN));
}

#[test]
fn test_any_type_is_a_wildcard() {
    assert!(TypeName::ANY.matches(TypeName::DATE));
    assert!(TypeName::OBJECT.matches(TypeName::ANY));
    assert!(TypeName::ANY.is_any());
}

#[test]
fn test_type_merge_prefers_non_null() {
    assert_eq!(TypeName::NULL.merge(TypeName::STRING), TypeName::STRING);
    assert_eq!(TypeName::NUMBER.merge(TypeName::NULL), TypeName::NUMBER);
    assert_eq!(
        TypeName::NUMBER.merge(TypeName::STRING),
        TypeName::NUMBER | TypeName::STRING
    );
}

#[test]
fn test_type_display() {
    assert_eq!(TypeName::DATE.to_string(), "date");
    assert_eq!((TypeName::STRING | TypeName::NUMBER).to_string(), "string | number");
}

#[test]
fn test_type_from_bits_rejects_unknown_bits() {
    assert_eq!(TypeName::from_bits(32), Some(TypeName::STRING));
    assert_eq!(TypeName::from_bits(128), None);
}

#[test]
fn test_field_names() {
    let amount = field(&["orders", "amount"], TypeName::NUMBER);

    assert_eq!(amount.name(), "amount");
    assert_eq!(amount.full_name(), "orders.amount");
    assert_eq!(NestedField::default().name(), "None");
}

#[test]
fn test_try_scope_rebases_under_prefix() {
    let amount = field(&["orders", "amount"], TypeName::NUMBER);
    let scoped = amount.try_scope(&["orders"]).unwrap();

    assert_eq!(scoped.path, vec!["amount"]);
    assert!(scoped.scoped);
    assert_eq!(scoped.type_name, TypeName::NUMBER);
}

#[test]
fn test_try_scope_outside_prefix() {
    let name = field(&["name"], TypeName::STRING);
    assert!(name.try_scope(&["orders"]).is_none());
}

#[test]
fn test_try_scope_requires_separator() {
    // "ordersArchive" shares a text prefix with "orders" but is not below it
    let archived = field(&["ordersArchive", "amount"], TypeName::NUMBER);
    assert!(archived.try_scope(&["orders"]).is_none());
    assert!(!archived.is_under(&["orders"]));
}

#[test]
fn test_try_scope_compares_segments() {
    // a single segment holding a dot is not two prefix segments
    let dotted = field(&["a.b"], TypeName::NUMBER);
    assert!(!dotted.is_under(&["a", "b"]));
    assert!(dotted.try_scope(&["a", "b"]).is_none());

    let nested = field(&["a", "b.c"], TypeName::NUMBER);
    assert!(nested.try_scope(&["a", "b"]).is_none());

    let scoped = nested.try_scope(&["a"]).unwrap();
    assert_eq!(scoped.path, vec!["b.c"]);
    assert_eq!(dotted.try_scope(&["a.b"]).map(|f| f.path.len()), Some(0));
}

#[test]
fn test_field_copy_is_independent() {
    let original = field(&["a", "b"], TypeName::STRING);
    let mut copy = original.clone();
    copy.path.push("c".to_string());

    assert_eq!(original.full_name(), "a.b");
    assert_eq!(copy.full_name(), "a.b.c");
}

#[test]
fn test_set_operand_backfills_unset_slots() {
    let mut op = Operation::new("sum", vec![]);
    op.set_operand(2, Some(Parameter::literal(1i64).into()));

    assert_eq!(op.operands.len(), 3);
    assert_eq!(op.operands[0], None);
    assert_eq!(op.operands[1], None);
    assert!(op.operand(2).is_some());
}

#[test]
fn test_set_operand_replaces_existing_slot() {
    let mut op = Operation::new("sum", vec![Some(Expr::Empty)]);
    op.set_operand(0, Some(Parameter::literal("x").into()));

    assert_eq!(op.operands.len(), 1);
    assert_eq!(op.operand(0).map(Expr::kind), Some(ExprKind::Parameter));
}

#[test]
fn test_if_accessors_share_operands() {
    let mut branch = IfOperation::with_branches(rule("status", "open"), Parameter::literal("1"), Parameter::literal("2"));

    assert_eq!(branch.operation().operands.len(), 3);
    assert_eq!(branch.condition().map(Expr::kind), Some(ExprKind::Criterion));

    branch.set_if_false(None);
    assert_eq!(branch.if_false(), None);
    assert_eq!(branch.operation().operands[2], None);
}

#[test]
fn test_choose_branches_in_pairs() {
    let mut choose = ChooseOperation::new();
    choose.add_branch(Some(rule("a", "1").into()), Some(Parameter::literal("x").into()));
    choose.add_branch(Some(rule("b", "2").into()), Some(Parameter::literal("y").into()));

    assert_eq!(choose.branches().count(), 2);

    choose.remove_branch(0);
    let branches: Vec<_> = choose.branches().collect();
    assert_eq!(branches.len(), 1);
    match branches[0].1 {
        Some(Expr::Parameter(p)) => assert_eq!(p.value, Value::from("y")),
        other => panic!("unexpected result operand {:?}", other),
    }
}

#[test]
fn test_remove_branch_out_of_range_is_noop() {
    let mut choose = ChooseOperation::new();
    choose.add_branch(None, None);
    choose.remove_branch(3);
    assert_eq!(choose.operation().operands.len(), 2);
}

#[test]
fn test_operation_specializes_by_name() {
    assert_eq!(Expr::operation("if", vec![]).kind(), ExprKind::If);
    assert_eq!(Expr::operation("Choose", vec![]).kind(), ExprKind::Choose);
    assert_eq!(Expr::operation("avg", vec![]).kind(), ExprKind::Operation);
}

#[test]
fn test_criteria_group_editing() {
    let mut group = CriteriaGroup::new(Connector::Or);
    group.add_criterion(rule("a", "1"));
    group.add_sub_group(CriteriaGroup::new(Connector::And));
    group.add(Expr::Empty);

    assert_eq!(group.criteria.len(), 3);
    assert_eq!(group.remove(1).map(|e| e.kind()), Some(ExprKind::CriteriaGroup));
    assert_eq!(group.remove(5), None);
    assert_eq!(group.criteria.len(), 2);
}

#[test]
fn test_value_types() {
    assert_eq!(Expr::from(rule("a", "1")).value_type(), Some(TypeName::BOOLEAN));
    assert_eq!(
        Expr::from(CriteriaGroup::default()).value_type(),
        Some(TypeName::BOOLEAN)
    );
    assert_eq!(
        Expr::from(field(&["n"], TypeName::NUMBER)).value_type(),
        Some(TypeName::NUMBER)
    );
    assert_eq!(Expr::Empty.value_type(), None);
    assert_eq!(Expr::operation("sum", vec![]).value_type(), None);
}

#[test]
fn test_literal_parameter_types() {
    assert_eq!(Parameter::literal("x").type_name, TypeName::STRING);
    assert_eq!(Parameter::literal(2.5).type_name, TypeName::NUMBER);
    assert_eq!(Parameter::literal(true).type_name, TypeName::BOOLEAN);
    assert_eq!(Parameter::literal(vec!["a", "b"]).type_name, TypeName::ARRAY);
}

#[test]
fn test_create_default_for_each_kind() {
    for kind in [
        ExprKind::Empty,
        ExprKind::CriteriaGroup,
        ExprKind::Criterion,
        ExprKind::NestedField,
        ExprKind::Parameter,
        ExprKind::Operation,
        ExprKind::If,
        ExprKind::Choose,
    ] {
        assert_eq!(kind.create_default().kind(), kind);
    }
}

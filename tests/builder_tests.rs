use std::cell::RefCell;
use std::rc::Rc;

use codebuilder::builder::{
    BuilderConfig, CodeBuilder, DefaultExpr, ExprOption, OperandTemplate, OperationConfig,
    OperationParam, OptionSource, OptionsOverride, UfOperator, default_type_operators,
};
use codebuilder::{
    ChooseOperation, CriteriaGroup, Criterion, Expr, ExprKind, NestedField, OpId, Operation,
    Parameter, TypeName,
};

fn field(name: &str, type_name: TypeName) -> NestedField {
    NestedField::new(name.split('.'), type_name)
}

fn sample_fields() -> Vec<NestedField> {
    vec![
        field("orders.amount", TypeName::NUMBER),
        field("name", TypeName::STRING),
        field("orders", TypeName::ARRAY),
        field("orders.items.sku", TypeName::STRING),
        field("orders.items", TypeName::ARRAY),
    ]
}

fn catalog() -> Vec<OperationConfig> {
    vec![
        OperationConfig::new("sum", TypeName::NUMBER),
        OperationConfig::new("concat", TypeName::STRING),
        OperationConfig::new("coalesce", TypeName::NUMBER | TypeName::STRING),
    ]
}

fn builder() -> CodeBuilder {
    CodeBuilder::new(BuilderConfig::new(sample_fields()).with_operations(catalog()))
}

fn ids(operators: &[UfOperator]) -> Vec<OpId> {
    operators.iter().map(|o| o.id).collect()
}

fn names(options: &[ExprOption]) -> Vec<&str> {
    options.iter().map(|o| o.name.as_str()).collect()
}

#[test]
fn test_default_operators_for_number() {
    let ops = default_type_operators(TypeName::NUMBER);
    assert_eq!(
        ids(&ops),
        vec![
            OpId::Eq,
            OpId::Ne,
            OpId::Gt,
            OpId::Gte,
            OpId::Lt,
            OpId::Lte,
            OpId::In,
            OpId::NotNull,
            OpId::Null
        ]
    );
    assert_eq!(ops[2].uf_name, "is greater than");
}

#[test]
fn test_default_operators_for_any_is_empty() {
    assert!(default_type_operators(TypeName::ANY).is_empty());
}

#[test]
fn test_operators_follow_left_operand_type() {
    let builder = builder();
    let criterion = Criterion::new(field("name", TypeName::STRING), OpId::Like, Parameter::literal("x"));

    let ops = builder.uf_operators(&criterion);
    assert_eq!(ops[0].id, OpId::In);
    assert_eq!(
        builder.uf_operator(&criterion).map(|o| o.uf_name),
        Some("contains text".to_string())
    );
}

#[test]
fn test_operators_fall_back_to_right_then_object() {
    let builder = builder();

    let right_only = Criterion {
        right_operand: Some(Box::new(Parameter::literal(true).into())),
        ..Criterion::default()
    };
    assert_eq!(ids(&builder.uf_operators(&right_only))[0], OpId::Eq);
    assert_eq!(builder.uf_operators(&right_only).len(), 4);

    let bare = Criterion::default();
    assert_eq!(ids(&builder.uf_operators(&bare)), vec![OpId::NotNull, OpId::Null]);
    assert_eq!(builder.uf_operator(&bare), None);
}

#[test]
fn test_operation_operand_uses_catalog_return_type() {
    let builder = builder();
    let sum: Expr = Operation::new("SUM", vec![]).into();

    assert_eq!(builder.expr_value_type(Some(&sum)), Some(TypeName::NUMBER));
    assert_eq!(
        builder.expr_value_type(Some(&Operation::new("unknown", vec![]).into())),
        None
    );

    let criterion = Criterion {
        left_operand: Some(Box::new(sum)),
        ..Criterion::default()
    };
    assert_eq!(builder.uf_operators(&criterion)[2].uf_name, "is greater than");
}

#[test]
fn test_custom_type_operators() {
    let builder = CodeBuilder::new(
        BuilderConfig::default().with_type_operators(|_| vec![UfOperator::new(OpId::Eq, "equals")]),
    );
    let ops = builder.uf_operators(&Criterion::default());
    assert_eq!(ops, vec![UfOperator::new(OpId::Eq, "equals")]);
}

#[test]
fn test_expr_type_labels() {
    let builder = builder();
    assert_eq!(builder.expr_type_label(ExprKind::If), Some("If, Then, Else"));
    assert_eq!(builder.expr_type_label(ExprKind::Choose), None);
}

#[test]
fn test_create_default_expr_without_factory() {
    let builder = builder();
    let created = builder.create_default_expr(ExprKind::CriteriaGroup, None, None);
    assert_eq!(created, Some(CriteriaGroup::default().into()));
}

#[test]
fn test_factory_can_decline_or_provide() {
    let builder = CodeBuilder::new(BuilderConfig::default().with_factory(|kind, _, _| match kind {
        ExprKind::NestedField => DefaultExpr::Decline,
        ExprKind::Parameter => DefaultExpr::Provide(Parameter::literal(0i64).into()),
        _ => DefaultExpr::UseDefault,
    }));

    assert_eq!(builder.create_default_expr(ExprKind::NestedField, None, None), None);
    assert_eq!(
        builder.create_default_expr(ExprKind::Parameter, None, None),
        Some(Parameter::literal(0i64).into())
    );
    assert_eq!(
        builder.create_default_expr(ExprKind::Empty, None, None),
        Some(Expr::Empty)
    );
}

#[test]
fn test_create_operation_fills_default_operands() {
    let config = OperationConfig::new("round", TypeName::NUMBER)
        .with_parameter(OperationParam {
            name: Some("value".to_string()),
            type_name: Some(TypeName::NUMBER),
            ..Default::default()
        })
        .with_default_operands(vec![
            OperandTemplate::Kind(ExprKind::Parameter),
            OperandTemplate::Expr(field("orders.amount", TypeName::NUMBER).into()),
        ]);
    let builder = CodeBuilder::new(BuilderConfig::default().with_operations(vec![config.clone()]));

    let created = builder.create_operation(&config, None);
    let op = created.as_operation().unwrap();

    assert_eq!(created.kind(), ExprKind::Operation);
    assert_eq!(op.name, "round");
    assert_eq!(op.operands.len(), 2);
    assert_eq!(op.operands[0], Some(Parameter::default().into()));
    assert_eq!(op.operands[1], Some(field("orders.amount", TypeName::NUMBER).into()));
}

#[test]
fn test_create_operation_specializes_branching() {
    let config = OperationConfig::new("if", TypeName::ANY).with_default_operands(vec![
        OperandTemplate::Kind(ExprKind::Criterion),
        OperandTemplate::Kind(ExprKind::Parameter),
        OperandTemplate::Kind(ExprKind::Parameter),
    ]);
    let created = builder().create_operation(&config, None);

    match created {
        Expr::If(branch) => {
            assert_eq!(branch.condition().map(Expr::kind), Some(ExprKind::Criterion));
            assert_eq!(branch.if_false().map(Expr::kind), Some(ExprKind::Parameter));
        }
        other => panic!("expected an if, got {:?}", other),
    }
}

#[test]
fn test_factory_sees_operation_parent_for_operands() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let builder = CodeBuilder::new(BuilderConfig::default().with_factory(move |kind, parent, _| {
        log.borrow_mut()
            .push((kind, parent.and_then(Expr::as_operation).map(|op| op.name.clone())));
        DefaultExpr::UseDefault
    }));
    let config = OperationConfig::new("max", TypeName::NUMBER)
        .with_default_operands(vec![OperandTemplate::Kind(ExprKind::NestedField)]);

    builder.create_operation(&config, None);

    assert_eq!(
        *seen.borrow(),
        vec![
            (ExprKind::Operation, None),
            (ExprKind::NestedField, Some("max".to_string())),
        ]
    );
}

#[test]
#[should_panic(expected = "declined to create operation")]
fn test_create_operation_panics_when_declined() {
    let builder = CodeBuilder::new(BuilderConfig::default().with_factory(|_, _, _| DefaultExpr::Decline));
    builder.create_operation(&OperationConfig::new("sum", TypeName::NUMBER), None);
}

#[test]
fn test_expr_options_for_any_slot() {
    let options = builder().expr_options(None, None, None);
    assert_eq!(
        names(&options),
        vec![
            "Choose",
            "If-then-else",
            "Static Value",
            "Field Value",
            "Rule",
            "Rule Group",
            "sum",
            "concat",
            "coalesce"
        ]
    );
    assert!(options[0].known_type);
    assert_eq!(options[6].source, OptionSource::Operation("sum".to_string()));
}

#[test]
fn test_expr_options_filter_by_type() {
    let number = builder().expr_options(None, Some(TypeName::NUMBER), None);
    assert_eq!(
        names(&number),
        vec!["Choose", "If-then-else", "Static Value", "Field Value", "sum", "coalesce"]
    );

    let boolean = builder().expr_options(None, Some(TypeName::BOOLEAN), None);
    assert!(names(&boolean).contains(&"Rule"));
    assert!(!names(&boolean).contains(&"sum"));
}

#[test]
fn test_expr_options_override() {
    let empty = CodeBuilder::new(BuilderConfig::default().with_expr_options(|_, _, _| OptionsOverride::Empty));
    assert!(empty.expr_options(None, None, None).is_empty());

    let custom = CodeBuilder::new(BuilderConfig::default().with_expr_options(|_, type_name, param| {
        if param.is_some() || type_name == TypeName::DATE {
            OptionsOverride::List(vec![ExprOption::custom("Today", Parameter::literal("today").into())])
        } else {
            OptionsOverride::UseDefault
        }
    }));
    assert_eq!(names(&custom.expr_options(None, Some(TypeName::DATE), None)), vec!["Today"]);
    assert_eq!(custom.expr_options(None, Some(TypeName::STRING), None).len(), 4);
}

#[test]
fn test_create_from_option() {
    let builder = builder();
    let options = builder.expr_options(None, None, None);

    let choose = builder.create_from_option(&options[0], None).unwrap();
    assert_eq!(choose.kind(), ExprKind::Choose);

    let sum = builder.create_from_option(&options[6], None).unwrap();
    assert_eq!(sum.as_operation().map(|op| op.name.as_str()), Some("sum"));

    let custom = ExprOption::custom("Zero", Parameter::literal(0i64).into());
    assert_eq!(
        builder.create_from_option(&custom, None),
        Some(Parameter::literal(0i64).into())
    );

    let missing = ExprOption {
        source: OptionSource::Operation("nope".to_string()),
        ..custom
    };
    assert_eq!(builder.create_from_option(&missing, None), None);
}

#[test]
fn test_fields_are_sorted_into_a_forest() {
    let builder = builder();
    let roots: Vec<&str> = builder.fields().iter().map(|n| n.full_name.as_str()).collect();
    assert_eq!(roots, vec!["name", "orders"]);

    let orders = &builder.fields()[1];
    let children: Vec<&str> = orders.children.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(children, vec!["amount", "items"]);
}

#[test]
fn test_set_fields_rebuilds_forest() {
    let mut builder = builder();
    assert_eq!(builder.fields().len(), 2);

    builder.set_fields(vec![field("id", TypeName::NUMBER)]);
    assert_eq!(builder.fields().len(), 1);
    assert_eq!(builder.nested_fields().len(), 1);
}

#[test]
fn test_scoped_fields() {
    let builder = builder();
    let scoped = builder.scoped_fields(&["orders"]);

    let roots: Vec<&str> = scoped.iter().map(|n| n.full_name.as_str()).collect();
    assert_eq!(roots, vec!["amount", "items"]);
    assert!(scoped.iter().all(|n| n.field.scoped));
    assert_eq!(scoped[1].children[0].full_name, "items.sku");

    assert!(builder.scoped_fields(&["name"]).is_empty());
}

#[test]
fn test_first_choose_branch_is_fresh() {
    let (condition, result) = builder().next_choose_branch(&ChooseOperation::new());
    assert_eq!(condition, Some(Criterion::default().into()));
    assert_eq!(result, Some(Parameter::default().into()));
}

#[test]
fn test_next_choose_branch_copies_last_condition() {
    let last = Criterion::new(field("name", TypeName::STRING), OpId::Eq, Parameter::literal("b"));
    let mut choose = ChooseOperation::new();
    choose.add_branch(Some(Expr::Empty), Some(Parameter::literal(1i64).into()));
    choose.add_branch(Some(last.clone().into()), Some(Parameter::literal(2i64).into()));

    let (condition, result) = builder().next_choose_branch(&choose);
    assert_eq!(condition, Some(last.into()));
    assert_eq!(result, Some(Parameter::default().into()));
}

#[test]
fn test_set_left_operand_keeps_operator_for_same_type() {
    let builder = builder();
    let mut criterion = Criterion::new(field("a", TypeName::NUMBER), OpId::Gt, Parameter::literal(1i64));

    builder.set_left_operand(&mut criterion, Some(field("b", TypeName::NUMBER).into()));
    assert_eq!(criterion.operator, Some(OpId::Gt));
    assert!(criterion.right_operand.is_some());

    builder.set_left_operand(&mut criterion, Some(field("c", TypeName::STRING).into()));
    assert_eq!(criterion.operator, None);
    assert_eq!(criterion.right_operand, None);
    assert_eq!(criterion.left().map(Expr::kind), Some(ExprKind::NestedField));
}

#[test]
fn test_set_operator_swaps_right_operand_shape() {
    let builder = builder();
    let mut criterion = Criterion {
        left_operand: Some(Box::new(field("orders", TypeName::ARRAY).into())),
        ..Criterion::default()
    };

    builder.set_operator(&mut criterion, OpId::Eq);
    assert_eq!(criterion.right().map(Expr::kind), Some(ExprKind::Parameter));

    // same shape: the edited value survives
    criterion.right_operand = Some(Box::new(Parameter::literal("kept").into()));
    builder.set_operator(&mut criterion, OpId::Ne);
    assert_eq!(criterion.right(), Some(&Parameter::literal("kept").into()));

    builder.set_operator(&mut criterion, OpId::HasNone);
    assert_eq!(criterion.right().map(Expr::kind), Some(ExprKind::CriteriaGroup));

    builder.set_operator(&mut criterion, OpId::HasAll);
    assert_eq!(criterion.right().map(Expr::kind), Some(ExprKind::CriteriaGroup));
    assert_eq!(criterion.operator, Some(OpId::HasAll));
}

#[test]
fn test_raise_change_reports_edits() {
    let changes = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&changes);
    let mut builder = CodeBuilder::new(
        BuilderConfig::default().on_change(move |expr| log.borrow_mut().push(expr.map(Expr::kind))),
    );

    builder.raise_change(Some(&Expr::Empty));
    builder.raise_change(None);

    assert_eq!(*changes.borrow(), vec![Some(ExprKind::Empty), None]);
}

#[test]
fn test_raise_change_without_callback_is_noop() {
    let mut builder = builder();
    builder.raise_change(None);
    assert!(!builder.view_only());
}

#[test]
fn test_catalog_deserializes_from_json() {
    let catalog: Vec<OperationConfig> = serde_json::from_str(
        r#"[{
            "name": "round",
            "ufName": "Round",
            "returnType": 64,
            "layoutVertically": true,
            "parameters": [{ "name": "value", "type": 64 }]
        }]"#,
    )
    .unwrap();

    assert_eq!(catalog[0].uf_name.as_deref(), Some("Round"));
    assert_eq!(catalog[0].return_type, TypeName::NUMBER);
    assert!(catalog[0].layout_vertically);
    assert_eq!(catalog[0].parameters[0].type_name, Some(TypeName::NUMBER));
    assert_eq!(catalog[0].default_operands, None);
}

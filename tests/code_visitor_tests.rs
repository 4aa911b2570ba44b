use std::cell::RefCell;

use codebuilder::builder::OperationConfig;
use codebuilder::code::{self, CodeOptions, CodeVisitor, INVALID};
use codebuilder::{
    ChooseOperation, Connector, CriteriaGroup, Criterion, Expr, IfOperation, NestedField, OpId,
    Operation, Parameter, TypeName,
};

fn field(name: &str) -> NestedField {
    NestedField::new(name.split('.'), TypeName::STRING)
}

fn eq(name: &str, value: &str) -> Criterion {
    Criterion::new(field(name), OpId::Eq, Parameter::literal(value))
}

fn compile(expr: impl Into<Expr>) -> String {
    code::compile(Some(&expr.into()))
}

#[test]
fn test_root_is_returned() {
    assert_eq!(compile(eq("status", "open")), "return status == \"open\";");
}

#[test]
fn test_comparison_symbols() {
    let cases = [
        (OpId::Eq, " == "),
        (OpId::Ne, " != "),
        (OpId::Gt, " > "),
        (OpId::Gte, " >= "),
        (OpId::Lt, " < "),
        (OpId::Lte, " <= "),
    ];
    for (op, symbol) in cases {
        let out = compile(Criterion::new(field("n"), op, Parameter::literal(1i64)));
        assert_eq!(out, format!("return n{}\"1\";", symbol));
    }
}

#[test]
fn test_like_and_in_render_contains_calls() {
    assert_eq!(
        compile(Criterion::new(field("name"), OpId::Like, Parameter::literal("bo"))),
        "return name.Contains(\"bo\");"
    );
    assert_eq!(
        compile(Criterion::new(field("tag"), OpId::In, Parameter::literal(vec!["a", "b"]))),
        "return new[] { \"a\", \"b\" }.Contains(tag);"
    );
}

#[test]
fn test_null_checks() {
    assert_eq!(compile(Criterion::unary(field("x"), OpId::Null)), "return x == null;");
    assert_eq!(compile(Criterion::unary(field("x"), OpId::NotNull)), "return x != null;");
}

#[test]
fn test_missing_parts_render_invalid() {
    let no_right = Criterion {
        right_operand: None,
        ..eq("x", "1")
    };
    assert_eq!(compile(no_right), format!("return x == {};", INVALID));

    let no_left = Criterion {
        left_operand: None,
        ..eq("x", "1")
    };
    assert_eq!(compile(no_left), format!("return {} == \"1\";", INVALID));

    let no_operator = Criterion {
        operator: None,
        ..eq("x", "1")
    };
    assert_eq!(compile(no_operator), format!("return {};", INVALID));
}

#[test]
fn test_token_sink_skips_unrendered_operands() {
    let root: Expr = Criterion {
        operator: None,
        ..eq("status", "open")
    }
    .into();
    let tokens = RefCell::new(Vec::new());

    let out = CodeVisitor::new(CodeOptions::default())
        .with_token_sink(|text, _| tokens.borrow_mut().push(text.to_string()))
        .compile(Some(&root));

    assert_eq!(out, format!("return {};", INVALID));
    assert_eq!(tokens.into_inner(), vec![INVALID.to_string(), "return".to_string()]);
}

#[test]
fn test_has_operators_are_invalid() {
    let has = Criterion::new(field("orders"), OpId::HasAny, CriteriaGroup::default());
    assert_eq!(compile(has), format!("return {};", INVALID));
}

#[test]
fn test_empty_and_absent_render_invalid() {
    assert_eq!(compile(Expr::Empty), format!("return {};", INVALID));
    assert_eq!(code::compile(None), format!("return {};", INVALID));
}

#[test]
fn test_group_joins_with_connector() {
    let group = CriteriaGroup::new(Connector::And)
        .with(eq("a", "1"))
        .with(eq("b", "2"));
    assert_eq!(compile(group), "return (a == \"1\"\n     && b == \"2\");");
}

#[test]
fn test_single_criterion_group_has_no_parens() {
    let group = CriteriaGroup::new(Connector::Or).with(eq("a", "1"));
    assert_eq!(compile(group), "return a == \"1\";");
}

#[test]
fn test_negated_group() {
    let group = CriteriaGroup::new(Connector::Or).negated().with(eq("a", "1"));
    assert_eq!(compile(group), "return !(a == \"1\");");
}

#[test]
fn test_if_is_hoisted() {
    let root = IfOperation::with_branches(eq("status", "a"), Parameter::literal("1"), Parameter::literal("2"));

    assert_eq!(
        compile(root),
        "dynamic value1 = null;\n\
         if (status == \"a\")\n\
         {\n\
         \x20   value1 = \"1\";\n\
         }\n\
         else\n\
         {\n\
         \x20   value1 = \"2\";\n\
         }\n\
         return value1;"
    );
}

#[test]
fn test_choose_is_hoisted_as_else_if_chain() {
    let mut choose = ChooseOperation::new();
    choose.add_branch(Some(eq("a", "1").into()), Some(Parameter::literal("x").into()));
    choose.add_branch(Some(eq("b", "2").into()), Some(Parameter::literal("y").into()));

    let out = compile(choose);
    assert_eq!(
        out,
        "dynamic value1 = null;\n\
         if (a == \"1\")\n\
         {\n\
         \x20   value1 = \"x\";\n\
         }\n\
         else if (b == \"2\")\n\
         {\n\
         \x20   value1 = \"y\";\n\
         }\n\
         return value1;"
    );
}

#[test]
fn test_nested_if_hoists_inside_branch() {
    let inner = IfOperation::with_branches(eq("b", "1"), Parameter::literal("x"), Parameter::literal("y"));
    let outer = IfOperation::with_branches(eq("a", "1"), inner, Parameter::literal("z"));

    let out = compile(outer);
    // inner branch statements land inside the outer `then` block
    assert!(out.starts_with("dynamic value1 = null;\nif (a == \"1\")\n{\n    dynamic value2 = null;"));
    assert!(out.contains("    value1 = value2;"));
    assert!(out.contains("        value2 = \"x\";"));
    assert!(out.ends_with("return value1;"));
    assert!(!out.contains('?'));
}

#[test]
fn test_if_in_call_argument_hoists_to_statement() {
    let branch = IfOperation::with_branches(eq("a", "1"), Parameter::literal("2"), Parameter::literal("3"));
    let sum = Expr::operation("sum", vec![Some(branch.into()), Some(Parameter::literal("4").into())]);

    let out = compile(sum);
    assert!(out.starts_with("dynamic value1 = null;"));
    assert!(out.ends_with("return Utils.Sum(value1, \"4\");"));
}

#[test]
fn test_known_calls() {
    let cases = [("sum", "Sum"), ("avg", "Average"), ("min", "Min"), ("max", "Max"), ("round", "Round")];
    for (name, call) in cases {
        let op = Operation::new(name, vec![Some(field("n").into())]);
        assert_eq!(compile(op), format!("return Utils.{}(n);", call));
    }
}

#[test]
fn test_unknown_call_is_invalid() {
    let op = Operation::new("median", vec![Some(field("n").into())]);
    assert_eq!(compile(op), format!("return {};", INVALID));
}

#[test]
fn test_filter_is_transparent() {
    let op = Operation::new("filter", vec![Some(eq("a", "1").into())]);
    assert_eq!(compile(op), "return a == \"1\";");
}

#[test]
fn test_unset_operand_is_invalid() {
    let op = Operation::new("max", vec![None, Some(field("n").into())]);
    assert_eq!(compile(op), format!("return Utils.Max({}, n);", INVALID));
}

#[test]
fn test_options_namespace_and_catalog() {
    let options = CodeOptions {
        utils_namespace: "Fx".to_string(),
        ..CodeOptions::default()
    }
    .with_operations(&[
        OperationConfig::new("median", TypeName::NUMBER),
        OperationConfig::new("sum", TypeName::NUMBER),
    ])
    .with_function("today", "DateTime.Today");

    let root: Expr = Operation::new(
        "sum",
        vec![
            Some(Operation::new("median", vec![Some(field("n").into())]).into()),
            Some(Operation::new("TODAY", vec![]).into()),
        ],
    )
    .into();

    let out = CodeVisitor::new(options).compile(Some(&root));
    assert_eq!(out, "return Fx.Sum(Fx.Median(n), DateTime.Today());");
}

#[test]
fn test_token_sink_sees_sources() {
    let root: Expr = eq("status", "open").into();
    let tokens = RefCell::new(Vec::new());

    let out = CodeVisitor::new(CodeOptions::default())
        .with_token_sink(|text, source| {
            tokens
                .borrow_mut()
                .push((text.to_string(), source.map(|e| e.kind())));
        })
        .compile(Some(&root));

    assert_eq!(out, "return status == \"open\";");
    let tokens = tokens.into_inner();
    let texts: Vec<&str> = tokens.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(texts, vec!["status", " == ", "\"open\"", "return"]);
    assert_eq!(tokens[1].1, Some(codebuilder::ExprKind::Criterion));
    assert_eq!(tokens[2].1, Some(codebuilder::ExprKind::Parameter));
    assert_eq!(tokens[3].1, None);
}

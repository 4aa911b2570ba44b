#![cfg(feature = "cli")]

use codebuilder::cli::{
    CheckOptions, CliError, CompileOptions, CompileOutput, FieldsOptions, Target, execute_check,
    execute_compile, execute_fields,
};
use codebuilder::{ExprKind, SerializeError, TypeName};
use serde_json::json;

const RULE: &str = r#"{
    "$type": "Criterion",
    "leftOperand": { "$type": "NestedField", "path": ["status"], "type": 32 },
    "operator": "Eq",
    "rightOperand": { "$type": "Parameter", "value": "open", "type": 32 }
}"#;

const SUM: &str = r#"{
    "$type": "Operation",
    "name": "sum",
    "operands": [{ "$type": "NestedField", "path": ["n"], "type": 64 }]
}"#;

const SAMPLE: &str = r#"[
    { "name": "a", "orders": [{ "amount": 1, "sku": "x" }] },
    { "name": "b", "orders": [] }
]"#;

fn compile(target: Target, input: &str) -> CompileOptions {
    CompileOptions {
        target,
        input: Some(input.to_string()),
        operations: None,
        namespace: None,
    }
}

fn fields(scope: Option<&str>, filter: Option<&str>) -> FieldsOptions {
    FieldsOptions {
        input: Some(SAMPLE.to_string()),
        scope: scope.map(str::to_string),
        filter: filter.map(str::to_string),
    }
}

#[test]
fn test_compile_to_query() {
    match execute_compile(&compile(Target::Query, RULE)).unwrap() {
        CompileOutput::Query(doc) => {
            assert_eq!(doc, json!({ "query": { "terms": { "status": ["open"] } } }))
        }
        other => panic!("expected a query document, got {:?}", other),
    }
}

#[test]
fn test_compile_to_code() {
    match execute_compile(&compile(Target::Code, RULE)).unwrap() {
        CompileOutput::Code(code) => assert_eq!(code, "return status == \"open\";"),
        other => panic!("expected code, got {:?}", other),
    }
}

#[test]
fn test_compile_with_namespace_and_catalog() {
    let options = CompileOptions {
        namespace: Some("Fx".to_string()),
        ..compile(Target::Code, SUM)
    };
    match execute_compile(&options).unwrap() {
        CompileOutput::Code(code) => assert_eq!(code, "return Fx.Sum(n);"),
        other => panic!("expected code, got {:?}", other),
    }

    let options = CompileOptions {
        operations: Some(r#"[{ "name": "median", "returnType": 64 }]"#.to_string()),
        ..compile(Target::Code, &SUM.replace("sum", "median"))
    };
    match execute_compile(&options).unwrap() {
        CompileOutput::Code(code) => assert_eq!(code, "return Utils.Median(n);"),
        other => panic!("expected code, got {:?}", other),
    }
}

#[test]
fn test_compile_requires_input() {
    let options = CompileOptions {
        input: None,
        ..compile(Target::Query, RULE)
    };
    assert!(matches!(execute_compile(&options), Err(CliError::NoInput)));
}

#[test]
fn test_compile_rejects_unknown_tag() {
    let err = execute_compile(&compile(Target::Query, r#"{ "$type": "Formula" }"#)).unwrap_err();
    assert!(matches!(err, CliError::Serialize(SerializeError::UnknownTag(_))));
}

#[test]
fn test_check_reports_kind_and_type() {
    let report = execute_check(&CheckOptions {
        input: Some(RULE.to_string()),
    })
    .unwrap();

    assert_eq!(report.kind, Some(ExprKind::Criterion));
    assert_eq!(report.value_type, Some(TypeName::BOOLEAN));
    assert!(report.stable);
    assert_eq!(report.canonical["operator"], "Eq");
}

#[test]
fn test_check_null_input() {
    let report = execute_check(&CheckOptions {
        input: Some("null".to_string()),
    })
    .unwrap();
    assert_eq!(report.kind, None);
    assert!(report.canonical.is_null());
}

#[test]
fn test_fields_lists_inferred_tree() {
    let lines = execute_fields(&fields(None, None)).unwrap();
    assert_eq!(
        lines,
        vec![
            "name: string",
            "orders: array",
            "  amount: number",
            "  sku: string"
        ]
    );
}

#[test]
fn test_fields_under_scope() {
    let lines = execute_fields(&fields(Some("orders"), None)).unwrap();
    assert_eq!(lines, vec!["amount: number", "sku: string"]);
}

#[test]
fn test_fields_scope_with_dotted_keys() {
    let dotted = FieldsOptions {
        input: Some(r#"{ "a.b": 1 }"#.to_string()),
        scope: Some("a.b".to_string()),
        filter: None,
    };
    assert!(execute_fields(&dotted).unwrap().is_empty());

    let nested = FieldsOptions {
        input: Some(r#"{ "a": { "b": { "c": 1 } } }"#.to_string()),
        ..dotted
    };
    assert_eq!(execute_fields(&nested).unwrap(), vec!["c: number"]);
}

#[test]
fn test_fields_filter_keeps_parents() {
    let lines = execute_fields(&fields(None, Some("^orders\\.sku$"))).unwrap();
    assert_eq!(lines, vec!["orders: array", "  sku: string"]);
}

#[test]
fn test_fields_bad_pattern() {
    let err = execute_fields(&fields(None, Some("("))).unwrap_err();
    assert!(matches!(err, CliError::Pattern(_)));
}

//! Type checker tests against hand-built and fixture schemas.

mod common;

use common::{ast, schema};
use exprkit::{CheckErrorKind, Checker, Kind, NodeKind, Schema, TypeInfo, check, checker::info_of};

fn nested() -> Schema {
    Schema::new().variable_info(
        "host",
        TypeInfo::structure()
            .field_info("name", TypeInfo::string())
            .field_info(
                "rack",
                TypeInfo::structure().field_info("slot", TypeInfo::int()),
            ),
    )
}

#[test]
fn annotates_every_node() {
    let mut node = ast("intField + 1 > 2");
    let checked = check(&mut node, &schema(), Some(Kind::Bool));
    assert!(checked.error.is_none());

    let NodeKind::Binary { left, right, .. } = &node.kind else {
        panic!("expected binary");
    };
    assert_eq!(left.nature.as_ref().map(|n| n.kind), Some(Kind::Int));
    assert_eq!(right.nature.as_ref().map(|n| n.kind), Some(Kind::Int));
}

#[test]
fn nested_struct_fields() {
    let mut node = ast("host.rack.slot > 3");
    let checked = check(&mut node, &nested(), Some(Kind::Bool));
    assert!(checked.error.is_none(), "{:?}", checked.error);
}

#[test]
fn nested_unknown_field() {
    let mut node = ast("host.rack.shelf");
    let err = check(&mut node, &nested(), None).error.expect("unknown field");
    assert_eq!(err.kind, CheckErrorKind::FieldNotFound);
    assert_eq!(err.location.column, 10);
}

#[test]
fn struct_without_fields() {
    let schema = Schema::new().variable_info("blob", TypeInfo::new(Kind::Map));
    let mut node = ast("blob.key");
    let err = check(&mut node, &schema, None).error.expect("no fields");
    assert_eq!(err.kind, CheckErrorKind::NoFields);
    assert_eq!(err.location.column, 5);
}

#[test]
fn string_literal_inherits_left_metadata() {
    let mut node = ast("stringField == 'active'");
    check(&mut node, &schema(), Some(Kind::Bool));
    let NodeKind::Binary { right, .. } = &node.kind else {
        panic!("expected binary");
    };
    let values = info_of(right).and_then(|info| info.values.as_ref());
    assert_eq!(values.map(Vec::len), Some(10));
}

#[test]
fn int_literal_does_not_inherit() {
    let mut node = ast("intField == 1");
    check(&mut node, &schema(), None);
    let NodeKind::Binary { right, .. } = &node.kind else {
        panic!("expected binary");
    };
    assert!(info_of(right).is_none());
}

#[test]
fn unary_operators() {
    let schema = schema();
    for (input, kind) in [("-intField", Kind::Int), ("!boolField1", Kind::Bool)] {
        let mut node = ast(input);
        let checked = check(&mut node, &schema, Some(kind));
        assert!(checked.error.is_none(), "{input}");
    }

    let mut node = ast("-stringField");
    let err = check(&mut node, &schema, None).error.expect("invalid operand");
    assert_eq!(err.kind, CheckErrorKind::InvalidType);
}

#[test]
fn literals_have_natures() {
    let schema = Schema::new();
    for (input, kind) in [
        ("nil", Kind::Nil),
        ("true", Kind::Bool),
        ("'x'", Kind::String),
        ("7", Kind::Int),
    ] {
        let mut node = ast(input);
        let nature = check(&mut node, &schema, None).nature.map(|n| n.kind);
        assert_eq!(nature, Some(kind), "{input}");
    }
}

#[test]
fn first_error_wins() {
    let mut node = ast("a and b");
    let err = check(&mut node, &schema(), None).error.expect("unknown variables");
    assert_eq!(err.kind, CheckErrorKind::VariableNotFound);
    assert_eq!(err.location.column, 0);
}

#[test]
fn expected_type_uses_root_location() {
    let mut node = ast("intField + 1");
    let checked = Checker::new(&schema()).expect(Kind::Bool).check(&mut node);
    let err = checked.into_result().expect_err("int is not bool");
    assert_eq!(err.kind, CheckErrorKind::ExpectedType(Kind::Bool));
    assert_eq!(err.location.column, 9);
}

#[test]
fn without_expectation_any_type_passes() {
    let mut node = ast("intField + 1");
    let nature = check(&mut node, &schema(), None)
        .into_result()
        .expect("valid");
    assert_eq!(nature.map(|n| n.kind), Some(Kind::Int));
}

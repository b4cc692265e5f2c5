use super::*;
use pretty_assertions::assert_eq;

#[test]
fn kind_matches_variant() {
    assert_eq!(Value::int(1).kind(), TypeKind::Int);
    assert_eq!(Value::int_array(vec![1, 2]).kind(), TypeKind::IntArray);
    assert_eq!(Value::byte_array(vec![1u8]).kind(), TypeKind::ByteArray);
    assert_eq!(Value::float_array(vec![1.0]).kind(), TypeKind::FloatArray);
    assert_eq!(Value::list(vec![Value::Void]).kind(), TypeKind::List);
    assert_eq!(Value::string("x").kind(), TypeKind::Str);
}

#[test]
fn type_names() {
    assert_eq!(Value::int(1).type_name(), "int");
    assert_eq!(Value::int_array(Vec::<i64>::new()).type_name(), "[int]");
    assert_eq!(Value::Void.type_name(), "void");
}

#[test]
fn display_sequences() {
    assert_eq!(Value::int_array(vec![10, 20, 30]).to_string(), "[10, 20, 30]");
    assert_eq!(
        Value::list(vec![Value::int(1), Value::string("a")]).to_string(),
        "[1, \"a\"]"
    );
    assert_eq!(Value::int_array(Vec::<i64>::new()).to_string(), "[]");
}

#[test]
fn clone_shares_payload() {
    let a = Value::int_array(vec![1, 2, 3]);
    let b = a.clone();
    match (&a, &b) {
        (Value::IntArray(x), Value::IntArray(y)) => assert!(Arc::ptr_eq(x, y)),
        _ => panic!("expected int arrays"),
    }
}

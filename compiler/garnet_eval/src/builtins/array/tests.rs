use super::*;
use pretty_assertions::assert_eq;

#[test]
fn negative_indices_count_from_the_end() {
    assert_eq!(resolve_index(0, 3), Some(0));
    assert_eq!(resolve_index(5, 3), Some(5));
    assert_eq!(resolve_index(-1, 3), Some(2));
    assert_eq!(resolve_index(-3, 3), Some(0));
    assert_eq!(resolve_index(-4, 3), None);
    assert_eq!(resolve_index(i64::MIN, 3), None);
}

#[test]
fn sizes_fit_in_fixnums() {
    assert_eq!(fixnum(4), Value::Fixnum(4));
}

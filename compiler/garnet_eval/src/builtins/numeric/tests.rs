use super::*;
use pretty_assertions::assert_eq;

#[test]
fn division_floors_toward_negative_infinity() {
    assert_eq!(int_arith(ArithOp::Div, 7, 2).ok(), Some(3));
    assert_eq!(int_arith(ArithOp::Div, -7, 2).ok(), Some(-4));
    assert_eq!(int_arith(ArithOp::Div, 7, -2).ok(), Some(-4));
    assert_eq!(int_arith(ArithOp::Div, -8, 2).ok(), Some(-4));
}

#[test]
fn modulo_takes_the_divisor_sign() {
    assert_eq!(int_arith(ArithOp::Mod, 7, 3).ok(), Some(1));
    assert_eq!(int_arith(ArithOp::Mod, -7, 3).ok(), Some(2));
    assert_eq!(int_arith(ArithOp::Mod, 7, -3).ok(), Some(-2));
    assert!((float_arith(ArithOp::Mod, -7.0, 3.0) - 2.0).abs() < f64::EPSILON);
}

#[test]
fn zero_divisor_raises() {
    for op in [ArithOp::Div, ArithOp::Mod] {
        let err = int_arith(op, 1, 0).err().map(|e| e.exception_class().to_string());
        assert_eq!(err.as_deref(), Some("ZeroDivisionError"), "{}", op.symbol());
    }
    assert!(float_arith(ArithOp::Div, 1.0, 0.0).is_infinite());
}

#[test]
fn overflow_is_a_range_error() {
    let cases = [
        (ArithOp::Add, i64::MAX, 1),
        (ArithOp::Sub, i64::MIN, 1),
        (ArithOp::Mul, i64::MAX, 2),
        (ArithOp::Div, i64::MIN, -1),
    ];
    for (op, a, b) in cases {
        let err = int_arith(op, a, b).err().map(|e| e.exception_class().to_string());
        assert_eq!(err.as_deref(), Some("RangeError"), "{a} {} {b}", op.symbol());
    }
}

#[test]
fn float_to_int_truncates_and_range_checks() {
    assert_eq!(float_to_int(2.9).ok(), Some(2));
    assert_eq!(float_to_int(-2.9).ok(), Some(-2));
    assert!(float_to_int(f64::NAN).is_err());
    assert!(float_to_int(1e19).is_err());
}

#[test]
fn mixed_comparisons() {
    assert_eq!(compare(&Value::Fixnum(1), &Value::Float(1.5)), Some(Ordering::Less));
    assert_eq!(compare(&Value::Float(2.0), &Value::Fixnum(2)), Some(Ordering::Equal));
    assert_eq!(compare(&Value::Float(f64::NAN), &Value::Fixnum(2)), None);
    assert_eq!(compare(&Value::Fixnum(1), &Value::str("1")), None);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn div_mod_reconstruct_dividend(a in -10_000i64..10_000, b in -100i64..100) {
            prop_assume!(b != 0);
            let q = int_arith(ArithOp::Div, a, b).ok();
            let r = int_arith(ArithOp::Mod, a, b).ok();
            prop_assert!(q.is_some() && r.is_some());
            let (q, r) = (q.unwrap_or_default(), r.unwrap_or_default());
            prop_assert_eq!(q * b + r, a);
            prop_assert!(r == 0 || (r < 0) == (b < 0));
        }
    }
}

use crate::util::{EscapedBytes, consume_decimal_number, escape_bytes};

// ------------------------------------------------------------------------------------------------
// Escaping
// ------------------------------------------------------------------------------------------------

#[test]
fn printable_bytes_pass_through() {
    assert_eq!(escape_bytes(b"hello world ~"), "hello world ~");
}

#[test]
fn non_printable_bytes_are_hex_escaped() {
    assert_eq!(escape_bytes(b"\x00a\x7f\xff\n"), "\\x00a\\x7f\\xff\\x0a");
    assert_eq!(format!("{}", EscapedBytes(&[0x1f, b' '])), "\\x1f ");
}

// ------------------------------------------------------------------------------------------------
// Decimal parsing
// ------------------------------------------------------------------------------------------------

fn consume(input: &[u8]) -> (Option<u64>, &[u8]) {
    let mut rest = input;
    let value = consume_decimal_number(&mut rest);
    (value, rest)
}

#[test]
fn consumes_leading_digits() {
    assert_eq!(consume(b"0"), (Some(0), &b""[..]));
    assert_eq!(consume(b"12345abc"), (Some(12345), &b"abc"[..]));
    assert_eq!(consume(b"000017"), (Some(17), &b""[..]));
}

#[test]
fn max_u64_round_trips() {
    let text = u64::MAX.to_string();
    assert_eq!(consume(text.as_bytes()), (Some(u64::MAX), &b""[..]));
    for v in [0u64, 1, 9, 10, 1 << 32, u64::MAX - 1] {
        let text = format!("{v}tail");
        assert_eq!(consume(text.as_bytes()), (Some(v), &b"tail"[..]));
    }
}

#[test]
fn overflow_is_rejected() {
    assert_eq!(consume(b"18446744073709551616").0, None);
    assert_eq!(consume(b"99999999999999999999").0, None);
    assert_eq!(consume(b"184467440737095516150").0, None);
}

#[test]
fn no_digits_is_rejected() {
    assert_eq!(consume(b""), (None, &b""[..]));
    assert_eq!(consume(b"a1"), (None, &b"a1"[..]));
    assert_eq!(consume(b"-1"), (None, &b"-1"[..]));
}

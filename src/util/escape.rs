use std::fmt;

/// Renders a byte string for humans: printable ASCII is kept, every other
/// byte is written as `\xNN`.
pub fn escape_bytes(value: &[u8]) -> String {
    EscapedBytes(value).to_string()
}

/// `Display` adapter around [`escape_bytes`] for use in `tracing` fields
/// without allocating up front.
pub struct EscapedBytes<'a>(pub &'a [u8]);

impl fmt::Display for EscapedBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.0 {
            if (b' '..=b'~').contains(&b) {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

/// Parses a leading run of ASCII digits from `input` as a `u64`.
///
/// On success the digits are removed from the front of `input`. Returns
/// `None` (leaving `input` untouched) when no digit is present or the
/// number does not fit in a `u64`.
pub fn consume_decimal_number(input: &mut &[u8]) -> Option<u64> {
    let mut value: u64 = 0;
    let mut consumed = 0;
    for &ch in input.iter() {
        if !ch.is_ascii_digit() {
            break;
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(ch - b'0')))?;
        consumed += 1;
    }
    if consumed == 0 {
        return None;
    }
    *input = &input[consumed..];
    Some(value)
}

use super::KhqrError;

/// Longest value a two-digit length prefix can describe.
pub const MAX_VALUE_LEN: usize = 99;

/// Render `tag || len || value`, with `len` the byte length of `value` as two digits.
///
/// Callers are responsible for keeping `value` within [`MAX_VALUE_LEN`] bytes;
/// `EncodingRequest::new` enforces this for every user-supplied field.
pub fn format_tlv(tag: &str, value: &str) -> String {
    debug_assert_eq!(tag.len(), 2, "TLV tags are two characters");
    debug_assert!(value.len() <= MAX_VALUE_LEN, "TLV value exceeds {} bytes", MAX_VALUE_LEN);
    format!("{}{:02}{}", tag, value.len(), value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub tag: String,
    pub value: String,
}

/// Split a TLV string into its fields in order.
pub fn decode(input: &str) -> Result<Vec<Field>, KhqrError> {
    let bytes = input.as_bytes();
    let mut fields = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes.len() - pos < 4 {
            return Err(KhqrError::Truncated { offset: pos });
        }
        let tag = slice(input, pos, pos + 2)?;
        let len_text = slice(input, pos + 2, pos + 4)?;
        if !len_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(KhqrError::BadLength { offset: pos + 2, found: len_text.to_string() });
        }
        let len: usize = len_text
            .parse()
            .map_err(|_| KhqrError::BadLength { offset: pos + 2, found: len_text.to_string() })?;
        let start = pos + 4;
        let end = start + len;
        if end > bytes.len() {
            return Err(KhqrError::Truncated { offset: pos });
        }
        let value = slice(input, start, end)?;
        fields.push(Field { tag: tag.to_string(), value: value.to_string() });
        pos = end;
    }

    Ok(fields)
}

fn slice(input: &str, start: usize, end: usize) -> Result<&str, KhqrError> {
    input.get(start..end).ok_or(KhqrError::Truncated { offset: start })
}

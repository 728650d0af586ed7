//! Expansion of the references embedded in quoted condition text.
//!
//! `'$(Configuration)|$(Platform)'` is split into literal runs and
//! references; each reference is handed to the [`EvaluationState`] and the
//! pieces are joined back together. `%XX` escapes are decoded last, so
//! escaped text coming out of a property is unescaped too.

use crate::{
    chars,
    state::{EvaluationState, ExpansionError, ItemListReference, MetadataReference},
};

/// Expands every `$()`, `@()` and `%()` reference in `text`, then unescapes.
///
/// A sigil whose parenthesis never closes is kept as literal text.
pub fn expand<S>(state: &S, text: &str) -> Result<String, ExpansionError>
where
    S: EvaluationState + ?Sized,
{
    let input: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < input.len() {
        let ch = input[i];
        let end = match ch {
            '$' | '@' | '%' if input.get(i + 1) == Some(&'(') => chars::reference_end(&input, i),
            _ => None,
        };

        let Some(end) = end else {
            out.push(ch);
            i += 1;
            continue;
        };

        let inner: String = input[i + 2..end - 1].iter().collect();
        match ch {
            '$' => out.push_str(&state.expand_property(inner.trim())?),
            '@' => {
                let reference = ItemListReference::parse(&inner)?;
                let items = state.expand_item_list(&reference)?;
                out.push_str(&items.join(reference.separator()));
            }
            _ => {
                let reference = MetadataReference::parse(&inner)?;
                out.push_str(&state.expand_metadata(&reference)?);
            }
        }
        i = end;
    }

    Ok(unescape(&out))
}

/// True when `text` holds at least one well-formed reference.
pub fn contains_references(text: &str) -> bool {
    let input: Vec<char> = text.chars().collect();
    (0..input.len()).any(|i| {
        matches!(input[i], '$' | '@' | '%')
            && input.get(i + 1) == Some(&'(')
            && chars::reference_end(&input, i).is_some()
    })
}

/// Decodes `%XX` escapes (two hex digits). Anything else is left alone, so
/// `100%` and `%(Name)` survive unchanged.
///
/// # Examples
///
/// ```
/// use buildcond::expander::unescape;
///
/// assert_eq!(unescape("a%3Bb"), "a;b");
/// assert_eq!(unescape("100%"), "100%");
/// ```
pub fn unescape(text: &str) -> String {
    if !text.contains('%') {
        return text.to_string();
    }

    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && chars::is_hex_digit(bytes[i + 1] as char)
            && chars::is_hex_digit(bytes[i + 2] as char)
        {
            let hex = &text[i + 1..i + 3];
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    match String::from_utf8(out) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

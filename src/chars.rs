//! Character classes used by the lexer to pick a literal kind from the
//! first character it sees.

/// `+`, `-`, `.` or a decimal digit.
pub fn is_number_start(c: char) -> bool {
    c == '+' || c == '-' || c == '.' || c.is_ascii_digit()
}

/// Start of a bare identifier (`true`, `Exists`, `Debug`).
pub fn is_simple_string_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

pub fn is_simple_string_char(c: char) -> bool {
    is_simple_string_start(c) || c.is_ascii_digit()
}

pub fn is_hex_alphabetic(c: char) -> bool {
    matches!(c, 'a'..='f' | 'A'..='F')
}

pub fn is_hex_digit(c: char) -> bool {
    c.is_ascii_digit() || is_hex_alphabetic(c)
}

/// End (exclusive) of the reference whose sigil is at `start` and whose
/// `(` is at `start + 1`.
///
/// Parentheses are balanced and quoted runs are skipped, so
/// `$(A.Replace(')', 'x'))` is one reference. `None` if it never closes.
pub fn reference_end(input: &[char], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = start + 1;

    while i < input.len() {
        match input[i] {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            quote @ ('\'' | '"' | '`') => {
                i = (i + 1..input.len()).find(|&j| input[j] == quote)?;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_start() {
        for c in ['+', '-', '.', '0', '7', '9'] {
            assert!(is_number_start(c), "{c}");
        }
        for c in ['a', 'x', '_', ' ', '\''] {
            assert!(!is_number_start(c), "{c}");
        }
    }

    #[test]
    fn test_simple_string() {
        assert!(is_simple_string_start('_'));
        assert!(is_simple_string_start('Z'));
        assert!(is_simple_string_start('é'));
        assert!(!is_simple_string_start('1'));
        assert!(is_simple_string_char('1'));
        assert!(!is_simple_string_char('-'));
        assert!(!is_simple_string_char('.'));
    }

    #[test]
    fn test_hex_digit() {
        for c in "0123456789abcdefABCDEF".chars() {
            assert!(is_hex_digit(c), "{c}");
        }
        assert!(!is_hex_digit('g'));
        assert!(!is_hex_digit('G'));
        assert!(!is_hex_alphabetic('0'));
    }

    #[test]
    fn test_reference_end() {
        let chars: Vec<char> = "$(A.Replace(')', 'x')) and".chars().collect();
        assert_eq!(reference_end(&chars, 0), Some(22));

        let chars: Vec<char> = "@(Src->'%(Filename)')".chars().collect();
        assert_eq!(reference_end(&chars, 0), Some(chars.len()));

        let chars: Vec<char> = "$(Unclosed".chars().collect();
        assert_eq!(reference_end(&chars, 0), None);
    }
}

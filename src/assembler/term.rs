use std::str::FromStr;

use super::symbols::SymbolTable;
use crate::isa::Keyword;

/// A single evaluated operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// `V0`..`VF`, also written `%0`..`%F`
    Register(u8),
    Numeric(u16),
    Keyword(Keyword),
    /// A label that has no address yet
    LabelRef(String),
}

/// Evaluate one source token.
///
/// Never fails. A token that is neither a keyword, a register nor a literal is taken to be a
/// label and resolved through `symbols`, creating an unresolved entry if it is unknown.
#[tracing::instrument(level = "trace", skip(symbols))]
pub fn evaluate(token: &str, symbols: &mut SymbolTable) -> Term {
    if let Ok(keyword) = Keyword::from_str(token) {
        return Term::Keyword(keyword);
    }
    if let Some(register) = parse_register(token) {
        return Term::Register(register);
    }
    if let Some(value) = parse_char(token).or_else(|| parse_number(token)) {
        return Term::Numeric(value);
    }
    match symbols.reference(token) {
        Some(address) => Term::Numeric(address),
        None => Term::LabelRef(token.to_ascii_uppercase()),
    }
}

/// `V` or `%` followed by exactly one hex digit.
pub fn parse_register(token: &str) -> Option<u8> {
    let mut chars = token.chars();
    let prefix = chars.next()?;
    let digit = chars.next()?;
    if !matches!(prefix, 'V' | 'v' | '%') || chars.next().is_some() {
        return None;
    }
    digit.to_digit(16).map(|digit| digit as u8)
}

/// `'c'` or `'c`. The character is always the one right after the opening quote.
pub fn parse_char(token: &str) -> Option<u16> {
    let chars: Vec<char> = token.chars().collect();
    match chars.as_slice() {
        ['\'', ch] | ['\'', ch, '\''] => Some(*ch as u16 & 0xFF),
        _ => None,
    }
}

/// Parse a numeric literal in any of the supported notations.
///
/// Notations are tried in order: binary (`0b1010`, `1010b`), hex (`$1F`, `0x1F`, `0h1F`,
/// `1Fh`), decimal (`0d42`, `42d`) and finally plain decimal digits. `_` may separate digits.
pub fn parse_number(token: &str) -> Option<u16> {
    if token.starts_with('_') {
        return None;
    }
    let upper = token.to_ascii_uppercase();
    let text = upper.as_str();

    let binary = text
        .strip_prefix("0B")
        .and_then(|digits| from_radix(digits, 2))
        .or_else(|| text.strip_suffix('B').and_then(|digits| from_radix(digits, 2)));
    if binary.is_some() {
        return binary;
    }

    let hex = text
        .strip_prefix('$')
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix("0H"))
        .and_then(|digits| from_radix(digits, 16))
        .or_else(|| text.strip_suffix('H').and_then(|digits| from_radix(digits, 16)));
    if hex.is_some() {
        return hex;
    }

    let decimal = text
        .strip_prefix("0D")
        .and_then(|digits| from_radix(digits, 10))
        .or_else(|| text.strip_suffix('D').and_then(|digits| from_radix(digits, 10)));
    if decimal.is_some() {
        return decimal;
    }

    from_radix(text, 10)
}

fn from_radix(digits: &str, radix: u32) -> Option<u16> {
    let digits: String = digits.chars().filter(|&ch| ch != '_').collect();
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_digit(radix)) {
        return None;
    }
    u16::from_str_radix(&digits, radix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_number() {
        let tests = vec![
            ("0b1010", Some(0b1010)),
            ("1010b", Some(0b1010)),
            ("0B1000_1010", Some(0x8A)),
            ("$1F", Some(0x1F)),
            ("0x1f", Some(0x1F)),
            ("0h200", Some(0x200)),
            ("05h", Some(0x05)),
            ("0FFFFh", Some(0xFFFF)),
            ("0d42", Some(42)),
            ("42d", Some(42)),
            ("1234", Some(1234)),
            ("65535", Some(0xFFFF)),
            ("65536", None),
            ("10000h", None),
            ("+5", None),
            ("$", None),
            ("h", None),
            ("_12", None),
            ("1_000", Some(1000)),
            ("0BH", Some(0x0B)),
            ("0DH", Some(0x0D)),
            ("each", Some(0xEAC)),
            ("loop", None),
        ];
        for (input, expected) in tests {
            assert_eq!(parse_number(input), expected, "{}", input);
        }
    }

    #[test]
    fn test_parse_register() {
        let tests = vec![
            ("V0", Some(0)),
            ("va", Some(10)),
            ("%F", Some(15)),
            ("V10", None),
            ("V", None),
            ("VG", None),
            ("X1", None),
        ];
        for (input, expected) in tests {
            assert_eq!(parse_register(input), expected, "{}", input);
        }
    }

    #[test]
    fn test_parse_char() {
        let tests = vec![
            ("'a'", Some(0x61)),
            ("'a", Some(0x61)),
            ("''", Some(0x27)),
            ("'''", Some(0x27)),
            ("'ab'", None),
            ("'ab", None),
            ("a'", None),
            ("'", None),
        ];
        for (input, expected) in tests {
            assert_eq!(parse_char(input), expected, "{}", input);
        }
    }

    #[test]
    fn test_evaluate() {
        let mut symbols = SymbolTable::new();
        symbols.define("target", 0x206).unwrap();

        let tests = vec![
            ("IX", Term::Keyword(Keyword::IX)),
            ("key", Term::Keyword(Keyword::Key)),
            ("sound", Term::Keyword(Keyword::Sound)),
            ("VA", Term::Register(10)),
            ("%3", Term::Register(3)),
            ("'A'", Term::Numeric(0x41)),
            ("05h", Term::Numeric(5)),
            ("target", Term::Numeric(0x206)),
            ("later", Term::LabelRef("LATER".to_string())),
            ("'ab'", Term::LabelRef("'AB'".to_string())),
        ];
        for (input, expected) in tests {
            assert_eq!(evaluate(input, &mut symbols), expected, "{}", input);
        }

        let later = symbols.find("LATER").unwrap();
        assert!(!later.resolved);
    }

    #[test]
    fn test_keyword_wins_over_label() {
        let mut symbols = SymbolTable::new();
        assert_eq!(evaluate("timer", &mut symbols), Term::Keyword(Keyword::Timer));
        assert_eq!(symbols.iter().count(), 0);
    }

    #[test]
    fn test_selectors_are_labels() {
        let mut symbols = SymbolTable::new();
        symbols.define("left", 0x204).unwrap();
        assert_eq!(evaluate("LEFT", &mut symbols), Term::Numeric(0x204));
        assert_eq!(evaluate("down", &mut symbols), Term::LabelRef("DOWN".to_string()));
    }
}

//! Line classification: decides what kind of statement a CTR line is.

use crate::model::MetaKey;

/// The symbol-directive families recognised by their prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectiveSyntax {
    /// `SYMBOL: TYPE [ROW, START to END], label`
    Canonical,
    /// `SYMBOL, TYPE, X, Y, W, H, label`
    Absolute,
    /// `@TYPE: ROW, START, END, label` (type taken from the prefix)
    AtPrefixed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind {
    SheetBoundary(u32),
    MetaField(MetaKey, String),
    SymbolDirective(DirectiveSyntax),
    RowSpecLine,
}

/// Case-insensitive ASCII prefix strip.
pub(crate) fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

/// Classify one trimmed, non-empty line. First matching rule wins.
pub fn classify(line: &str) -> LineKind {
    if let Some(rest) = strip_prefix_ci(line, "SHEET:") {
        return LineKind::SheetBoundary(first_number(rest).unwrap_or(1));
    }
    for key in MetaKey::ALL {
        if let Some(rest) = strip_prefix_ci(line, key.keyword())
            && let Some(value) = rest.strip_prefix(':')
        {
            return LineKind::MetaField(key, value.trim().to_string());
        }
    }
    if strip_prefix_ci(line, "SYMBOL:").is_some() {
        return LineKind::SymbolDirective(DirectiveSyntax::Canonical);
    }
    if strip_prefix_ci(line, "SYMBOL,").is_some() {
        return LineKind::SymbolDirective(DirectiveSyntax::Absolute);
    }
    if let Some(rest) = line.strip_prefix('@')
        && let Some((ty, _)) = rest.split_once(':')
    {
        let ty = ty.trim_end();
        if !ty.is_empty()
            && ty
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return LineKind::SymbolDirective(DirectiveSyntax::AtPrefixed(ty.to_ascii_uppercase()));
        }
    }
    LineKind::RowSpecLine
}

/// First run of ASCII digits in `s`, if it fits a `u32`.
pub(crate) fn first_number(s: &str) -> Option<u32> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

//! Row line grammar.
//!
//! ```text
//! ROWID, LABEL[start to end], CABLE, LABEL[start to end], ..., CABLE
//! ```
//!
//! Each `LABEL[start to end]` expands to one [`RowSpec`] per terminal. The
//! cable detail of a range is the first bracket-free part that follows it on
//! the line, so `A, HR[1 to 2], SP[3 to 3], S-30 CTR1` gives both ranges the
//! cable `S-30 CTR1`.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Diagnostic, DiagnosticKind, RowSpec};

/// Widest range a single `[start to end]` may expand to.
pub const MAX_RANGE_SPAN: u32 = 500;

static BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^\[\]]*)\[([^\[\]]*)\]").expect("bracket regex"));

static RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(\d+)\s*to\s*(\d+)\s*$").expect("range regex"));

/// A `[start to end]` range with its label, before expansion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeMatch {
    pub label: String,
    pub start: u32,
    pub end: u32,
    /// Index of the comma part the range was found in.
    pub part: usize,
}

/// Parse a `start to end` bracket body. `None` when it is not a valid range.
pub fn parse_range(inner: &str) -> Option<(u32, u32)> {
    let caps = RANGE.captures(inner)?;
    let start = caps[1].parse().ok()?;
    let end = caps[2].parse().ok()?;
    Some((start, end))
}

fn is_cable_part(part: &str) -> bool {
    !part.is_empty() && !part.contains('[') && !part.contains(']')
}

/// Find every well-formed labelled range in `parts[1..]`.
///
/// Malformed brackets are reported to `diags` and skipped.
pub fn find_ranges(parts: &[&str], line: usize, diags: &mut Vec<Diagnostic>) -> Vec<RangeMatch> {
    let mut out = Vec::new();
    for (idx, part) in parts.iter().enumerate().skip(1) {
        if !part.contains('[') && !part.contains(']') {
            continue;
        }
        for caps in BRACKET.captures_iter(part) {
            let label = caps[1].trim().to_uppercase();
            let inner = &caps[2];
            match parse_range(inner) {
                Some((start, end)) if end < start => diags.push(Diagnostic::new(
                    line,
                    DiagnosticKind::MalformedRange,
                    format!("range [{}] ends before it starts", inner.trim()),
                )),
                Some((start, end)) if end - start >= MAX_RANGE_SPAN => diags.push(Diagnostic::new(
                    line,
                    DiagnosticKind::RangeTooWide,
                    format!(
                        "range [{}] spans more than {MAX_RANGE_SPAN} terminals",
                        inner.trim()
                    ),
                )),
                Some((start, end)) => out.push(RangeMatch {
                    label,
                    start,
                    end,
                    part: idx,
                }),
                None => diags.push(Diagnostic::new(
                    line,
                    DiagnosticKind::MalformedRange,
                    format!("cannot read [{}] as `start to end`", inner.trim()),
                )),
            }
        }
        // Anything bracket-like left over was not a complete `[...]`.
        if BRACKET.replace_all(part, "").contains(['[', ']']) {
            diags.push(Diagnostic::new(
                line,
                DiagnosticKind::MalformedRange,
                format!("unmatched bracket in `{part}`"),
            ));
        }
    }
    out
}

/// Expand one row line into terminal records.
///
/// Returns an empty list (plus a diagnostic) when the line has no usable
/// range; this never fails.
pub fn parse_row(line_text: &str, line: usize, diags: &mut Vec<Diagnostic>) -> Vec<RowSpec> {
    let parts: Vec<&str> = line_text.split(',').map(str::trim).collect();
    let row_id = parts.first().map(|p| p.to_uppercase()).unwrap_or_default();

    let ranges = find_ranges(&parts, line, diags);
    if ranges.is_empty() {
        diags.push(Diagnostic::new(
            line,
            DiagnosticKind::NoTerminals,
            format!("row line `{line_text}` produced no terminals"),
        ));
        return Vec::new();
    }

    let mut out = Vec::new();
    for m in ranges {
        let cable = parts[m.part + 1..]
            .iter()
            .find(|p| is_cable_part(p))
            .copied()
            .unwrap_or("");
        for n in m.start..=m.end {
            out.push(RowSpec::new(row_id.clone(), m.label.clone(), cable, n));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> (Vec<RowSpec>, Vec<Diagnostic>) {
        let mut d = Vec::new();
        let rows = parse_row(s, 1, &mut d);
        (rows, d)
    }

    #[test]
    fn expands_inclusive_range() {
        let (rows, diags) = parse("a, label[3 to 5]");
        assert!(diags.is_empty());
        let nums: Vec<&str> = rows.iter().map(|r| r.terminal_number.as_str()).collect();
        assert_eq!(nums, ["03", "04", "05"]);
        assert!(rows.iter().all(|r| r.function == "LABEL" && r.row_id == "A"));
        assert_eq!(rows[2].numeric_terminal, 5);
    }

    #[test]
    fn pairs_each_range_with_the_next_cable_part() {
        let (rows, _) = parse("B, HR[1 to 2], S-30 CTR1, SP[3 to 3], Goomty-1");
        assert_eq!(rows[0].cable_detail, "S-30 CTR1");
        assert_eq!(rows[1].cable_detail, "S-30 CTR1");
        assert_eq!(rows[2].function, "SP");
        assert_eq!(rows[2].cable_detail, "Goomty-1");
    }

    #[test]
    fn consecutive_ranges_share_the_trailing_cable() {
        let (rows, _) = parse("A, HR[1 to 1], SP[2 to 2], CAB");
        assert!(rows.iter().all(|r| r.cable_detail == "CAB"));
    }

    #[test]
    fn missing_cable_is_empty() {
        let (rows, _) = parse("A, SPARE[7 to 8]");
        assert!(rows.iter().all(|r| r.cable_detail.is_empty()));
    }

    #[test]
    fn case_insensitive_to_and_spacing() {
        let (rows, diags) = parse("C, X[ 9 TO 10 ]");
        assert!(diags.is_empty());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].terminal_number, "10");
    }

    #[test]
    fn three_digit_terminals_keep_all_digits() {
        let (rows, _) = parse("D, X[99 to 100]");
        assert_eq!(rows[1].terminal_number, "100");
    }

    #[test]
    fn malformed_ranges_are_dropped_with_diagnostics() {
        let (rows, diags) = parse("A, BAD[x to 3], REV[5 to 2], OK[1 to 1]");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].function, "OK");
        assert_eq!(
            diags
                .iter()
                .filter(|d| d.kind == DiagnosticKind::MalformedRange)
                .count(),
            2
        );
    }

    #[test]
    fn unmatched_bracket_contributes_nothing() {
        let (rows, diags) = parse("A, HR[1 to 2, CAB");
        assert!(rows.is_empty());
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::MalformedRange));
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::NoTerminals));
    }

    #[test]
    fn trailing_comma_is_harmless() {
        let (rows, _) = parse("A, HR[1 to 2],");
        assert_eq!(rows.len(), 2);
        assert!(rows[0].cable_detail.is_empty());
    }

    #[test]
    fn overly_wide_range_is_rejected() {
        let (rows, diags) = parse("A, X[1 to 100000]");
        assert!(rows.is_empty());
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::RangeTooWide));
    }

    #[test]
    fn duplicates_are_not_deduplicated() {
        let (rows, _) = parse("A, X[1 to 2], Y[2 to 2]");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].numeric_terminal, rows[2].numeric_terminal);
    }
}

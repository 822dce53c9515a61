//! Sheet aggregation: folds classified lines into per-sheet units.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{LineKind, classify};
use crate::error::{CtrError, Result};
use crate::model::{Diagnostic, DiagnosticKind, MetaKey, RowSpec, Sheet, SheetMeta, SymbolAnchor};
use crate::row::parse_row;
use crate::symbol::parse_directive;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Fail on the first diagnostic instead of collecting it.
    pub strict: bool,
    /// Metadata fields copied into the next sheet at a `SHEET:` boundary.
    pub carry_forward: Vec<MetaKey>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub sheets: Vec<Sheet>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Accumulator threaded through the line fold.
#[derive(Debug)]
struct Acc {
    done: Vec<Sheet>,
    current: Sheet,
    /// `false` while `current` is the implicit sheet at stream start.
    declared: bool,
    /// Line of the `SHEET:` that opened `current`.
    opened_at: usize,
    diags: Vec<Diagnostic>,
}

impl Acc {
    fn new() -> Self {
        Acc {
            done: Vec::new(),
            current: Sheet::new(1),
            declared: false,
            opened_at: 0,
            diags: Vec::new(),
        }
    }

    fn boundary(mut self, number: u32, line: usize, opts: &ParseOptions) -> Self {
        let mut next = Sheet::new(number);
        if self.current.is_empty() {
            if self.declared {
                self.diags.push(Diagnostic::new(
                    self.opened_at,
                    DiagnosticKind::EmptySheet,
                    format!("sheet {} has no rows or symbols; skipped", self.current.number),
                ));
                carry(&self.current.meta, &mut next.meta, &opts.carry_forward);
            } else {
                // metadata written before the first SHEET: belongs to it
                next.meta = std::mem::take(&mut self.current.meta);
            }
        } else {
            carry(&self.current.meta, &mut next.meta, &opts.carry_forward);
            let prev = std::mem::take(&mut self.current);
            self.finalize(prev);
        }
        self.current = next;
        self.declared = true;
        self.opened_at = line;
        self
    }

    fn finalize(&mut self, mut sheet: Sheet) {
        sheet.sort_rows();
        report_duplicates(&sheet, &mut self.diags);
        debug!(
            sheet = sheet.number,
            rows = sheet.rows.len(),
            symbols = sheet.symbols.len(),
            "sheet finalized"
        );
        self.done.push(sheet);
    }

    fn finish(mut self) -> ParsedDocument {
        let last = std::mem::take(&mut self.current);
        if !last.is_empty() {
            self.finalize(last);
        } else if self.declared {
            self.diags.push(Diagnostic::new(
                self.opened_at,
                DiagnosticKind::EmptySheet,
                format!("sheet {} has no rows or symbols; skipped", last.number),
            ));
        }
        ParsedDocument {
            sheets: self.done,
            diagnostics: self.diags,
        }
    }
}

fn carry(from: &SheetMeta, to: &mut SheetMeta, keys: &[MetaKey]) {
    for key in keys {
        to.set(*key, from.get(*key));
    }
}

fn report_duplicates(sheet: &Sheet, diags: &mut Vec<Diagnostic>) {
    // rows are sorted, so duplicates are adjacent
    for pair in sheet.rows.windows(2) {
        if pair[0].row_id == pair[1].row_id && pair[0].numeric_terminal == pair[1].numeric_terminal
        {
            diags.push(Diagnostic::new(
                0,
                DiagnosticKind::DuplicateTerminal,
                format!(
                    "sheet {}: terminal {}{} declared more than once",
                    sheet.number, pair[0].row_id, pair[0].terminal_number
                ),
            ));
        }
    }
}

fn step(mut acc: Acc, (line_no, raw): (usize, &str), opts: &ParseOptions) -> Acc {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return acc;
    }
    match classify(line) {
        LineKind::SheetBoundary(n) => return acc.boundary(n, line_no, opts),
        LineKind::MetaField(key, value) => acc.current.meta.set(key, value),
        LineKind::SymbolDirective(syntax) => match parse_directive(&syntax, line, line_no) {
            Ok(d) => acc.current.symbols.push(d),
            Err(msg) => acc
                .diags
                .push(Diagnostic::new(line_no, DiagnosticKind::MalformedSymbol, msg)),
        },
        LineKind::RowSpecLine => {
            let rows = parse_row(line, line_no, &mut acc.diags);
            acc.current.rows.extend(rows);
        }
    }
    acc
}

/// Parse a whole CTR text into sheets, in file order.
///
/// Permissive by default: malformed lines become diagnostics. With
/// `opts.strict` the first diagnostic is returned as [`CtrError::Parse`].
pub fn parse_document(text: &str, opts: &ParseOptions) -> Result<ParsedDocument> {
    let mut acc = Acc::new();
    for (i, raw) in text.lines().enumerate() {
        let seen = acc.diags.len();
        acc = step(acc, (i + 1, raw), opts);
        if opts.strict
            && let Some(d) = acc.diags.get(seen)
        {
            return Err(CtrError::Parse {
                line: d.line,
                message: d.message.clone(),
            });
        }
    }
    let doc = acc.finish();
    if opts.strict
        && let Some(d) = doc.diagnostics.first()
    {
        return Err(CtrError::Parse {
            line: d.line,
            message: d.message.clone(),
        });
    }
    Ok(doc)
}

fn write_symbol(d: &crate::model::SymbolDirective, out: &mut String) {
    let mut line = match &d.anchor {
        SymbolAnchor::Range { row, start, end } => {
            format!("SYMBOL: {} [{row}, {start} to {end}]", d.symbol_type)
        }
        SymbolAnchor::Position { row, terminal } => {
            format!("SYMBOL: {} [{row}, {terminal}]", d.symbol_type)
        }
        SymbolAnchor::Absolute { x, y } => {
            let (w, h) = d.size.unwrap_or((0.0, 0.0));
            let mut s = format!("SYMBOL, {}, {x}, {y}, {w}, {h}", d.symbol_type);
            if let Some(l) = &d.label {
                s.push_str(&format!(", {l}"));
            }
            out.push_str(&s);
            out.push('\n');
            return;
        }
    };
    if let Some(l) = &d.label {
        line.push_str(&format!(", {l}"));
    }
    if let Some((w, h)) = d.size {
        line.push_str(&format!(", {w}x{h}"));
    }
    out.push_str(&line);
    out.push('\n');
}

/// Collapse a sorted row into `(first, last)` runs of consecutive terminals
/// sharing function and cable.
fn row_runs<'a>(rows: &[&'a RowSpec]) -> Vec<(&'a RowSpec, &'a RowSpec)> {
    let mut runs: Vec<(&RowSpec, &RowSpec)> = Vec::new();
    for &r in rows {
        if let Some((first, last)) = runs.last_mut()
            && first.function == r.function
            && first.cable_detail == r.cable_detail
            && last.numeric_terminal.checked_add(1) == Some(r.numeric_terminal)
        {
            *last = r;
            continue;
        }
        runs.push((r, r));
    }
    runs
}

/// Serialize sheets back to canonical CTR text.
///
/// Re-parsing the output yields the same sheets as long as labels contain no
/// commas or brackets.
pub fn write_document(sheets: &[Sheet]) -> String {
    let mut out = String::new();
    for (i, sheet) in sheets.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("SHEET: {}\n", sheet.number));
        for l in sheet.meta.to_lines() {
            out.push_str(&l);
            out.push('\n');
        }
        for id in sheet.row_ids() {
            for (first, last) in row_runs(&sheet.row(id)) {
                let mut line = format!(
                    "{id}, {}[{} to {}]",
                    first.function, first.numeric_terminal, last.numeric_terminal
                );
                if !first.cable_detail.is_empty() {
                    line.push_str(&format!(", {}", first.cable_detail));
                }
                out.push_str(&line);
                out.push('\n');
            }
        }
        for d in &sheet.symbols {
            write_symbol(d, &mut out);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParsedDocument {
        parse_document(text, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn single_implicit_sheet() {
        let doc = parse("STATION: KUR\nA, HR[1 to 2], CAB\n");
        assert_eq!(doc.sheets.len(), 1);
        assert_eq!(doc.sheets[0].number, 1);
        assert_eq!(doc.sheets[0].meta.station, "KUR");
        assert_eq!(doc.sheets[0].rows.len(), 2);
    }

    #[test]
    fn preamble_metadata_belongs_to_first_declared_sheet() {
        let doc = parse("STATION: KUR\nSHEET: 3\nA, HR[1 to 1]\n");
        assert_eq!(doc.sheets.len(), 1);
        assert_eq!(doc.sheets[0].number, 3);
        assert_eq!(doc.sheets[0].meta.station, "KUR");
        assert!(doc.diagnostics.is_empty());
    }

    #[test]
    fn metadata_does_not_leak_between_sheets() {
        let doc = parse(
            "SHEET: 1\nSTATION: KUR\nHEADING: H1\nA, X[1 to 1]\nSHEET: 2\nA, X[2 to 2]\n",
        );
        assert_eq!(doc.sheets.len(), 2);
        assert_eq!(doc.sheets[0].meta.station, "KUR");
        assert_eq!(doc.sheets[1].meta, SheetMeta::default());
    }

    #[test]
    fn carry_forward_copies_only_listed_keys() {
        let opts = ParseOptions {
            carry_forward: vec![MetaKey::Station],
            ..Default::default()
        };
        let text = "SHEET: 1\nSTATION: KUR\nHEADING: H1\nA, X[1 to 1]\nSHEET: 2\nA, X[2 to 2]\n";
        let doc = parse_document(text, &opts).unwrap();
        assert_eq!(doc.sheets[1].meta.station, "KUR");
        assert_eq!(doc.sheets[1].meta.heading, "");
    }

    #[test]
    fn rows_are_sorted_within_a_sheet() {
        let doc = parse("B, X[2 to 3]\nA, Y[5 to 5]\nA, Z[1 to 1]\n");
        let keys: Vec<(String, u32)> = doc.sheets[0]
            .rows
            .iter()
            .map(|r| (r.row_id.clone(), r.numeric_terminal))
            .collect();
        assert_eq!(
            keys,
            [
                ("A".to_string(), 1),
                ("A".to_string(), 5),
                ("B".to_string(), 2),
                ("B".to_string(), 3)
            ]
        );
    }

    #[test]
    fn sheets_stay_in_file_order() {
        let doc = parse("SHEET: 5\nA, X[1 to 1]\nSHEET: 2\nA, X[1 to 1]\n");
        let nums: Vec<u32> = doc.sheets.iter().map(|s| s.number).collect();
        assert_eq!(nums, [5, 2]);
    }

    #[test]
    fn empty_declared_sheet_is_reported() {
        let doc = parse("SHEET: 1\nSHEET: 2\nA, X[1 to 1]\n");
        assert_eq!(doc.sheets.len(), 1);
        assert_eq!(doc.sheets[0].number, 2);
        assert_eq!(doc.diagnostics[0].kind, DiagnosticKind::EmptySheet);
        assert_eq!(doc.diagnostics[0].line, 1);
    }

    #[test]
    fn symbol_only_sheet_is_kept() {
        let doc = parse("SHEET: 1\nSYMBOL: FUSE [A, 1]\n");
        assert_eq!(doc.sheets.len(), 1);
        assert!(doc.sheets[0].rows.is_empty());
        assert_eq!(doc.sheets[0].symbols.len(), 1);
    }

    #[test]
    fn writing_the_largest_terminal_twice_does_not_overflow() {
        let doc = parse("A, X[4294967295 to 4294967295], C\nA, X[4294967295 to 4294967295], C\n");
        assert_eq!(doc.sheets[0].rows.len(), 2);
        let text = write_document(&doc.sheets);
        assert_eq!(text.matches("X[4294967295 to 4294967295]").count(), 2);
        assert_eq!(parse(&text).sheets[0].rows, doc.sheets[0].rows);
    }

    #[test]
    fn bad_lines_do_not_stop_the_parse() {
        let doc = parse("A, X[1 to\nSYMBOL: ???\nB, Y[1 to 1]\n");
        assert_eq!(doc.sheets[0].rows.len(), 1);
        let kinds: Vec<DiagnosticKind> = doc.diagnostics.iter().map(|d| d.kind).collect();
        assert!(kinds.contains(&DiagnosticKind::MalformedSymbol));
        assert!(kinds.contains(&DiagnosticKind::NoTerminals));
    }

    #[test]
    fn strict_mode_fails_on_first_problem() {
        let opts = ParseOptions {
            strict: true,
            ..Default::default()
        };
        let err = parse_document("A, X[1 to 1]\nB, Y[oops]\n", &opts).unwrap_err();
        match err {
            CtrError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn duplicates_are_kept_and_reported() {
        let doc = parse("A, X[1 to 2]\nA, Y[2 to 2]\n");
        assert_eq!(doc.sheets[0].rows.len(), 3);
        assert!(
            doc.diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::DuplicateTerminal)
        );
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let doc = parse("# header\n\n   \nA, X[1 to 1]\n");
        assert!(doc.diagnostics.is_empty());
        assert_eq!(doc.sheets[0].rows.len(), 1);
    }

    #[test]
    fn written_document_reparses_identically() {
        let text = "SHEET: 2\nSTATION: KUR\nSIP: SIP/7\nA, HR[1 to 2], S-30 CTR1, SP[3 to 3]\n\
                    B, X[4 to 6]\nSYMBOL: CHARGER [A, 2 to 3], CHG\nSYMBOL, FUSE, 10, 20, 30, 40, F1\n";
        let strip_lines = |mut doc: ParsedDocument| {
            for s in &mut doc.sheets {
                s.symbols.iter_mut().for_each(|d| d.line = 0);
            }
            doc.sheets
        };
        let first = parse(text);
        let again = parse(&write_document(&first.sheets));
        assert_eq!(strip_lines(first), strip_lines(again));
    }
}

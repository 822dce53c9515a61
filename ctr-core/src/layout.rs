//! Page layout: turns sorted sheets into positioned draw operations.
//!
//! All coordinates are PDF points with the origin at the bottom-left of the
//! page. Each terminal row chunk occupies one horizontal strip; a page holds
//! at most `max_rows_per_page` strips before a page break.

use serde::Serialize;
use tracing::debug;

use crate::config::{CableUnderSymbol, DrawingConfig, PageGeometry, SymbolMode};
use crate::group::group_runs;
use crate::metrics::{BRACKET_TEXT_BUFFER, fit_font_size};
use crate::model::{
    BracketGroup, Diagnostic, DiagnosticKind, GroupKind, RowSpec, Sheet, SheetMeta, SymbolAnchor,
    SymbolDirective,
};
use crate::row::MAX_RANGE_SPAN;

/// Bracket ends extend this far past the outer terminals.
pub const BRACKET_OVERSHOOT: f64 = 5.0;
/// Gap between the terminal body top and the function bracket.
const FUNCTION_BRACKET_GAP: f64 = 13.5;
/// Gap between the terminal body bottom and the cable bracket.
const CABLE_BRACKET_GAP: f64 = 13.5;
const TICK: f64 = 5.0;
const TERMINAL_HALF_GAP: f64 = 3.0;
const TERMINAL_DOT_RADIUS: f64 = 3.0;
const ROW_LABEL_GAP: f64 = 35.0;
const SYMBOL_LABEL_SIZE: f64 = 7.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

/// One primitive handed to a [`crate::surface::Surface`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        width: f64,
    },
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        width: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        filled: bool,
    },
    Text {
        x: f64,
        y: f64,
        size: f64,
        anchor: TextAnchor,
        text: String,
    },
    /// A symbol glyph with its bottom-left corner at `(x, y)`.
    Symbol {
        symbol_type: String,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page {
    /// Sheet number declared in the source.
    pub sheet_number: u32,
    /// Number printed in the title block; grows by one per overflow page.
    pub rendered_number: u32,
    /// 0 for the first page of a sheet.
    pub page_in_sheet: usize,
    pub meta: SheetMeta,
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// All text drawn on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn symbols(&self) -> impl Iterator<Item = &DrawOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Symbol { .. }))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Layout {
    pub pages: Vec<Page>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Mutable layout position on the current page.
#[derive(Clone, Debug, PartialEq)]
pub struct PageCursor {
    pub x_origin: f64,
    pub y_current: f64,
    pub rows_on_page: usize,
    pub current_sheet_number: u32,
}

impl PageCursor {
    pub fn new(geom: &PageGeometry, sheet_number: u32) -> Self {
        PageCursor {
            x_origin: geom.left_reserved,
            y_current: geom.height - geom.top_offset,
            rows_on_page: 0,
            current_sheet_number: sheet_number,
        }
    }

    pub fn page_full(&self, geom: &PageGeometry) -> bool {
        self.rows_on_page >= geom.max_rows_per_page
    }

    pub fn page_break(&mut self, geom: &PageGeometry) {
        self.current_sheet_number += 1;
        self.y_current = geom.height - geom.top_offset;
        self.rows_on_page = 0;
    }

    pub fn advance(&mut self, geom: &PageGeometry) {
        self.y_current -= geom.row_pitch;
        self.rows_on_page += 1;
    }

    pub fn slot_x(&self, idx: usize, geom: &PageGeometry) -> f64 {
        self.x_origin + idx as f64 * geom.pitch
    }
}

/// Split one row's terminals into page-row chunks of `slots` terminals.
pub fn chunk_row<T>(terminals: &[T], slots: usize) -> Vec<&[T]> {
    terminals.chunks(slots.max(1)).collect()
}

fn text(x: f64, y: f64, size: f64, anchor: TextAnchor, s: impl Into<String>) -> DrawOp {
    DrawOp::Text {
        x,
        y,
        size,
        anchor,
        text: s.into(),
    }
}

fn line(x1: f64, y1: f64, x2: f64, y2: f64, width: f64) -> DrawOp {
    DrawOp::Line {
        x1,
        y1,
        x2,
        y2,
        width,
    }
}

/// Border, title block and footer shared by every page.
fn page_template(meta: &SheetMeta, rendered_number: u32, cfg: &DrawingConfig) -> Vec<DrawOp> {
    let w = cfg.page.width;
    let h = cfg.page.height;
    let m = 10.0;
    let title_bottom = h - m - 80.0;
    let footer_top = m + 45.0;
    let mut ops = vec![
        DrawOp::Rect {
            x: m,
            y: m,
            w: w - 2.0 * m,
            h: h - 2.0 * m,
            width: 1.5,
        },
        line(m, title_bottom, w - m, title_bottom, 1.0),
        line(m, footer_top, w - m, footer_top, 1.0),
    ];
    let fields = [
        ("STATION", &meta.station),
        ("LOCATION", &meta.location),
        ("SIP", &meta.sip),
    ];
    for (i, (key, value)) in fields.iter().enumerate() {
        ops.push(text(
            m + 20.0,
            h - m - 22.0 - i as f64 * 20.0,
            10.0,
            TextAnchor::Start,
            format!("{key}: {value}"),
        ));
    }
    if !meta.heading.is_empty() {
        ops.push(text(
            w / 2.0,
            h - m - 45.0,
            16.0,
            TextAnchor::Middle,
            meta.heading.clone(),
        ));
    }
    ops.push(text(
        w - m - 20.0,
        h - m - 22.0,
        12.0,
        TextAnchor::End,
        format!("SHEET NO: {rendered_number}"),
    ));

    let sig = &cfg.signatures;
    let sig_y = m + 18.0;
    ops.push(text(
        m + 20.0,
        sig_y,
        9.0,
        TextAnchor::Start,
        format!("PREPARED BY: {}", sig.prepared_by),
    ));
    ops.push(text(
        w / 2.0,
        sig_y,
        9.0,
        TextAnchor::Middle,
        format!("CHECKED BY: {}", sig.checked_by),
    ));
    ops.push(text(
        w - m - 20.0,
        sig_y,
        9.0,
        TextAnchor::End,
        format!("APPROVED BY: {}", sig.approved_by),
    ));
    ops
}

fn draw_terminal(ops: &mut Vec<DrawOp>, x: f64, y: f64, number: &str, cfg: &DrawingConfig) {
    let th = cfg.page.terminal_height;
    ops.push(line(x - TERMINAL_HALF_GAP, y, x - TERMINAL_HALF_GAP, y + th, 1.0));
    ops.push(line(x + TERMINAL_HALF_GAP, y, x + TERMINAL_HALF_GAP, y + th, 1.0));
    for cy in [y + th, y] {
        ops.push(DrawOp::Circle {
            cx: x,
            cy,
            r: TERMINAL_DOT_RADIUS,
            filled: true,
        });
    }
    ops.push(text(
        x - 8.0,
        y + th * 0.425,
        cfg.fonts.terminal,
        TextAnchor::End,
        number,
    ));
}

/// Horizontal bracket from `x1` to `x2` at height `y` with a fitted label.
///
/// Function brackets (above the row) have their end ticks pointing down and
/// the label above; cable brackets mirror that below the row.
pub fn draw_bracket(
    ops: &mut Vec<DrawOp>,
    x1: f64,
    x2: f64,
    y: f64,
    label: &str,
    kind: GroupKind,
    cfg: &DrawingConfig,
) {
    let start_size = match kind {
        GroupKind::Function => cfg.fonts.function,
        GroupKind::Cable => cfg.fonts.cable,
    };
    let mid = (x1 + x2) / 2.0;
    let size = fit_font_size(
        label,
        (x2 - x1) + BRACKET_TEXT_BUFFER,
        start_size,
        cfg.fonts.min,
        cfg.fonts.step,
    );
    ops.push(line(x1, y, x2, y, 0.8));
    match kind {
        GroupKind::Function => {
            ops.push(line(x1, y, x1, y - TICK, 0.8));
            ops.push(line(x2, y, x2, y - TICK, 0.8));
            ops.push(line(mid, y, mid, y + TICK, 0.8));
            ops.push(text(mid, y + 10.0, size, TextAnchor::Middle, label));
        }
        GroupKind::Cable => {
            ops.push(line(x1, y, x1, y + TICK, 0.8));
            ops.push(line(x2, y, x2, y + TICK, 0.8));
            ops.push(line(mid, y, mid, y - TICK, 0.8));
            ops.push(text(mid, y - (size + 8.0), size, TextAnchor::Middle, label));
        }
    }
}

/// Cable groups for one chunk, honouring the symbol overlap policy.
///
/// `covered[i]` is true when slot `i` sits under a symbol.
pub fn cable_groups(
    chunk: &[&RowSpec],
    covered: &[bool],
    policy: CableUnderSymbol,
) -> Vec<BracketGroup> {
    let any_covered = covered.iter().any(|c| *c);
    match policy {
        CableUnderSymbol::Render => group_runs(chunk, GroupKind::Cable),
        CableUnderSymbol::Suppress if any_covered => Vec::new(),
        CableUnderSymbol::Suppress => group_runs(chunk, GroupKind::Cable),
        CableUnderSymbol::Truncate => {
            let mut out = Vec::new();
            let mut start = 0;
            while start < chunk.len() {
                if covered[start] {
                    start += 1;
                    continue;
                }
                let end = (start..chunk.len())
                    .find(|i| covered[*i])
                    .unwrap_or(chunk.len());
                for mut g in group_runs(&chunk[start..end], GroupKind::Cable) {
                    g.start_index += start;
                    g.end_index += start;
                    out.push(g);
                }
                start = end;
            }
            out
        }
    }
}

/// Default symbol footprint: range symbols widen to span their terminals.
fn symbol_size(d: &SymbolDirective, span: f64, cfg: &DrawingConfig) -> (f64, f64) {
    d.size
        .unwrap_or((cfg.symbols.width + span, cfg.symbols.height))
}

/// Terminal numbers that symbols on `row_id` cover but the row lacks.
///
/// They become empty slots after the row's last terminal, in ascending
/// order, so the symbol has somewhere to sit. Anchors spanning
/// `MAX_RANGE_SPAN` or more reserve nothing.
pub fn reserved_slots(
    row_id: &str,
    terminals: &[&RowSpec],
    symbols: &[SymbolDirective],
) -> Vec<u32> {
    let mut out: Vec<u32> = Vec::new();
    for d in symbols {
        let (start, end) = match &d.anchor {
            SymbolAnchor::Range { row, start, end } if row == row_id => (*start, *end),
            SymbolAnchor::Position { row, terminal } if row == row_id => (*terminal, *terminal),
            _ => continue,
        };
        if end < start || end - start >= MAX_RANGE_SPAN {
            continue;
        }
        for n in start..=end {
            if !terminals.iter().any(|t| t.numeric_terminal == n) && !out.contains(&n) {
                out.push(n);
            }
        }
    }
    out.sort_unstable();
    out
}

struct ChunkCtx<'a> {
    row_id: &'a str,
    chunk: &'a [&'a RowSpec],
    /// `true` for slots held open for a symbol, with no terminal drawn.
    free: &'a [bool],
    y: f64,
}

fn draw_chunk(
    ops: &mut Vec<DrawOp>,
    ctx: &ChunkCtx<'_>,
    cursor: &PageCursor,
    symbols: &[SymbolDirective],
    placed: &mut [bool],
    cfg: &DrawingConfig,
) {
    let geom = &cfg.page;
    let y = ctx.y;
    let th = geom.terminal_height;
    ops.push(text(
        cursor.x_origin - ROW_LABEL_GAP,
        y + 15.0,
        cfg.fonts.row_id,
        TextAnchor::End,
        ctx.row_id,
    ));

    // which symbols touch which slots of this chunk
    let mut hits: Vec<(usize, Vec<usize>)> = Vec::new();
    for (si, d) in symbols.iter().enumerate() {
        if d.anchor.row() != Some(ctx.row_id) {
            continue;
        }
        let idxs: Vec<usize> = ctx
            .chunk
            .iter()
            .enumerate()
            .filter(|(_, t)| d.anchor.covers(ctx.row_id, t.numeric_terminal))
            .map(|(i, _)| i)
            .collect();
        if !idxs.is_empty() {
            hits.push((si, idxs));
        }
    }
    let mut covered = vec![false; ctx.chunk.len()];
    for (_, idxs) in &hits {
        for i in idxs {
            covered[*i] = true;
        }
    }

    for (idx, t) in ctx.chunk.iter().enumerate() {
        if ctx.free[idx] || (cfg.symbols.mode == SymbolMode::Replace && covered[idx]) {
            continue;
        }
        draw_terminal(ops, cursor.slot_x(idx, geom), y, &t.terminal_number, cfg);
    }

    let bracket = |g: &BracketGroup| {
        (
            cursor.slot_x(g.start_index, geom) - BRACKET_OVERSHOOT,
            cursor.slot_x(g.end_index, geom) + BRACKET_OVERSHOOT,
        )
    };
    for g in group_runs(ctx.chunk, GroupKind::Function) {
        let (x1, x2) = bracket(&g);
        draw_bracket(ops, x1, x2, y + th + FUNCTION_BRACKET_GAP, &g.label, g.kind, cfg);
    }
    for g in cable_groups(ctx.chunk, &covered, cfg.symbols.cable_under_symbol) {
        let (x1, x2) = bracket(&g);
        draw_bracket(ops, x1, x2, y - CABLE_BRACKET_GAP, &g.label, g.kind, cfg);
    }

    for (si, idxs) in hits {
        let d = &symbols[si];
        placed[si] = true;
        let xs: Vec<f64> = idxs.iter().map(|i| cursor.slot_x(*i, geom)).collect();
        let cx = xs.iter().sum::<f64>() / xs.len() as f64;
        let span = xs.last().copied().unwrap_or(cx) - xs.first().copied().unwrap_or(cx);
        let (w, h) = symbol_size(d, span, cfg);
        let by = y + th / 2.0 - h / 2.0;
        ops.push(DrawOp::Symbol {
            symbol_type: d.symbol_type.clone(),
            x: cx - w / 2.0,
            y: by,
            w,
            h,
        });
        if let Some(label) = &d.label {
            ops.push(text(cx, by + h + 2.0, SYMBOL_LABEL_SIZE, TextAnchor::Middle, label));
        }
    }
}

fn open_page(sheet: &Sheet, cursor: &PageCursor, page_in_sheet: usize, cfg: &DrawingConfig) -> Page {
    Page {
        sheet_number: sheet.number,
        rendered_number: cursor.current_sheet_number,
        page_in_sheet,
        meta: sheet.meta.clone(),
        ops: page_template(&sheet.meta, cursor.current_sheet_number, cfg),
    }
}

/// Lay out one sheet. Always returns at least one page.
///
/// Rows are taken in the sheet's order, which the aggregator guarantees is
/// sorted by `(row_id, numeric_terminal)`.
pub fn layout_sheet(sheet: &Sheet, cfg: &DrawingConfig) -> Layout {
    let geom = &cfg.page;
    let slots = geom.slots_per_page_row();
    let mut cursor = PageCursor::new(geom, sheet.number);
    let mut pages = Vec::new();
    let mut page = open_page(sheet, &cursor, 0, cfg);
    let mut placed = vec![false; sheet.symbols.len()];
    let mut diagnostics = Vec::new();

    // rows that only carry symbols still get a strip
    let mut row_ids = sheet.row_ids();
    for id in sheet.symbols.iter().filter_map(|d| d.anchor.row()) {
        if !row_ids.contains(&id) {
            row_ids.push(id);
        }
    }

    for row_id in row_ids {
        let own = sheet.row(row_id);
        let reserved: Vec<RowSpec> = reserved_slots(row_id, &own, &sheet.symbols)
            .into_iter()
            .map(|n| RowSpec::new(row_id, "", "", n))
            .collect();
        let free: Vec<bool> = (0..own.len() + reserved.len())
            .map(|i| i >= own.len())
            .collect();
        let mut terminals = own;
        terminals.extend(reserved.iter());
        let chunks = chunk_row(&terminals, slots)
            .into_iter()
            .zip(chunk_row(&free, slots));
        for (chunk, free) in chunks {
            if cursor.page_full(geom) {
                debug!(
                    sheet = sheet.number,
                    page = pages.len() + 1,
                    "page full, breaking"
                );
                pages.push(page);
                cursor.page_break(geom);
                page = open_page(sheet, &cursor, pages.len(), cfg);
            }
            let ctx = ChunkCtx {
                row_id,
                chunk,
                free,
                y: cursor.y_current,
            };
            draw_chunk(&mut page.ops, &ctx, &cursor, &sheet.symbols, &mut placed, cfg);
            cursor.advance(geom);
        }
    }
    // sheet end always flushes, even a partly filled page
    pages.push(page);

    for (si, d) in sheet.symbols.iter().enumerate() {
        match &d.anchor {
            SymbolAnchor::Absolute { x, y } => {
                let (w, h) = symbol_size(d, 0.0, cfg);
                let first = &mut pages[0];
                first.ops.push(DrawOp::Symbol {
                    symbol_type: d.symbol_type.clone(),
                    x: *x,
                    y: *y,
                    w,
                    h,
                });
                if let Some(label) = &d.label {
                    first.ops.push(text(
                        x + w / 2.0,
                        y + h + 2.0,
                        SYMBOL_LABEL_SIZE,
                        TextAnchor::Middle,
                        label,
                    ));
                }
            }
            _ if !placed[si] => diagnostics.push(Diagnostic::new(
                d.line,
                DiagnosticKind::SymbolAnchorNotFound,
                format!(
                    "sheet {}: {} symbol anchored on terminals that are not in row {}",
                    sheet.number,
                    d.symbol_type,
                    d.anchor.row().unwrap_or_default()
                ),
            )),
            _ => {}
        }
    }

    debug!(sheet = sheet.number, pages = pages.len(), "sheet laid out");
    Layout { pages, diagnostics }
}

/// Lay out every sheet and number the pages.
///
/// An empty document still produces one template-only page.
pub fn layout_document(sheets: &[Sheet], cfg: &DrawingConfig) -> Layout {
    let mut out = Layout::default();
    if sheets.is_empty() {
        out = layout_sheet(&Sheet::new(1), cfg);
    }
    for sheet in sheets {
        let l = layout_sheet(sheet, cfg);
        out.pages.extend(l.pages);
        out.diagnostics.extend(l.diagnostics);
    }
    let total = out.pages.len();
    let x = cfg.page.width - 30.0;
    for (i, page) in out.pages.iter_mut().enumerate() {
        page.ops.push(text(
            x,
            68.0,
            8.0,
            TextAnchor::End,
            format!("PAGE {} OF {total}", i + 1),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_with(row: &str, n: u32) -> Sheet {
        let mut s = Sheet::new(1);
        for i in 1..=n {
            s.rows.push(RowSpec::new(row, "F", "C", i));
        }
        s
    }

    fn narrow(slots: usize) -> DrawingConfig {
        let mut cfg = DrawingConfig::default();
        cfg.page.width = cfg.page.left_reserved + cfg.page.right_margin + slots as f64 * cfg.page.pitch;
        cfg
    }

    #[test]
    fn chunking_at_the_boundary() {
        let items: Vec<u32> = (0..6).collect();
        let chunks = chunk_row(&items, 5);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 5);
        assert_eq!(chunks[1].len(), 1);
        assert_eq!(chunk_row(&items, 6).len(), 1);
    }

    #[test]
    fn cursor_resets_on_page_break() {
        let geom = PageGeometry::default();
        let mut c = PageCursor::new(&geom, 4);
        let top = c.y_current;
        c.advance(&geom);
        c.advance(&geom);
        assert_eq!(c.rows_on_page, 2);
        assert_eq!(c.y_current, top - 2.0 * geom.row_pitch);
        c.page_break(&geom);
        assert_eq!(c.rows_on_page, 0);
        assert_eq!(c.y_current, top);
        assert_eq!(c.current_sheet_number, 5);
    }

    #[test]
    fn terminal_numbers_are_drawn_zero_padded() {
        let layout = layout_sheet(&sheet_with("A", 3), &DrawingConfig::default());
        assert_eq!(layout.pages.len(), 1);
        let texts: Vec<&str> = layout.pages[0].texts().collect();
        for n in ["01", "02", "03"] {
            assert!(texts.contains(&n), "missing {n}");
        }
    }

    #[test]
    fn one_bracket_per_group() {
        let mut s = Sheet::new(1);
        s.rows = vec![
            RowSpec::new("A", "HR", "C1", 1),
            RowSpec::new("A", "HR", "C1", 2),
            RowSpec::new("A", "SP", "C2", 3),
        ];
        let page = &layout_sheet(&s, &DrawingConfig::default()).pages[0];
        let texts: Vec<&str> = page.texts().collect();
        assert_eq!(texts.iter().filter(|t| **t == "HR").count(), 1);
        assert_eq!(texts.iter().filter(|t| **t == "C1").count(), 1);
        assert_eq!(texts.iter().filter(|t| **t == "SP").count(), 1);
    }

    #[test]
    fn bracket_spans_first_to_last_terminal_with_overshoot() {
        let cfg = DrawingConfig::default();
        let mut ops = Vec::new();
        let x0 = cfg.page.left_reserved;
        draw_bracket(&mut ops, x0 - 5.0, x0 + 35.0 + 5.0, 100.0, "HR", GroupKind::Function, &cfg);
        match &ops[0] {
            DrawOp::Line { x1, x2, y1, y2, .. } => {
                assert_eq!((*x1, *x2), (x0 - 5.0, x0 + 40.0));
                assert_eq!((*y1, *y2), (100.0, 100.0));
            }
            other => panic!("expected bracket line, got {other:?}"),
        }
        // end ticks point down for function brackets
        assert!(matches!(ops[1], DrawOp::Line { y2, .. } if y2 == 95.0));
    }

    #[test]
    fn long_rows_wrap_into_several_strips() {
        let cfg = narrow(5);
        let layout = layout_sheet(&sheet_with("A", 6), &cfg);
        let page = &layout.pages[0];
        let row_labels = page.texts().filter(|t| *t == "A").count();
        assert_eq!(row_labels, 2);
    }

    #[test]
    fn page_breaks_after_max_rows() {
        let cfg = narrow(1);
        // 7 one-slot strips with max 6 per page
        let layout = layout_sheet(&sheet_with("A", 7), &cfg);
        assert_eq!(layout.pages.len(), 2);
        assert_eq!(layout.pages[0].rendered_number, 1);
        assert_eq!(layout.pages[1].rendered_number, 2);
        assert_eq!(layout.pages[1].page_in_sheet, 1);
        assert_eq!(layout.pages[1].sheet_number, 1);
        assert!(layout.pages[1].texts().any(|t| t == "SHEET NO: 2"));
    }

    #[test]
    fn exactly_full_page_does_not_add_an_empty_one() {
        let cfg = narrow(1);
        let layout = layout_sheet(&sheet_with("A", 6), &cfg);
        assert_eq!(layout.pages.len(), 1);
    }

    #[test]
    fn empty_sheet_is_template_only() {
        let layout = layout_sheet(&Sheet::new(3), &DrawingConfig::default());
        assert_eq!(layout.pages.len(), 1);
        assert!(layout.pages[0].texts().any(|t| t == "SHEET NO: 3"));
        assert!(!layout.pages[0].ops.iter().any(|op| matches!(op, DrawOp::Circle { .. })));
    }

    #[test]
    fn empty_document_still_has_a_page() {
        let layout = layout_document(&[], &DrawingConfig::default());
        assert_eq!(layout.pages.len(), 1);
        assert!(layout.pages[0].texts().any(|t| t == "PAGE 1 OF 1"));
    }

    fn with_symbol(anchor: SymbolAnchor) -> Sheet {
        let mut s = sheet_with("A", 4);
        s.symbols.push(SymbolDirective {
            symbol_type: "CHARGER".into(),
            anchor,
            label: Some("CHG".into()),
            size: None,
            line: 9,
        });
        s
    }

    #[test]
    fn range_symbol_sits_at_the_mean_x() {
        let cfg = DrawingConfig::default();
        let s = with_symbol(SymbolAnchor::Range {
            row: "A".into(),
            start: 2,
            end: 3,
        });
        let layout = layout_sheet(&s, &cfg);
        let sym = layout.pages[0].symbols().next().expect("symbol drawn");
        let DrawOp::Symbol { x, w, .. } = sym else {
            unreachable!()
        };
        let centre = cfg.page.left_reserved + 1.5 * cfg.page.pitch;
        assert!((x + w / 2.0 - centre).abs() < 1e-9);
        assert_eq!(*w, cfg.symbols.width + cfg.page.pitch);
    }

    #[test]
    fn replace_mode_hides_covered_terminals() {
        let mut cfg = DrawingConfig::default();
        let s = with_symbol(SymbolAnchor::Position {
            row: "A".into(),
            terminal: 2,
        });
        let circles = |cfg: &DrawingConfig| {
            layout_sheet(&s, cfg).pages[0]
                .ops
                .iter()
                .filter(|op| matches!(op, DrawOp::Circle { .. }))
                .count()
        };
        assert_eq!(circles(&cfg), 8);
        cfg.symbols.mode = SymbolMode::Replace;
        assert_eq!(circles(&cfg), 6);
    }

    #[test]
    fn cable_policy_under_symbols() {
        let rows: Vec<RowSpec> = (1..=4).map(|i| RowSpec::new("A", "", "C", i)).collect();
        let refs: Vec<&RowSpec> = rows.iter().collect();
        let covered = [false, true, false, false];
        assert_eq!(cable_groups(&refs, &covered, CableUnderSymbol::Render).len(), 1);
        assert!(cable_groups(&refs, &covered, CableUnderSymbol::Suppress).is_empty());
        let truncated = cable_groups(&refs, &covered, CableUnderSymbol::Truncate);
        let spans: Vec<(usize, usize)> = truncated
            .iter()
            .map(|g| (g.start_index, g.end_index))
            .collect();
        assert_eq!(spans, [(0, 0), (2, 3)]);
        assert_eq!(
            cable_groups(&refs, &[false; 4], CableUnderSymbol::Suppress).len(),
            1
        );
    }

    #[test]
    fn unplaced_symbol_is_reported() {
        let s = with_symbol(SymbolAnchor::Range {
            row: "Z".into(),
            start: 1,
            end: 1 + MAX_RANGE_SPAN,
        });
        let layout = layout_sheet(&s, &DrawingConfig::default());
        assert_eq!(layout.diagnostics.len(), 1);
        assert_eq!(layout.diagnostics[0].kind, DiagnosticKind::SymbolAnchorNotFound);
        assert_eq!(layout.diagnostics[0].line, 9);
    }

    #[test]
    fn symbol_past_the_last_terminal_gets_free_slots() {
        let cfg = DrawingConfig::default();
        let s = with_symbol(SymbolAnchor::Range {
            row: "A".into(),
            start: 7,
            end: 8,
        });
        let layout = layout_sheet(&s, &cfg);
        assert!(layout.diagnostics.is_empty());
        let page = &layout.pages[0];
        let Some(DrawOp::Symbol { x, w, .. }) = page.symbols().next() else {
            panic!("symbol not drawn");
        };
        // terminals 1..=4 fill slots 0..=3, the symbol takes slots 4 and 5
        let centre = cfg.page.left_reserved + 4.5 * cfg.page.pitch;
        assert!((x + w / 2.0 - centre).abs() < 1e-9);
        // free slots get no terminal body and no number
        let circles = page
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Circle { .. }))
            .count();
        assert_eq!(circles, 8);
        assert!(!page.texts().any(|t| t == "07" || t == "08"));
    }

    #[test]
    fn symbol_only_row_is_laid_out() {
        let mut s = Sheet::new(1);
        s.symbols.push(SymbolDirective {
            symbol_type: "FUSE".into(),
            anchor: SymbolAnchor::Position {
                row: "A".into(),
                terminal: 1,
            },
            label: None,
            size: None,
            line: 2,
        });
        let layout = layout_sheet(&s, &DrawingConfig::default());
        assert!(layout.diagnostics.is_empty());
        assert_eq!(layout.pages[0].symbols().count(), 1);
        assert!(layout.pages[0].texts().any(|t| t == "A"));
    }

    #[test]
    fn reserved_slots_skip_existing_terminals() {
        let rows: Vec<RowSpec> = (1..=3).map(|n| RowSpec::new("A", "F", "C", n)).collect();
        let refs: Vec<&RowSpec> = rows.iter().collect();
        let symbols = [
            SymbolDirective {
                symbol_type: "CHOKE".into(),
                anchor: SymbolAnchor::Range {
                    row: "A".into(),
                    start: 3,
                    end: 5,
                },
                label: None,
                size: None,
                line: 1,
            },
            SymbolDirective {
                symbol_type: "FUSE".into(),
                anchor: SymbolAnchor::Position {
                    row: "B".into(),
                    terminal: 9,
                },
                label: None,
                size: None,
                line: 2,
            },
        ];
        assert_eq!(reserved_slots("A", &refs, &symbols), [4, 5]);
        assert_eq!(reserved_slots("B", &[], &symbols), [9]);
    }

    #[test]
    fn absolute_symbol_goes_on_the_first_page() {
        let mut s = Sheet::new(1);
        s.symbols.push(SymbolDirective {
            symbol_type: "FUSE".into(),
            anchor: SymbolAnchor::Absolute { x: 900.0, y: 500.0 },
            label: None,
            size: Some((30.0, 40.0)),
            line: 1,
        });
        let layout = layout_sheet(&s, &DrawingConfig::default());
        assert!(layout.diagnostics.is_empty());
        assert_eq!(
            layout.pages[0].symbols().next(),
            Some(&DrawOp::Symbol {
                symbol_type: "FUSE".into(),
                x: 900.0,
                y: 500.0,
                w: 30.0,
                h: 40.0
            })
        );
    }
}

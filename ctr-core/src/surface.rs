//! Drawing surfaces and the adapter that paints laid-out pages onto them.

use tracing::warn;

use crate::assets::{SymbolAssets, SymbolImage};
use crate::config::DrawingConfig;
use crate::error::Result;
use crate::layout::{DrawOp, Page, TextAnchor, layout_document};
use crate::metrics::fit_font_size;
use crate::model::{Diagnostic, DiagnosticKind, Sheet};

/// Point-based drawing target with a bottom-left origin.
pub trait Surface {
    fn begin_page(&mut self, width: f64, height: f64);
    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, width: f64);
    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, width: f64, dashed: bool);
    fn circle(&mut self, cx: f64, cy: f64, r: f64, filled: bool);
    fn text(&mut self, x: f64, y: f64, size: f64, anchor: TextAnchor, text: &str);
    /// Draw `img` scaled into the box with bottom-left `(x, y)`. `key` names
    /// the artwork so surfaces can embed it once.
    fn image(&mut self, key: &str, img: &SymbolImage, x: f64, y: f64, w: f64, h: f64);
    fn end_page(&mut self) -> Result<()>;
}

/// Output of a full render.
#[derive(Clone, Debug, Default)]
pub struct Rendered<T> {
    pub output: T,
    pub pages: usize,
    pub warnings: Vec<Diagnostic>,
}

fn placeholder<S: Surface>(
    surface: &mut S,
    symbol_type: &str,
    (x, y, w, h): (f64, f64, f64, f64),
    cfg: &DrawingConfig,
) {
    surface.rect(x, y, w, h, 0.8, true);
    let size = fit_font_size(symbol_type, w - 4.0, 7.0, cfg.fonts.min, cfg.fonts.step);
    surface.text(
        x + w / 2.0,
        y + h / 2.0 - size / 3.0,
        size,
        TextAnchor::Middle,
        symbol_type,
    );
}

/// Replay one page's draw operations. Symbols without artwork become a
/// dashed placeholder and a `MissingSymbolAsset` warning.
pub fn paint_page<S: Surface>(
    surface: &mut S,
    page: &Page,
    cfg: &DrawingConfig,
    assets: &SymbolAssets,
) -> Result<Vec<Diagnostic>> {
    let mut warnings = Vec::new();
    surface.begin_page(cfg.page.width, cfg.page.height);
    for op in &page.ops {
        match op {
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                width,
            } => surface.line(*x1, *y1, *x2, *y2, *width),
            DrawOp::Rect { x, y, w, h, width } => surface.rect(*x, *y, *w, *h, *width, false),
            DrawOp::Circle { cx, cy, r, filled } => surface.circle(*cx, *cy, *r, *filled),
            DrawOp::Text {
                x,
                y,
                size,
                anchor,
                text,
            } => surface.text(*x, *y, *size, *anchor, text),
            DrawOp::Symbol {
                symbol_type,
                x,
                y,
                w,
                h,
            } => match assets.get(symbol_type) {
                Some(img) => surface.image(symbol_type, img, *x, *y, *w, *h),
                None => {
                    warn!(symbol = %symbol_type, sheet = page.sheet_number, "no artwork for symbol");
                    placeholder(surface, symbol_type, (*x, *y, *w, *h), cfg);
                    warnings.push(Diagnostic::new(
                        0,
                        DiagnosticKind::MissingSymbolAsset,
                        format!(
                            "sheet {}: no artwork for symbol {symbol_type}, drew a placeholder",
                            page.sheet_number
                        ),
                    ));
                }
            },
        }
    }
    surface.end_page()?;
    Ok(warnings)
}

/// Lay out `sheets` and paint every page onto `surface`.
///
/// Returns the page count and every layout and paint warning.
pub fn render_to<S: Surface>(
    surface: &mut S,
    sheets: &[Sheet],
    cfg: &DrawingConfig,
    assets: &SymbolAssets,
) -> Result<(usize, Vec<Diagnostic>)> {
    let layout = layout_document(sheets, cfg);
    for d in &layout.diagnostics {
        warn!("{d}");
    }
    let mut warnings = layout.diagnostics;
    for page in &layout.pages {
        warnings.extend(paint_page(surface, page, cfg, assets)?);
    }
    Ok((layout.pages.len(), warnings))
}

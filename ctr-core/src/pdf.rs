//! Multi-page PDF output with pdf-writer.
//!
//! Text uses the Helvetica-Bold base font with WinAnsi encoding, so widths
//! match [`crate::metrics`] and nothing is embedded. Symbol artwork becomes
//! Flate-compressed image XObjects, written once per symbol type.

use std::collections::HashMap;

use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};
use tracing::debug;

use crate::assets::{SymbolAssets, SymbolImage};
use crate::config::DrawingConfig;
use crate::error::{CtrError, Result};
use crate::layout::TextAnchor;
use crate::metrics::text_width;
use crate::model::Sheet;
use crate::surface::{Rendered, Surface, render_to};

const FONT_NAME: Name<'static> = Name(b"F1");
// Bezier control distance for a quarter circle
const KAPPA: f64 = 0.552_284_75;

struct PdfPage {
    width: f64,
    height: f64,
    content: Content,
    xobjects: Vec<(String, Ref)>,
}

pub struct PdfSurface {
    pdf: Pdf,
    next_id: i32,
    font_id: Ref,
    /// Symbol type -> (resource name, xobject ref).
    images: HashMap<String, (String, Ref)>,
    pages: Vec<PdfPage>,
    current: Option<PdfPage>,
}

impl Default for PdfSurface {
    fn default() -> Self {
        Self::new()
    }
}

/// Map text to WinAnsi bytes; characters outside Latin-1 become `?`.
fn winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ (0x20..=0x7e | 0xa0..=0xff) => code as u8,
            _ => b'?',
        })
        .collect()
}

impl PdfSurface {
    pub fn new() -> Self {
        PdfSurface {
            pdf: Pdf::new(),
            // 1..=3 are catalog, page tree and font
            next_id: 4,
            font_id: Ref::new(3),
            images: HashMap::new(),
            pages: Vec::new(),
            current: None,
        }
    }

    fn alloc(&mut self) -> Ref {
        let r = Ref::new(self.next_id);
        self.next_id += 1;
        r
    }

    fn content(&mut self) -> Option<&mut Content> {
        self.current.as_mut().map(|p| &mut p.content)
    }

    /// Write the image once and return its resource name.
    fn embed(&mut self, key: &str, img: &SymbolImage) -> (String, Ref) {
        if let Some(hit) = self.images.get(key) {
            return hit.clone();
        }
        let xobj_ref = self.alloc();
        let name = format!("Im{}", self.images.len() + 1);
        let rgb: Vec<u8> = img
            .rgba
            .chunks_exact(4)
            .flat_map(|p| [p[0], p[1], p[2]])
            .collect();
        let mask_ref = if img.has_alpha() {
            let alpha: Vec<u8> = img.rgba.chunks_exact(4).map(|p| p[3]).collect();
            let mask_ref = self.alloc();
            let compressed = compress_to_vec_zlib(&alpha, 6);
            let mut mask = self.pdf.image_xobject(mask_ref, &compressed);
            mask.filter(Filter::FlateDecode);
            mask.width(img.width as i32);
            mask.height(img.height as i32);
            mask.color_space().device_gray();
            mask.bits_per_component(8);
            Some(mask_ref)
        } else {
            None
        };
        let compressed = compress_to_vec_zlib(&rgb, 6);
        let mut xobj = self.pdf.image_xobject(xobj_ref, &compressed);
        xobj.filter(Filter::FlateDecode);
        xobj.width(img.width as i32);
        xobj.height(img.height as i32);
        xobj.color_space().device_rgb();
        xobj.bits_per_component(8);
        if let Some(mask_ref) = mask_ref {
            xobj.s_mask(mask_ref);
        }
        drop(xobj);
        debug!(symbol = key, name = %name, "embedded symbol image");
        let entry = (name, xobj_ref);
        self.images.insert(key.to_string(), entry.clone());
        entry
    }

    /// Assemble the document. Fails if a page was left open.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.current.is_some() {
            return Err(CtrError::Pdf("page was not ended".into()));
        }
        let catalog_id = Ref::new(1);
        let tree_id = Ref::new(2);
        let pages = std::mem::take(&mut self.pages);
        let mut page_ids = Vec::with_capacity(pages.len());
        for page in pages {
            let page_id = self.alloc();
            let content_id = self.alloc();
            page_ids.push(page_id);

            let raw = page.content.finish();
            let compressed = compress_to_vec_zlib(raw.as_slice(), 6);
            self.pdf
                .stream(content_id, &compressed)
                .filter(Filter::FlateDecode);

            let mut p = self.pdf.page(page_id);
            p.media_box(Rect::new(0.0, 0.0, page.width as f32, page.height as f32))
                .parent(tree_id)
                .contents(content_id);
            let mut resources = p.resources();
            resources.fonts().pair(FONT_NAME, self.font_id);
            if !page.xobjects.is_empty() {
                let mut xobjects = resources.x_objects();
                for (name, r) in &page.xobjects {
                    xobjects.pair(Name(name.as_bytes()), *r);
                }
            }
        }
        self.pdf
            .type1_font(self.font_id)
            .base_font(Name(b"Helvetica-Bold"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        self.pdf.catalog(catalog_id).pages(tree_id);
        let count = page_ids.len() as i32;
        self.pdf.pages(tree_id).kids(page_ids).count(count);
        Ok(self.pdf.finish())
    }
}

impl Surface for PdfSurface {
    fn begin_page(&mut self, width: f64, height: f64) {
        self.current = Some(PdfPage {
            width,
            height,
            content: Content::new(),
            xobjects: Vec::new(),
        });
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, width: f64) {
        let Some(c) = self.content() else { return };
        c.set_line_width(width as f32);
        c.move_to(x1 as f32, y1 as f32);
        c.line_to(x2 as f32, y2 as f32);
        c.stroke();
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, width: f64, dashed: bool) {
        let Some(c) = self.content() else { return };
        c.save_state();
        c.set_line_width(width as f32);
        if dashed {
            c.set_dash_pattern([3.0, 2.0], 0.0);
        }
        c.rect(x as f32, y as f32, w as f32, h as f32);
        c.stroke();
        c.restore_state();
    }

    fn circle(&mut self, cx: f64, cy: f64, r: f64, filled: bool) {
        let Some(c) = self.content() else { return };
        let k = r * KAPPA;
        let p = |x: f64, y: f64| ((cx + x) as f32, (cy + y) as f32);
        let (x0, y0) = p(r, 0.0);
        c.move_to(x0, y0);
        for [(ax, ay), (bx, by), (ex, ey)] in [
            [(r, k), (k, r), (0.0, r)],
            [(-k, r), (-r, k), (-r, 0.0)],
            [(-r, -k), (-k, -r), (0.0, -r)],
            [(k, -r), (r, -k), (r, 0.0)],
        ] {
            let (ax, ay) = p(ax, ay);
            let (bx, by) = p(bx, by);
            let (ex, ey) = p(ex, ey);
            c.cubic_to(ax, ay, bx, by, ex, ey);
        }
        c.close_path();
        if filled {
            c.fill_nonzero();
        } else {
            c.stroke();
        }
    }

    fn text(&mut self, x: f64, y: f64, size: f64, anchor: TextAnchor, text: &str) {
        let x = match anchor {
            TextAnchor::Start => x,
            TextAnchor::Middle => x - text_width(text, size) / 2.0,
            TextAnchor::End => x - text_width(text, size),
        };
        let bytes = winansi(text);
        let Some(c) = self.content() else { return };
        c.begin_text()
            .set_font(FONT_NAME, size as f32)
            .next_line(x as f32, y as f32)
            .show(Str(&bytes))
            .end_text();
    }

    fn image(&mut self, key: &str, img: &SymbolImage, x: f64, y: f64, w: f64, h: f64) {
        if self.current.is_none() {
            return;
        }
        let (name, r) = self.embed(key, img);
        let Some(page) = self.current.as_mut() else {
            return;
        };
        if !page.xobjects.iter().any(|(n, _)| *n == name) {
            page.xobjects.push((name.clone(), r));
        }
        let c = &mut page.content;
        c.save_state();
        c.transform([w as f32, 0.0, 0.0, h as f32, x as f32, y as f32]);
        c.x_object(Name(name.as_bytes()));
        c.restore_state();
    }

    fn end_page(&mut self) -> Result<()> {
        let page = self
            .current
            .take()
            .ok_or_else(|| CtrError::Pdf("end_page without begin_page".into()))?;
        self.pages.push(page);
        Ok(())
    }
}

/// Render all sheets into one PDF document.
pub fn render_pdf(
    sheets: &[Sheet],
    cfg: &DrawingConfig,
    assets: &SymbolAssets,
) -> Result<Rendered<Vec<u8>>> {
    let mut surface = PdfSurface::new();
    let (pages, warnings) = render_to(&mut surface, sheets, cfg, assets)?;
    Ok(Rendered {
        output: surface.finish()?,
        pages,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RowSpec;

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack
            .windows(needle.len())
            .filter(|w| *w == needle)
            .count()
    }

    #[test]
    fn winansi_replaces_unmapped_chars() {
        assert_eq!(winansi("A-1"), b"A-1");
        assert_eq!(winansi("é"), [0xe9]);
        assert_eq!(winansi("→"), b"?");
    }

    #[test]
    fn writes_a_page_object_per_page() {
        let mut sheet = Sheet::new(1);
        sheet.rows.push(RowSpec::new("A", "F", "C", 1));
        let r = render_pdf(
            &[sheet.clone(), Sheet { number: 2, ..sheet }],
            &DrawingConfig::default(),
            &SymbolAssets::new(),
        )
        .unwrap();
        assert_eq!(r.pages, 2);
        assert!(r.output.starts_with(b"%PDF-"));
        let pages = count(&r.output, b"/Type /Page") - count(&r.output, b"/Type /Pages");
        assert_eq!(pages, 2);
        assert_eq!(count(&r.output, b"/Helvetica-Bold"), 1);
    }

    #[test]
    fn unbalanced_pages_are_an_error() {
        let mut s = PdfSurface::new();
        assert!(s.end_page().is_err());
        s.begin_page(100.0, 100.0);
        assert!(s.finish().is_err());
    }
}

//! SVG output, one document per page.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::assets::{SymbolAssets, SymbolImage};
use crate::config::DrawingConfig;
use crate::error::Result;
use crate::layout::TextAnchor;
use crate::model::Sheet;
use crate::surface::{Rendered, Surface, render_to};

#[derive(Debug, Default)]
pub struct SvgSurface {
    pages: Vec<String>,
    current: String,
    height: f64,
}

impl SvgSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_pages(self) -> Vec<String> {
        self.pages
    }

    // SVG is y-down
    fn y(&self, y: f64) -> f64 {
        self.height - y
    }
}

pub(crate) fn svg_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl Surface for SvgSurface {
    fn begin_page(&mut self, width: f64, height: f64) {
        self.height = height;
        let s = &mut self.current;
        s.clear();
        s.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        s.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{:.2}pt\" height=\"{:.2}pt\" viewBox=\"0 0 {:.2} {:.2}\" stroke=\"#000\" fill=\"none\" font-family=\"Helvetica, Arial, sans-serif\" font-weight=\"bold\">\n",
            width, height, width, height
        ));
        s.push_str("<rect x=\"0\" y=\"0\" width=\"100%\" height=\"100%\" fill=\"#ffffff\" stroke=\"none\"/>\n");
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, width: f64) {
        let (y1, y2) = (self.y(y1), self.y(y2));
        self.current.push_str(&format!(
            "<path d=\"M {:.2} {:.2} L {:.2} {:.2}\" stroke-width=\"{}\"/>\n",
            x1, y1, x2, y2, width
        ));
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, width: f64, dashed: bool) {
        let top = self.y(y + h);
        let dash = if dashed {
            " stroke-dasharray=\"3 2\""
        } else {
            ""
        };
        self.current.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" stroke-width=\"{}\"{}/>\n",
            x, top, w, h, width, dash
        ));
    }

    fn circle(&mut self, cx: f64, cy: f64, r: f64, filled: bool) {
        let cy = self.y(cy);
        let fill = if filled { "#000" } else { "none" };
        self.current.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" stroke-width=\"0.5\"/>\n",
            cx, cy, r, fill
        ));
    }

    fn text(&mut self, x: f64, y: f64, size: f64, anchor: TextAnchor, text: &str) {
        let y = self.y(y);
        let anchor = match anchor {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        };
        self.current.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\" text-anchor=\"{}\" fill=\"#000\" stroke=\"none\">{}</text>\n",
            x,
            y,
            size,
            anchor,
            svg_escape(text)
        ));
    }

    fn image(&mut self, _key: &str, img: &SymbolImage, x: f64, y: f64, w: f64, h: f64) {
        let top = self.y(y + h);
        self.current.push_str(&format!(
            "<image x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" preserveAspectRatio=\"none\" xlink:href=\"data:image/png;base64,{}\"/>\n",
            x,
            top,
            w,
            h,
            STANDARD.encode(&img.png)
        ));
    }

    fn end_page(&mut self) -> Result<()> {
        self.current.push_str("</svg>\n");
        self.pages.push(std::mem::take(&mut self.current));
        Ok(())
    }
}

/// Render every page as a standalone SVG document.
pub fn render_svg(
    sheets: &[Sheet],
    cfg: &DrawingConfig,
    assets: &SymbolAssets,
) -> Result<Rendered<Vec<String>>> {
    let mut surface = SvgSurface::new();
    let (pages, warnings) = render_to(&mut surface, sheets, cfg, assets)?;
    Ok(Rendered {
        output: surface.into_pages(),
        pages,
        warnings,
    })
}

//! Symbol artwork, keyed by upper-cased symbol type.

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use png::{ColorType, Transformations};
use tracing::debug;

use crate::error::{CtrError, Result};

/// A decoded symbol image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolImage {
    pub width: u32,
    pub height: u32,
    /// 8-bit RGBA, row-major, no padding.
    pub rgba: Vec<u8>,
    /// The original PNG file, kept for embedding in SVG.
    pub png: Vec<u8>,
}

impl SymbolImage {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut decoder = png::Decoder::new(Cursor::new(bytes));
        decoder.set_transformations(Transformations::normalize_to_color8());
        let mut reader = decoder.read_info()?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf)?;
        buf.truncate(info.buffer_size());
        let rgba = match info.color_type {
            ColorType::Rgba => buf,
            ColorType::Rgb => buf
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            ColorType::GrayscaleAlpha => buf
                .chunks_exact(2)
                .flat_map(|p| [p[0], p[0], p[0], p[1]])
                .collect(),
            ColorType::Grayscale => buf.iter().flat_map(|g| [*g, *g, *g, 255]).collect(),
            ColorType::Indexed => {
                return Err(CtrError::Image("indexed PNG was not expanded".into()));
            }
        };
        Ok(SymbolImage {
            width: info.width,
            height: info.height,
            rgba,
            png: bytes.to_vec(),
        })
    }

    pub fn has_alpha(&self) -> bool {
        self.rgba.chunks_exact(4).any(|p| p[3] != 255)
    }
}

/// Case-insensitive map from symbol type to artwork.
#[derive(Clone, Debug, Default)]
pub struct SymbolAssets {
    images: HashMap<String, SymbolImage>,
}

impl SymbolAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes` and register them under `symbol_type`.
    pub fn insert_png(&mut self, symbol_type: &str, bytes: &[u8]) -> Result<()> {
        let img = SymbolImage::decode(bytes)?;
        self.images.insert(symbol_type.trim().to_uppercase(), img);
        Ok(())
    }

    pub fn get(&self, symbol_type: &str) -> Option<&SymbolImage> {
        self.images.get(&symbol_type.trim().to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Load every `<TYPE>.png` in `dir`. Other files are ignored.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut assets = SymbolAssets::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_png = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("png"));
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_png {
                continue;
            }
            let bytes = fs::read(&path)?;
            assets.insert_png(stem, &bytes).map_err(|e| {
                CtrError::Image(format!("{}: {e}", path.display()))
            })?;
            debug!(symbol = stem, "loaded symbol asset");
        }
        Ok(assets)
    }
}

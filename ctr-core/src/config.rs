//! Drawing configuration. Every field has a default, so a config file only
//! needs the values it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CtrError, Result};
use crate::metrics::{DEFAULT_FONT_STEP, DEFAULT_MIN_FONT_SIZE};

/// Page geometry in points. Defaults to A3 landscape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    /// Space left of the first terminal, holding the row id.
    pub left_reserved: f64,
    pub right_margin: f64,
    /// Horizontal distance between terminal slots.
    pub pitch: f64,
    /// Vertical distance between terminal rows.
    pub row_pitch: f64,
    pub max_rows_per_page: usize,
    /// Distance from the top edge to the first terminal row baseline.
    pub top_offset: f64,
    pub terminal_height: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        PageGeometry {
            width: 1190.55,
            height: 841.89,
            left_reserved: 120.0,
            right_margin: 40.0,
            pitch: 35.0,
            row_pitch: 110.0,
            max_rows_per_page: 6,
            top_offset: 170.0,
            terminal_height: 40.0,
        }
    }
}

impl PageGeometry {
    /// Terminal slots that fit on one row of a page, at least 1.
    pub fn slots_per_page_row(&self) -> usize {
        let usable = self.width - self.left_reserved - self.right_margin;
        if self.pitch <= 0.0 || usable <= 0.0 {
            return 1;
        }
        ((usable / self.pitch).floor() as usize).max(1)
    }
}

/// Starting font sizes in points. Bracket labels shrink from these to fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSizes {
    pub function: f64,
    pub cable: f64,
    pub terminal: f64,
    pub row_id: f64,
    pub min: f64,
    pub step: f64,
}

impl Default for FontSizes {
    fn default() -> Self {
        FontSizes {
            function: 10.0,
            cable: 9.0,
            terminal: 8.0,
            row_id: 16.0,
            min: DEFAULT_MIN_FONT_SIZE,
            step: DEFAULT_FONT_STEP,
        }
    }
}

/// How a symbol relates to the terminals under it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolMode {
    /// Terminals are drawn normally and the symbol is placed over them.
    #[default]
    Overlay,
    /// Covered terminals lose their body and number; the symbol stands in.
    Replace,
}

/// What happens to cable brackets in a row chunk that carries a symbol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CableUnderSymbol {
    /// Draw cable brackets as if the symbol were absent.
    #[default]
    Render,
    /// Split cable runs at covered slots and skip the covered slots.
    Truncate,
    /// Draw no cable brackets in that chunk.
    Suppress,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolOptions {
    pub mode: SymbolMode,
    pub cable_under_symbol: CableUnderSymbol,
    /// Default symbol size when a directive gives none.
    pub width: f64,
    pub height: f64,
}

impl Default for SymbolOptions {
    fn default() -> Self {
        SymbolOptions {
            mode: SymbolMode::default(),
            cable_under_symbol: CableUnderSymbol::default(),
            width: 28.0,
            height: 40.0,
        }
    }
}

/// Footer signature fields, printed verbatim.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signatures {
    pub prepared_by: String,
    pub checked_by: String,
    pub approved_by: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawingConfig {
    pub page: PageGeometry,
    pub fonts: FontSizes,
    pub symbols: SymbolOptions,
    pub signatures: Signatures,
}

impl DrawingConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: DrawingConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)?;
        Self::from_json(&txt)
    }

    /// Reject geometry the layout cannot work with.
    pub fn validate(&self) -> Result<()> {
        let p = &self.page;
        if !(p.width > 0.0 && p.height > 0.0) {
            return Err(CtrError::Config(format!(
                "page size {}x{} must be positive",
                p.width, p.height
            )));
        }
        if p.pitch <= 0.0 || p.row_pitch <= 0.0 {
            return Err(CtrError::Config("pitch and row_pitch must be positive".into()));
        }
        if p.max_rows_per_page == 0 {
            return Err(CtrError::Config("max_rows_per_page must be at least 1".into()));
        }
        let f = &self.fonts;
        if f.min <= 0.0 || f.step <= 0.0 {
            return Err(CtrError::Config("font min and step must be positive".into()));
        }
        for (name, size) in [
            ("function", f.function),
            ("cable", f.cable),
            ("terminal", f.terminal),
            ("row_id", f.row_id),
        ] {
            if size <= 0.0 {
                return Err(CtrError::Config(format!("{name} font size must be positive")));
            }
        }
        Ok(())
    }
}

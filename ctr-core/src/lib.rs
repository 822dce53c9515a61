//! Cable termination record (CTR) drawings for railway relay rooms.
//!
//! The pipeline runs in four steps:
//!
//! 1. [`parse_document`] folds CTR text into [`Sheet`]s plus [`Diagnostic`]s.
//! 2. [`group_runs`] collapses equal function / cable labels into brackets.
//! 3. [`layout_document`] positions terminals, brackets and symbols on pages.
//! 4. A [`Surface`] paints the pages, see [`render_pdf`] and [`render_svg`].
//!
//! ```no_run
//! use ctr_core::{DrawingConfig, ParseOptions, SymbolAssets, parse_document, render_pdf};
//!
//! let doc = parse_document("SHEET: 1\nA, HR[1 to 4], S-30", &ParseOptions::default())?;
//! let out = render_pdf(&doc.sheets, &DrawingConfig::default(), &SymbolAssets::new())?;
//! std::fs::write("ctr.pdf", out.output)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod assets;
pub mod classify;
pub mod config;
pub mod error;
pub mod group;
pub mod layout;
pub mod metrics;
pub mod model;
pub mod pdf;
pub mod row;
pub mod sheet;
pub mod surface;
pub mod svg;
pub mod symbol;
pub mod table;

pub use assets::{SymbolAssets, SymbolImage};
pub use config::{CableUnderSymbol, DrawingConfig, SymbolMode};
pub use error::{CtrError, Result};
pub use group::group_runs;
pub use layout::{DrawOp, Layout, Page, layout_document, layout_sheet};
pub use model::{
    BracketGroup, Diagnostic, DiagnosticKind, GroupKind, MetaKey, RowSpec, Sheet, SheetMeta,
    SymbolAnchor, SymbolDirective,
};
pub use pdf::{PdfSurface, render_pdf};
pub use sheet::{ParseOptions, ParsedDocument, parse_document, write_document};
pub use surface::{Rendered, Surface};
pub use svg::{SvgSurface, render_svg};
pub use table::{TableRow, sheets_from_json, sheets_from_table};

//! ctrdraw - render cable termination record drawings
//!
//! Reads CTR text (or a JSON terminal table) and writes a multi-page PDF,
//! one SVG per page, or PNG previews.

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use ctr_core::{
    DrawingConfig, MetaKey, ParseOptions, ParsedDocument, Sheet, SymbolAssets, layout_document,
    parse_document, render_pdf, render_svg, sheets_from_json, write_document,
};
use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One PDF with every page
    Pdf,
    /// One SVG file per page
    Svg,
    /// One PNG preview per page
    Png,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Format::Pdf),
            "svg" => Some(Format::Svg),
            "png" => Some(Format::Png),
            _ => None,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ctrdraw")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw the sheets of a CTR file
    Render(RenderArgs),
    /// Parse a CTR file and report sheets and diagnostics
    Check(CheckArgs),
    /// Print a CTR file in canonical form
    Normalize(ParseArgs),
}

#[derive(Args, Debug)]
struct ParseArgs {
    /// CTR text file
    input: PathBuf,

    /// Fail on the first malformed line
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,

    /// Metadata fields copied into following sheets (station, location, sip, heading)
    #[arg(long = "carry-forward", value_delimiter = ',')]
    carry_forward: Vec<String>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    parse: ParseArgs,

    /// Print the parsed document as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Drawing configuration, used for the page count
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// CTR text file
    #[arg(required_unless_present = "table", conflicts_with = "table")]
    input: Option<PathBuf>,

    /// JSON terminal table instead of CTR text
    #[arg(long)]
    table: Option<PathBuf>,

    /// Output file; the extension picks the format unless --format is given
    #[arg(short = 'o', long)]
    output: PathBuf,

    #[arg(short = 'f', long, value_enum)]
    format: Option<Format>,

    /// Drawing configuration (JSON)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Directory of <TYPE>.png symbol artwork
    #[arg(short = 's', long)]
    symbols: Option<PathBuf>,

    /// Fail on the first malformed line
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,

    /// Metadata fields copied into following sheets
    #[arg(long = "carry-forward", value_delimiter = ',')]
    carry_forward: Vec<String>,

    /// Font file for PNG previews (system sans-serif otherwise)
    #[arg(long)]
    font: Option<PathBuf>,

    /// PNG pixels per point
    #[arg(long, default_value = "2.0")]
    scale: f32,

    /// Function label font size
    #[arg(long = "function-font")]
    function_font: Option<f64>,

    /// Cable label font size
    #[arg(long = "cable-font")]
    cable_font: Option<f64>,

    /// Terminal number font size
    #[arg(long = "terminal-font")]
    terminal_font: Option<f64>,

    /// Row id font size
    #[arg(long = "row-font")]
    row_font: Option<f64>,
}

fn meta_keys(names: &[String]) -> Result<Vec<MetaKey>> {
    names
        .iter()
        .map(|n| {
            MetaKey::ALL
                .into_iter()
                .find(|k| k.keyword().eq_ignore_ascii_case(n.trim()))
                .ok_or_else(|| anyhow!("unknown metadata field `{n}`"))
        })
        .collect()
}

fn parse_file(path: &Path, strict: bool, carry_forward: &[String]) -> Result<ParsedDocument> {
    let opts = ParseOptions {
        strict,
        carry_forward: meta_keys(carry_forward)?,
    };
    let txt = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let doc = parse_document(&txt, &opts)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    for d in &doc.diagnostics {
        warn!("{}: {d}", path.display());
    }
    Ok(doc)
}

fn load_config(path: Option<&Path>) -> Result<DrawingConfig> {
    match path {
        Some(p) => DrawingConfig::load(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(DrawingConfig::default()),
    }
}

/// `out.png` -> `out-2.png` for page 2 of a multi-page render.
fn page_path(output: &Path, index: usize, total: usize) -> PathBuf {
    if total <= 1 {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    let name = match output.extension() {
        Some(ext) => format!("{stem}-{}.{}", index + 1, ext.to_string_lossy()),
        None => format!("{stem}-{}", index + 1),
    };
    output.with_file_name(name)
}

fn font_options(font: Option<&Path>) -> Result<usvg::Options<'static>> {
    let mut opt = usvg::Options::default();
    let mut fontdb = usvg::fontdb::Database::new();
    fontdb.load_system_fonts();
    if let Some(path) = font {
        let before = fontdb.len();
        fontdb
            .load_font_file(path)
            .with_context(|| format!("failed to load font {}", path.display()))?;
        // map generic families to the supplied font
        let family = fontdb
            .faces()
            .nth(before)
            .and_then(|face| face.families.first().map(|(n, _)| n.clone()));
        if let Some(name) = family {
            debug!(font = %name, "using font for previews");
            fontdb.set_sans_serif_family(name.clone());
            fontdb.set_serif_family(name);
        }
    }
    if fontdb.is_empty() {
        warn!("no fonts available, PNG text will be missing");
    }
    opt.fontdb = Arc::new(fontdb);
    Ok(opt)
}

fn rasterize(svg: &str, opt: &usvg::Options, scale: f32) -> Result<tiny_skia::Pixmap> {
    let tree = usvg::Tree::from_str(svg, opt).map_err(|e| anyhow!("SVG parse error: {e}"))?;
    let size = tree.size();
    let w = (size.width() * scale).ceil() as u32;
    let h = (size.height() * scale).ceil() as u32;
    let mut pixmap = tiny_skia::Pixmap::new(w, h).ok_or_else(|| anyhow!("pixmap alloc failed"))?;
    let mut pm = pixmap.as_mut();
    resvg::render(&tree, tiny_skia::Transform::from_scale(scale, scale), &mut pm);
    Ok(pixmap)
}

fn encode_png_deterministic(pixmap: &tiny_skia::Pixmap, path: &Path) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut enc = Encoder::new(file, pixmap.width(), pixmap.height());
    enc.set_color(ColorType::Rgba);
    enc.set_depth(BitDepth::Eight);
    enc.set_filter(FilterType::NoFilter);
    enc.set_compression(Compression::Default);
    let mut writer = enc.write_header()?;
    writer.write_image_data(pixmap.data())?;
    Ok(())
}

fn render(args: &RenderArgs) -> Result<()> {
    let sheets: Vec<Sheet> = match (&args.input, &args.table) {
        (_, Some(table)) => {
            let txt = fs::read_to_string(table)
                .with_context(|| format!("failed to read {}", table.display()))?;
            sheets_from_json(&txt)
                .with_context(|| format!("failed to parse table {}", table.display()))?
        }
        (Some(input), None) => parse_file(input, args.strict, &args.carry_forward)?.sheets,
        (None, None) => bail!("an input file or --table is required"),
    };

    let mut cfg = load_config(args.config.as_deref())?;
    if let Some(v) = args.function_font {
        cfg.fonts.function = v;
    }
    if let Some(v) = args.cable_font {
        cfg.fonts.cable = v;
    }
    if let Some(v) = args.terminal_font {
        cfg.fonts.terminal = v;
    }
    if let Some(v) = args.row_font {
        cfg.fonts.row_id = v;
    }
    cfg.validate()?;

    let assets = match &args.symbols {
        Some(dir) => SymbolAssets::load_dir(dir)
            .with_context(|| format!("failed to load symbols from {}", dir.display()))?,
        None => SymbolAssets::new(),
    };
    debug!(sheets = sheets.len(), symbols = assets.len(), "rendering");

    let format = args
        .format
        .or_else(|| Format::from_path(&args.output))
        .unwrap_or(Format::Pdf);
    match format {
        Format::Pdf => {
            let out = render_pdf(&sheets, &cfg, &assets)?;
            fs::write(&args.output, &out.output)
                .with_context(|| format!("failed to write {}", args.output.display()))?;
            info!(
                pages = out.pages,
                warnings = out.warnings.len(),
                path = %args.output.display(),
                "wrote PDF"
            );
        }
        Format::Svg => {
            let out = render_svg(&sheets, &cfg, &assets)?;
            for (i, svg) in out.output.iter().enumerate() {
                let path = page_path(&args.output, i, out.pages);
                fs::write(&path, svg)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            info!(pages = out.pages, warnings = out.warnings.len(), "wrote SVG pages");
        }
        Format::Png => {
            let out = render_svg(&sheets, &cfg, &assets)?;
            let opt = font_options(args.font.as_deref())?;
            for (i, svg) in out.output.iter().enumerate() {
                let path = page_path(&args.output, i, out.pages);
                let pixmap = rasterize(svg, &opt, args.scale)?;
                encode_png_deterministic(&pixmap, &path)?;
            }
            info!(pages = out.pages, warnings = out.warnings.len(), "wrote PNG pages");
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct CheckReport<'a> {
    #[serde(flatten)]
    doc: &'a ParsedDocument,
    pages: usize,
}

fn check(args: &CheckArgs) -> Result<()> {
    let p = &args.parse;
    let doc = parse_file(&p.input, p.strict, &p.carry_forward)?;
    let cfg = load_config(args.config.as_deref())?;
    let layout = layout_document(&doc.sheets, &cfg);

    if args.json {
        let report = CheckReport {
            doc: &doc,
            pages: layout.pages.len(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    for sheet in &doc.sheets {
        let pages = layout
            .pages
            .iter()
            .filter(|pg| pg.sheet_number == sheet.number)
            .count();
        println!(
            "sheet {}: {} rows, {} terminals, {} symbols, {} page(s)",
            sheet.number,
            sheet.row_ids().len(),
            sheet.rows.len(),
            sheet.symbols.len(),
            pages
        );
        for line in sheet.meta.to_lines() {
            println!("  {line}");
        }
    }
    for d in doc.diagnostics.iter().chain(&layout.diagnostics) {
        println!("{:?} {d}", d.kind);
    }
    Ok(())
}

fn normalize(args: &ParseArgs) -> Result<()> {
    let doc = parse_file(&args.input, args.strict, &args.carry_forward)?;
    print!("{}", write_document(&doc.sheets));
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::Render(args) => render(args),
        Command::Check(args) => check(args),
        Command::Normalize(args) => normalize(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(Format::from_path(Path::new("a.PDF")), Some(Format::Pdf));
        assert_eq!(Format::from_path(Path::new("a.svg")), Some(Format::Svg));
        assert_eq!(Format::from_path(Path::new("a")), None);
    }

    #[test]
    fn page_paths_are_numbered_when_needed() {
        let out = Path::new("dir/ctr.png");
        assert_eq!(page_path(out, 0, 1), PathBuf::from("dir/ctr.png"));
        assert_eq!(page_path(out, 1, 3), PathBuf::from("dir/ctr-2.png"));
    }

    #[test]
    fn carry_forward_names() {
        let keys = meta_keys(&["station".into(), " SIP".into()]).unwrap();
        assert_eq!(keys, [MetaKey::Station, MetaKey::Sip]);
        assert!(meta_keys(&["colour".into()]).is_err());
    }

    #[test]
    fn missing_artwork_does_not_fail_render() {
        let dir = std::env::temp_dir().join(format!("ctrdraw-render-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("station.ctr");
        let output = dir.join("station.svg");
        fs::write(&input, "A, HR[1 to 2], C1\nSYMBOL: CHOKE [A, 3]\n").unwrap();

        let cli = Cli::try_parse_from([
            "ctrdraw",
            "render",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();
        let Command::Render(args) = &cli.command else {
            panic!("expected render");
        };
        render(args).unwrap();
        let svg = fs::read_to_string(&output).unwrap();
        assert!(svg.contains("CHOKE"));
        fs::remove_dir_all(&dir).unwrap();
    }
}

// ============================================================================
// layer-editor CLI: headless layer stacking and export
// ============================================================================
//
// Usage examples:
//   layer-editor -i background.png -i overlay.png -o flat.png --whole
//   layer-editor -i "shots/*.png" --select 10,10,256,256 --data-uri
//   layer-editor -i photo.jpg -o crop.png --select 0,0,64,64 --cpu -v
//
// Inputs are stacked in the order given: the first input ends up at the
// bottom, the last on top and current.  Without --output the export is
// printed as a data URI.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::canvas::{Point, Rect};
use crate::editor::Editor;
use crate::io;
use crate::settings::EditorSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Stack images as layers and export a composited region.
#[derive(Parser, Debug)]
#[command(
    name = "layer-editor",
    about = "Headless layer compositor and exporter",
    long_about = "Load one or more images as layers (first at the bottom), then export\n\
                  either the selection (or the current layer when no selection is given)\n\
                  or the whole document as a PNG file or a data URI.\n\n\
                  Example:\n  \
                  layer-editor -i base.png -i top.png -o out.png --whole"
)]
pub struct CliArgs {
    /// Input image(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Write the export to this PNG file.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Selection rectangle in document pixels: x,y,width,height.
    /// The export includes the selection's 1 px border.
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_rect)]
    pub select: Option<Rect>,

    /// Export the bounds of all layers instead of the selection.
    #[arg(long, conflicts_with = "select")]
    pub whole: bool,

    /// Print the export as a data:image/png;base64 URI (implied without --output).
    #[arg(long)]
    pub data_uri: bool,

    /// Composite on the CPU even when a GPU adapter is available.
    #[arg(long)]
    pub cpu: bool,

    /// Write the session log to this file.
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Print per-step timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the export and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    if let Some(path) = &args.log {
        crate::logger::init_at(path);
    }
    match execute(&args) {
        Ok(Some(uri)) => {
            println!("{}", uri);
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load, composite and export.  Returns the data URI when one was requested.
fn execute(args: &CliArgs) -> Result<Option<String>, String> {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        return Err("no input files matched the given pattern(s).".into());
    }

    let mut settings = EditorSettings::load();
    if args.cpu {
        settings.gpu_acceleration = false;
    }
    let start = Instant::now();
    let mut editor = Editor::new(settings);
    if args.verbose {
        println!("backend: {}", editor.compositor().backend_name());
    }

    // -- Step 1: Load ----------------------------------------------------
    for path in &inputs {
        editor
            .load_layer_from_path(path)
            .map_err(|e| format!("load failed for '{}': {}", path.display(), e))?;
        if args.verbose {
            println!("  loaded {}", path.display());
        }
    }

    // -- Step 2: Export ----------------------------------------------------
    if let Some(rect) = args.select {
        editor.set_selection(
            Point::new(rect.x as f32, rect.y as f32),
            Point::new(rect.right() as f32, rect.bottom() as f32),
        );
    }
    let image = if args.whole {
        editor.export_whole_document_image()
    } else {
        editor.export_selection_image()
    }
    .map_err(|e| format!("render failed: {}", e))?;

    // -- Step 3: Save ----------------------------------------------------
    if let Some(out) = &args.output {
        io::write_png(&image, out).map_err(|e| format!("save failed: {}", e))?;
        if args.verbose {
            println!(
                "  → {} {}x{} ({:.0}ms)",
                out.display(),
                image.width(),
                image.height(),
                start.elapsed().as_secs_f64() * 1000.0
            );
        }
    }
    if args.data_uri || args.output.is_none() {
        let uri = io::to_data_uri(&image).map_err(|e| format!("encode failed: {}", e))?;
        return Ok(Some(uri));
    }
    Ok(None)
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse `x,y,w,h`.
fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, w, h] = parts[..] else {
        return Err(format!("expected x,y,width,height, got '{}'", s));
    };
    let int = |v: &str| v.parse::<i32>().map_err(|e| format!("'{}': {}", v, e));
    let dim = |v: &str| v.parse::<u32>().map_err(|e| format!("'{}': {}", v, e));
    Ok(Rect::new(int(x)?, int(y)?, dim(w)?, dim(h)?))
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

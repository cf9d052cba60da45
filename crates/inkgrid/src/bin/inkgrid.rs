//! inkgrid CLI: detect, verify and render ink-grid tags.

use clap::{Args, Parser, Subcommand};
use inkgrid::core::synth::{render_tag, TagStyle};
use inkgrid::core::Rgb;
use inkgrid::matching::InMemoryRegistry;
use inkgrid::{Engine, EngineConfig, VerifyRequest};
use std::path::PathBuf;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

/// Inks used by `render` when no palette is given.
const DEFAULT_PALETTE: [Rgb; 5] = [
    [0, 188, 212],
    [33, 150, 243],
    [0, 150, 136],
    [233, 30, 99],
    [255, 152, 0],
];

#[derive(Parser)]
#[command(name = "inkgrid")]
#[command(about = "Verify ink-grid security tags from photographs")]
#[command(version)]
struct Cli {
    /// Engine configuration (JSON). Missing fields keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace). INKGRID_LOG overrides it.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the ink pattern from a photo.
    Detect {
        /// Path to a PNG or JPEG photo.
        image: PathBuf,
    },

    /// Match a pattern against a registry file.
    Verify(VerifyArgs),

    /// Detect a pattern in a photo and verify it.
    Scan {
        image: PathBuf,
        #[arg(long)]
        registry: PathBuf,
        #[arg(long, default_value = "standard")]
        algorithm: String,
    },

    /// Draw a synthetic tag as PNG.
    Render(RenderArgs),
}

#[derive(Debug, Clone, Args)]
struct VerifyArgs {
    /// Registry JSON (`{ "patterns": [...] }`).
    #[arg(long)]
    registry: PathBuf,

    /// Row-major ink ids, comma separated.
    #[arg(long)]
    pattern: String,

    /// Sampled colors as JSON rows of `[r, g, b]`.
    #[arg(long)]
    colors: Option<PathBuf>,

    #[arg(long, default_value = "standard")]
    algorithm: String,
}

#[derive(Debug, Clone, Args)]
struct RenderArgs {
    /// Row-major ink ids, comma separated.
    #[arg(long)]
    pattern: String,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Ink colors as `r,g,b;r,g,b;...`, indexed by ink id.
    #[arg(long)]
    palette: Option<String>,

    /// Cell side in pixels.
    #[arg(long, default_value_t = 40)]
    cell_px: usize,
}

fn parse_pattern(s: &str) -> CliResult<Vec<u32>> {
    s.split(',')
        .map(|v| {
            v.trim()
                .parse::<u32>()
                .map_err(|e| format!("invalid ink id {v:?}: {e}").into())
        })
        .collect()
}

fn parse_palette(s: &str) -> CliResult<Vec<Rgb>> {
    s.split(';')
        .map(|triple| -> CliResult<Rgb> {
            let parts: Vec<u8> = triple
                .split(',')
                .map(|c| c.trim().parse::<u8>())
                .collect::<Result<Vec<u8>, _>>()
                .map_err(|e| format!("invalid color {triple:?}: {e}"))?;
            <[u8; 3]>::try_from(parts)
                .map_err(|_| format!("color {triple:?} needs three channels").into())
        })
        .collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render(args: &RenderArgs) -> CliResult<()> {
    let pattern = parse_pattern(&args.pattern)?;
    let size = (pattern.len() as f64).sqrt().round() as usize;
    let palette = match &args.palette {
        Some(p) => parse_palette(p)?,
        None => DEFAULT_PALETTE.to_vec(),
    };
    let style = TagStyle {
        cell_px: args.cell_px,
        ..TagStyle::default()
    };
    let buf = render_tag(&pattern, size, &palette, &style)?;
    let img = image::RgbImage::from_raw(
        buf.width() as u32,
        buf.height() as u32,
        buf.as_raw().to_vec(),
    )
    .ok_or("rendered buffer has an unexpected length")?;
    img.save(&args.out)?;
    eprintln!("wrote {}x{} tag to {}", size, size, args.out.display());
    Ok(())
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    #[cfg(feature = "tracing")]
    inkgrid::core::init_tracing(false, cli.verbose);
    #[cfg(not(feature = "tracing"))]
    inkgrid::core::init_with_verbosity(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => EngineConfig::load_json(path)?,
        None => EngineConfig::default(),
    };
    let engine = Engine::new(config);

    match cli.command {
        Commands::Detect { image } => {
            let bytes = std::fs::read(&image)?;
            print_json(&engine.detect_pattern_from_image(&bytes))
        }
        Commands::Verify(args) => {
            let registry = InMemoryRegistry::load_json(&args.registry)?;
            let extracted_colors = match &args.colors {
                Some(path) => Some(serde_json::from_slice(&std::fs::read(path)?)?),
                None => None,
            };
            let request = VerifyRequest {
                pattern: parse_pattern(&args.pattern)?,
                algorithm: args.algorithm,
                extracted_colors,
            };
            print_json(&engine.verify_pattern(&registry, &request)?)
        }
        Commands::Scan {
            image,
            registry,
            algorithm,
        } => {
            let registry = InMemoryRegistry::load_json(&registry)?;
            let bytes = std::fs::read(&image)?;
            print_json(&engine.scan_and_verify(&registry, &bytes, &algorithm)?)
        }
        Commands::Render(args) => render(&args),
    }
}

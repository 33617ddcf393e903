//! gridtrace CLI
//!
//! Renders an ASCII sphere-grid scene to a PPM file or straight to the
//! terminal as half-block art.
//!
//! Example usage:
//!   gridtrace render -o out.ppm
//!   gridtrace --config scene.yaml render -o out.ppm --threads 8
//!   gridtrace preview --rays 16
//!   gridtrace --config scene.yaml check-config

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use gridtrace::{term, RenderConfig, Renderer};

#[derive(Parser)]
#[command(name = "gridtrace")]
#[command(version = "0.1.0")]
#[command(about = "Parallel recursive ray tracer for ASCII sphere-grid scenes")]
struct Cli {
    /// Path to a YAML render configuration; the built-in demo scene is used
    /// when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Overrides {
    /// Override image width
    #[arg(long)]
    width: Option<usize>,

    /// Override image height
    #[arg(long)]
    height: Option<usize>,

    /// Override samples per pixel
    #[arg(long)]
    rays: Option<u32>,

    /// Override worker thread count
    #[arg(long)]
    threads: Option<usize>,

    /// Seed for reproducible renders
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the scene and write a binary PPM image
    Render {
        /// Output file
        #[arg(short, long, default_value = "render.ppm")]
        output: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Render at terminal size and print ANSI half-blocks
    Preview {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Validate a configuration file and report
    CheckConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => RenderConfig::from_file(path)?,
        None => RenderConfig::demo(),
    };

    match cli.command {
        Commands::Render { output, overrides } => {
            overrides.apply(&mut config);
            let buffer = Renderer::new().render(&config)?;
            write_ppm(&output, &buffer, config.image_width, config.image_height)?;
            log::info!("wrote {}", output.display());
        }
        Commands::Preview { overrides } => {
            let (width, height) = term::terminal_dimensions();
            config.image_width = width;
            config.image_height = height;
            config.threads = config.threads.min(height);
            overrides.apply(&mut config);
            let buffer = Renderer::new().render(&config)?;
            print!(
                "{}",
                term::to_halfblocks(&buffer, config.image_width, config.image_height)
            );
        }
        Commands::CheckConfig => {
            config.validate()?;
            println!(
                "configuration OK: {}x{} image, {} rays/pixel, {} threads, {}x{} scene grid",
                config.image_width,
                config.image_height,
                config.rays,
                config.threads,
                config.lines[0].chars().count(),
                config.lines.len()
            );
        }
    }

    Ok(())
}

impl Overrides {
    fn apply(&self, config: &mut RenderConfig) {
        if let Some(width) = self.width {
            config.image_width = width;
        }
        if let Some(height) = self.height {
            config.image_height = height;
        }
        if let Some(rays) = self.rays {
            config.rays = rays;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
    }
}

/// Binary PPM (P6) writer; encoding is the consumer's side of the render
/// contract, kept here in the CLI.
fn write_ppm(
    path: &PathBuf,
    buffer: &[u8],
    width: usize,
    height: usize,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut out = std::io::BufWriter::new(file);
    write!(out, "P6\n{} {}\n255\n", width, height)?;
    out.write_all(buffer)?;
    out.flush()
}

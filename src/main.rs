use anyhow::{anyhow, Context, Result};
use cinegrade::{
    classifier::ClassifierConfig,
    config::read_config,
    file_handler::{self, grade_file},
    lut3d::Lut3D,
};
use clap::{Args, Parser, Subcommand};
use std::{fs::File, io::BufWriter, path::PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "cinegrade")]
#[command(author, version, about = "Apply .cube LUTs while preserving brand colors and blacks")]
#[command(long_about = "
Grades images through a 3D .cube LUT. Pixels in the preserved hue band get a
small boost instead of the LUT, and near-black pixels pass through untouched.

Examples:
  cinegrade apply photo.png -l \"Cinematic Tones 03.cube\" -o graded.png
  cinegrade apply photo.jpg -l look.cube -o out.png --hue 210 --tolerance 15
  cinegrade batch -c cinegrade.toml
  cinegrade info look.cube
  cinegrade identity 33 -o neutral.cube
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug logging and row progress)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a single image
    Apply(ApplyArgs),

    /// Grade every configured image with every configured LUT
    Batch(BatchArgs),

    /// Show LUT title and size
    Info(InfoArgs),

    /// Write an identity .cube LUT
    Identity(IdentityArgs),
}

#[derive(Args)]
struct ApplyArgs {
    /// Input image
    input: PathBuf,

    /// .cube LUT file
    #[arg(short, long)]
    lut: PathBuf,

    /// Output PNG
    #[arg(short, long)]
    output: PathBuf,

    /// Center of the preserved hue band, degrees
    #[arg(long, default_value_t = 48.0)]
    hue: f64,

    /// Half-width of the preserved hue band, degrees
    #[arg(long, default_value_t = 20.0)]
    tolerance: f64,

    /// Minimum saturation for the preserved band
    #[arg(long, default_value_t = 0.7)]
    sat_min: f64,

    /// Minimum value (brightness) for the preserved band
    #[arg(long, default_value_t = 0.5)]
    val_min: f64,

    /// Channels strictly below this are kept as black
    #[arg(long, default_value_t = 50)]
    black: u8,

    /// Gains for preserved-band pixels, as R,G,B
    #[arg(long, value_delimiter = ',', default_values_t = vec![1.05f32, 1.05, 0.95])]
    multipliers: Vec<f32>,

    /// Do not copy EXIF metadata to the output
    #[arg(long)]
    no_metadata: bool,
}

#[derive(Args)]
struct BatchArgs {
    /// TOML configuration
    #[arg(short, long, default_value = "cinegrade.toml")]
    config: PathBuf,
}

#[derive(Args)]
struct InfoArgs {
    /// .cube LUT file
    lut: PathBuf,
}

#[derive(Args)]
struct IdentityArgs {
    /// Lattice edge length
    #[arg(value_parser = clap::value_parser!(u16).range(2..=256))]
    size: u16,

    /// Output .cube file
    #[arg(short, long)]
    output: PathBuf,

    /// TITLE written into the header
    #[arg(long)]
    title: Option<String>,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let base_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(base_level))
        .context("Invalid log filter")?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .context("Logger initialization failed")
}

fn rgb_triplet(values: &[f32]) -> Result<[f32; 3]> {
    <[f32; 3]>::try_from(values).map_err(|_| {
        anyhow!("--multipliers takes exactly three values (R,G,B), got {}", values.len())
    })
}

fn run_apply(args: ApplyArgs) -> Result<()> {
    let multipliers = rgb_triplet(&args.multipliers)?;
    let classifier = ClassifierConfig {
        target_hue_degrees: args.hue,
        hue_tolerance_degrees: args.tolerance,
        saturation_min: args.sat_min,
        value_min: args.val_min,
        black_threshold: args.black,
        multipliers,
    }
    .build()?;

    let lut = Lut3D::from_cube(&args.lut)
        .with_context(|| format!("Failed to load LUT {}", args.lut.display()))?;
    info!(lut = %args.lut.display(), size = lut.size(), "loaded LUT");

    let counts = grade_file(&args.input, &args.output, &lut, &classifier, !args.no_metadata)
        .with_context(|| format!("Failed to grade {}", args.input.display()))?;
    println!(
        "{}: {} preserved color, {} preserved black, {} LUT mapped",
        args.output.display(),
        counts.preserved_color,
        counts.preserved_black,
        counts.lut_mapped
    );
    Ok(())
}

fn run_batch(args: BatchArgs) -> Result<()> {
    let config = read_config(&args.config)
        .with_context(|| format!("Failed to read config {}", args.config.display()))?;
    let report = file_handler::run_batch(&config)?;
    println!(
        "{} LUT(s), {} image(s) graded, {} failed, {} LUT(s) unreadable",
        report.luts, report.graded, report.failed, report.failed_luts
    );
    println!("Output: {}", config.input.output.display());
    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let lut = Lut3D::from_cube(&args.lut)
        .with_context(|| format!("Failed to load LUT {}", args.lut.display()))?;
    let n = lut.size();
    println!("File:  {}", args.lut.display());
    if let Some(title) = lut.title() {
        println!("Title: {}", title);
    }
    println!("Size:  {}x{}x{} ({} cells)", n, n, n, lut.cells().len());
    Ok(())
}

fn run_identity(args: IdentityArgs) -> Result<()> {
    let mut lut = Lut3D::identity(args.size as usize);
    if let Some(title) = args.title {
        lut = lut.with_title(title);
    }
    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    lut.write_cube(BufWriter::new(file))?;
    info!(output = %args.output.display(), size = lut.size(), "wrote identity LUT");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Apply(args) => run_apply(args),
        Commands::Batch(args) => run_batch(args),
        Commands::Info(args) => run_info(args),
        Commands::Identity(args) => run_identity(args),
    }
}

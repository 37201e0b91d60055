use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use colorcard_correction::color_correction::{
    BatchConfig, BatchRunner, ColorCorrectionPipeline, CorrectionConfig, DetectionRotation,
    ImageSelection, OutputLocation, SidecarDetector,
};
use colorcard_correction::logger::{self, error, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RotationArg {
    None,
    Cw90,
    #[value(name = "180")]
    Rotate180,
    Ccw90,
}

impl From<RotationArg> for DetectionRotation {
    fn from(arg: RotationArg) -> Self {
        match arg {
            RotationArg::None => DetectionRotation::None,
            RotationArg::Cw90 => DetectionRotation::Clockwise90,
            RotationArg::Rotate180 => DetectionRotation::Rotate180,
            RotationArg::Ccw90 => DetectionRotation::CounterClockwise90,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "colorcard-correct")]
#[command(about = "Normalize photo colors using the red/green/blue reference card in each image")]
#[command(version)]
struct Cli {
    /// Folder holding the images.
    folder: PathBuf,

    /// Image file names inside the folder (default: every jpg/jpeg/png).
    #[arg(long, num_args = 1.., conflicts_with = "image_list")]
    images: Vec<String>,

    /// A .txt (one name per line) or .csv (image_name column) list of images.
    #[arg(long)]
    image_list: Option<PathBuf>,

    /// Subfolder for corrected images.
    #[arg(long, default_value = "colorcorrected_images", conflicts_with = "suffix")]
    output_folder: PathBuf,

    /// Write corrected images next to the inputs with this file-name suffix.
    #[arg(long)]
    suffix: Option<String>,

    /// Map every image onto the card colors of this reference image.
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Directory of detector predictions (`<image file name>.json`).
    #[arg(long)]
    predictions: PathBuf,

    /// Rotation applied to the detection copy.
    #[arg(long, value_enum, default_value_t = RotationArg::None)]
    rotate: RotationArg,

    /// Side of the square detection copy; 0 keeps the native size.
    #[arg(long, default_value = "768")]
    detection_size: u32,

    /// Sampling region is the box shrunk by this factor.
    #[arg(long, default_value = "2.0")]
    shrink: f32,

    /// Process images in parallel.
    #[arg(long)]
    parallel: bool,

    /// Write box and before/after overlays here.
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: Cli) -> Result<()> {
    let config = CorrectionConfig::builder()
        .rotation(cli.rotate.into())
        .detection_size((cli.detection_size > 0).then_some(cli.detection_size))
        .shrink_factor(cli.shrink)
        .build();

    let detector = SidecarDetector::open(&cli.predictions)
        .with_context(|| format!("opening predictions in {}", cli.predictions.display()))?;
    let pipeline = ColorCorrectionPipeline::new(detector, config).context("invalid configuration")?;

    let selection = match (&cli.image_list, cli.images.is_empty()) {
        (Some(list), _) => ImageSelection::ListFile(list.clone()),
        (None, false) => ImageSelection::Names(cli.images.clone()),
        (None, true) => ImageSelection::Folder,
    };
    let names = selection
        .resolve(&cli.folder)
        .with_context(|| format!("listing images in {}", cli.folder.display()))?;

    let mut batch = BatchConfig::builder().parallel(cli.parallel).output(match cli.suffix {
        Some(suffix) => OutputLocation::Suffix(suffix),
        None => OutputLocation::Subfolder(cli.output_folder),
    });
    if let Some(dir) = cli.overlay_dir {
        batch = batch.overlay_dir(dir);
    }

    info!(images = names.len(), folder = %cli.folder.display(), "Starting color correction");

    let runner = BatchRunner::new(&pipeline, batch.build());
    let report = runner
        .run(&cli.folder, &names, cli.reference.as_deref())
        .context("batch could not start")?;

    println!(
        "Corrected {} of {} images ({} skipped)",
        report.corrected_count(),
        report.total(),
        report.skipped_count()
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init_with_default(if cli.verbose { "debug" } else { "info" });

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

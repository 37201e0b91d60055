//! Batch correction over a folder of images
//!
//! Resolves the list of images to process, places outputs, and runs the
//! per-image pipeline with failure isolation: one bad image is logged and
//! reported, never fatal to the rest of the batch.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::color_correction::common::error::{CorrectionError, ErrorKind, Result};
use crate::color_correction::detection::BoxDetector;
use crate::color_correction::geometry::ThirdCircleEstimator;
use crate::color_correction::imaging::CorrectedImageWriter;
use crate::color_correction::pipeline::ColorCorrectionPipeline;
use crate::color_correction::sampling::ReferenceColorSet;
use crate::color_correction::transform::ColorTransformMatrix;
use crate::color_correction::visualization;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const IMAGE_NAME_COLUMN: &str = "image_name";

/// Where corrected images are written, relative to the input folder.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputLocation {
    /// `<folder>/<dir>/<name>`
    Subfolder(PathBuf),
    /// `<folder>/<stem><suffix>.<ext>`
    Suffix(String),
}

impl Default for OutputLocation {
    fn default() -> Self {
        OutputLocation::Subfolder(PathBuf::from("colorcorrected_images"))
    }
}

impl OutputLocation {
    pub fn output_path(&self, folder: &Path, name: &str) -> PathBuf {
        match self {
            OutputLocation::Subfolder(dir) => folder.join(dir).join(name),
            OutputLocation::Suffix(suffix) => {
                let input = Path::new(name);
                let stem = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let file_name = match input.extension() {
                    Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
                    None => format!("{}{}", stem, suffix),
                };
                match input.parent() {
                    Some(parent) => folder.join(parent).join(file_name),
                    None => folder.join(file_name),
                }
            }
        }
    }

    /// Rejects locations that would resolve onto the input files.
    pub fn validate(&self) -> Result<()> {
        match self {
            OutputLocation::Subfolder(dir) => {
                if dir.components().all(|c| c == Component::CurDir) {
                    return Err(CorrectionError::invalid_parameter("output_folder", dir.display()));
                }
            }
            OutputLocation::Suffix(suffix) => {
                if suffix.is_empty() {
                    return Err(CorrectionError::invalid_parameter("suffix", "<empty>"));
                }
            }
        }
        Ok(())
    }

    fn prepare(&self, folder: &Path) -> Result<()> {
        if let OutputLocation::Subfolder(dir) = self {
            let target = folder.join(dir);
            fs::create_dir_all(&target).map_err(|e| {
                CorrectionError::OutputWriteError(format!("{}: {}", target.display(), e))
            })?;
        }
        Ok(())
    }
}

/// Which images of the folder to process.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ImageSelection {
    /// Every `.jpg`, `.jpeg` and `.png` file directly in the folder
    #[default]
    Folder,
    Names(Vec<String>),
    /// A `.txt` file with one name per line, or a `.csv` file with an
    /// `image_name` column
    ListFile(PathBuf),
}

impl ImageSelection {
    pub fn resolve(&self, folder: &Path) -> Result<Vec<String>> {
        match self {
            ImageSelection::Folder => scan_folder(folder),
            ImageSelection::Names(names) => Ok(names.clone()),
            ImageSelection::ListFile(path) => read_image_list(path),
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Image file names directly inside `folder`, sorted.
pub fn scan_folder(folder: &Path) -> Result<Vec<String>> {
    if !folder.is_dir() {
        return Err(CorrectionError::ImageNotFound(folder.to_path_buf()));
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && has_image_extension(&path) {
            if let Some(name) = path.file_name() {
                names.push(name.to_string_lossy().into_owned());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn csv_error(path: &Path, error: csv::Error) -> CorrectionError {
    CorrectionError::invalid_parameter("image_list", format!("{}: {}", path.display(), error))
}

fn parse_csv_names(path: &Path, content: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let column = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .position(|field| field == IMAGE_NAME_COLUMN)
        .ok_or_else(|| {
            CorrectionError::invalid_parameter(
                "image_list",
                format!("{}: no {} column", path.display(), IMAGE_NAME_COLUMN),
            )
        })?;

    let mut names = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        if let Some(name) = record.get(column).filter(|name| !name.is_empty()) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Image names listed in a `.txt` or `.csv` file.
pub fn read_image_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| {
        CorrectionError::invalid_parameter("image_list", format!("{}: {}", path.display(), e))
    })?;

    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => parse_csv_names(path, &content),
        Some("txt") => Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()),
        _ => Err(CorrectionError::invalid_parameter(
            "image_list",
            path.display(),
        )),
    }
}

/// Configuration for a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchConfig {
    pub output: OutputLocation,
    /// Process images concurrently with rayon
    pub parallel: bool,
    /// Write debug overlays here when set
    pub overlay_dir: Option<PathBuf>,
}

impl BatchConfig {
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.output.validate()
    }
}

/// Builder for BatchConfig
#[derive(Default)]
pub struct BatchConfigBuilder {
    output: Option<OutputLocation>,
    parallel: Option<bool>,
    overlay_dir: Option<PathBuf>,
}

impl BatchConfigBuilder {
    pub fn output(mut self, output: OutputLocation) -> Self {
        self.output = Some(output);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    pub fn overlay_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.overlay_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> BatchConfig {
        BatchConfig {
            output: self.output.unwrap_or_default(),
            parallel: self.parallel.unwrap_or(false),
            overlay_dir: self.overlay_dir,
        }
    }
}

/// Result for one image of a batch.
#[derive(Debug)]
pub enum ImageOutcome {
    Corrected {
        input: PathBuf,
        output: PathBuf,
        matrix: ColorTransformMatrix,
    },
    Skipped {
        input: PathBuf,
        error: CorrectionError,
    },
}

impl ImageOutcome {
    pub fn input(&self) -> &Path {
        match self {
            ImageOutcome::Corrected { input, .. } | ImageOutcome::Skipped { input, .. } => input,
        }
    }

    pub fn is_corrected(&self) -> bool {
        matches!(self, ImageOutcome::Corrected { .. })
    }
}

/// Per-image outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ImageOutcome>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn corrected_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_corrected()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.total() - self.corrected_count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&Path, &CorrectionError)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            ImageOutcome::Skipped { input, error } => Some((input.as_path(), error)),
            ImageOutcome::Corrected { .. } => None,
        })
    }

    pub fn skipped_by_kind(&self) -> HashMap<ErrorKind, usize> {
        let mut counts = HashMap::new();
        for (_, error) in self.skipped() {
            *counts.entry(error.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn log_summary(&self) {
        info!(
            total = self.total(),
            corrected = self.corrected_count(),
            skipped = self.skipped_count(),
            "Batch complete"
        );
        for (input, error) in self.skipped() {
            warn!(input = %input.display(), kind = ?error.kind(), "Skipped: {}", error);
        }
    }
}

/// Runs a pipeline over many images of one folder.
///
/// The pipeline is shared across worker threads in parallel mode, so the
/// detector must be `Sync`; wrap a single-threaded backend in
/// [`GuardedDetector`](crate::color_correction::detection::GuardedDetector).
pub struct BatchRunner<'p, D, W, E>
where
    D: BoxDetector + Sync,
    W: CorrectedImageWriter,
    E: ThirdCircleEstimator,
{
    pipeline: &'p ColorCorrectionPipeline<D, W, E>,
    config: BatchConfig,
}

impl<'p, D, W, E> BatchRunner<'p, D, W, E>
where
    D: BoxDetector + Sync,
    W: CorrectedImageWriter,
    E: ThirdCircleEstimator,
{
    pub fn new(pipeline: &'p ColorCorrectionPipeline<D, W, E>, config: BatchConfig) -> Self {
        Self { pipeline, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Corrects `names` inside `folder`.
    ///
    /// With `reference`, every image is mapped onto the reference image's
    /// card colors instead of the unit basis. Errors returned here mean the
    /// run could not start; per-image failures land in the report.
    #[instrument(skip(self, names, reference), fields(folder = %folder.display(), images = names.len()))]
    pub fn run(&self, folder: &Path, names: &[String], reference: Option<&Path>) -> Result<BatchReport> {
        self.config.validate()?;
        if !folder.is_dir() {
            return Err(CorrectionError::ImageNotFound(folder.to_path_buf()));
        }
        self.config.output.prepare(folder)?;
        if let Some(dir) = &self.config.overlay_dir {
            fs::create_dir_all(dir)
                .map_err(|e| CorrectionError::OutputWriteError(format!("{}: {}", dir.display(), e)))?;
        }

        let target = match reference {
            Some(path) => {
                let colors = self.pipeline.extract_reference_colors(path)?;
                info!(reference = %path.display(), "Using shared reference colors");
                Some(colors)
            }
            None => None,
        };

        let outcomes: Vec<ImageOutcome> = if self.config.parallel {
            names
                .par_iter()
                .map(|name| self.process_one(folder, name, target.as_ref()))
                .collect()
        } else {
            names
                .iter()
                .map(|name| self.process_one(folder, name, target.as_ref()))
                .collect()
        };

        let report = BatchReport { outcomes };
        report.log_summary();
        Ok(report)
    }

    fn process_one(&self, folder: &Path, name: &str, target: Option<&ReferenceColorSet>) -> ImageOutcome {
        let input = folder.join(name);
        let output = self.config.output.output_path(folder, name);

        match self.pipeline.correct_file(&input, &output, target) {
            Ok(result) => {
                if let Some(dir) = &self.config.overlay_dir {
                    let shrink = self.pipeline.config().shrink_factor;
                    if let Err(e) = visualization::write_overlays(&result, dir, shrink) {
                        warn!(input = %input.display(), "Overlay not written: {}", e);
                    }
                }
                debug!(input = %input.display(), output = %output.display(), "Corrected");
                ImageOutcome::Corrected {
                    input,
                    output,
                    matrix: result.transform,
                }
            }
            Err(error) => {
                warn!(input = %input.display(), kind = ?error.kind(), "Skipping image: {}", error);
                ImageOutcome::Skipped { input, error }
            }
        }
    }
}

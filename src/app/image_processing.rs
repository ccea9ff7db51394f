// image_processing.rs
use crate::utils::{measure_time, Logger};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use thiserror::Error;

/// JPEG output is deterministic for a given input and quality setting.
const JPEG_QUALITY: u8 = 95;

/// One single-file conversion unit, independent of all others.
#[derive(Clone, Debug)]
pub struct ConversionJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl ConversionJob {
    /// Derives the output path: same basename, extension replaced by ".jpg",
    /// rooted in `output_dir`.
    pub fn new(input_path: &Path, output_dir: &Path) -> Self {
        let stem = input_path.file_stem().unwrap_or_default().to_string_lossy();
        ConversionJob {
            input_path: input_path.to_path_buf(),
            output_path: output_dir.join(format!("{}.jpg", stem)),
        }
    }
}

#[derive(Debug)]
pub struct ConversionResult {
    pub job: ConversionJob,
    pub success: bool,
    pub error: Option<String>,
}

/// Raised once, before any job is dispatched; without an output location the
/// whole batch is off.
#[derive(Debug, Error)]
#[error("failed to create output directory {}: {source}", path.display())]
pub struct DirectoryCreationError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to read input: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to decode HEIC: {0}")]
    Decode(#[from] libheif_rs::HeifError),
    #[error("decoded image has no interleaved RGB plane")]
    PixelFormat,
    #[error("failed to encode JPEG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write output: {0}")]
    Write(#[source] std::io::Error),
}

/// Converts every input file to a JPEG under `output_dir`, one rayon worker
/// per job. Per-file failures are logged and recorded in the returned
/// results; they never abort the batch. `on_progress` receives the overall
/// percentage after each completion, and both the callbacks and the returned
/// results are in completion order.
///
/// Output filename collisions are not deduplicated: the last job to finish
/// wins on disk, but every input still gets its own result entry.
pub fn convert_batch<F>(
    input_paths: &[PathBuf],
    output_dir: &Path,
    logger: &Logger,
    on_progress: F,
) -> Result<Vec<ConversionResult>, DirectoryCreationError>
where
    F: Fn(u8) + Sync,
{
    fs::create_dir_all(output_dir).map_err(|source| DirectoryCreationError {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let total = input_paths.len();
    if total == 0 {
        return Ok(Vec::new());
    }
    logger.log(format!(
        "Converting {} file(s) into {}",
        total,
        output_dir.display()
    ));

    let jobs: Vec<ConversionJob> = input_paths
        .iter()
        .map(|path| ConversionJob::new(path, output_dir))
        .collect();

    let completed = Mutex::new(0usize);
    let (sender, receiver) = mpsc::channel();

    jobs.into_par_iter().for_each_with(sender, |sender, job| {
        let result = match convert_file(&job, logger) {
            Ok(()) => ConversionResult {
                job,
                success: true,
                error: None,
            },
            Err(e) => {
                logger.log(format!(
                    "Failed to convert {}: {}",
                    job.input_path.display(),
                    e
                ));
                ConversionResult {
                    job,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        };

        {
            // Increment and emit under one lock, otherwise a worker that is
            // preempted between the two steps can report a stale, lower
            // percentage after a later completion already reported a higher
            // one.
            let mut completed = completed.lock();
            *completed += 1;
            on_progress((*completed * 100 / total) as u8);
        }
        sender.send(result).unwrap_or_default();
    });

    Ok(receiver.into_iter().collect())
}

fn convert_file(job: &ConversionJob, logger: &Logger) -> Result<(), ConvertError> {
    logger.log(format!("Converting {}", job.input_path.display()));

    let data = fs::read(&job.input_path).map_err(ConvertError::Read)?;

    let (decoded, decode_duration) = measure_time(|| decode_heic(&data));
    let image = decoded?;
    logger.log(format!(
        "Decoding {} took {:?}",
        job.input_path.display(),
        decode_duration
    ));

    let (encoded, encode_duration) = measure_time(|| encode_jpeg(&image));
    let jpeg = encoded?;
    logger.log(format!(
        "Encoding {} took {:?}",
        job.input_path.display(),
        encode_duration
    ));

    // Encoded fully in memory first, so a failure never leaves a partial
    // file at the destination.
    fs::write(&job.output_path, &jpeg).map_err(ConvertError::Write)?;
    Ok(())
}

fn decode_heic(data: &[u8]) -> Result<RgbImage, ConvertError> {
    let lib_heif = LibHeif::new();
    let context = HeifContext::read_from_bytes(data)?;
    let handle = context.primary_image_handle()?;
    let decoded = lib_heif.decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)?;

    let planes = decoded.planes();
    let plane = planes.interleaved.ok_or(ConvertError::PixelFormat)?;

    // Rows are padded to the plane stride; repack to tightly-packed RGB.
    let row_bytes = plane.width as usize * 3;
    let mut pixels = Vec::with_capacity(row_bytes * plane.height as usize);
    for y in 0..plane.height as usize {
        let start = y * plane.stride;
        pixels.extend_from_slice(&plane.data[start..start + row_bytes]);
    }

    RgbImage::from_raw(plane.width, plane.height, pixels).ok_or(ConvertError::PixelFormat)
}

fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, ConvertError> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    encoder.encode_image(image)?;
    Ok(buffer)
}

//! Synthetic upload workload.
//!
//! Images are filled with independent random bytes per channel so the PNG
//! encoder cannot shrink them; the on-disk (and on-wire) size then tracks
//! `dimension² × 3` closely, which is what the stress run needs.

use crate::config::{size_bands, RunConfig, WorkloadSource, BAND_COUNT};
use crate::glyph;
use crate::interrupt::Interrupt;
use anyhow::{bail, Context, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder, Rgb, RgbImage};
use log::{debug, info};
use rand::Rng;
use std::fs::{self, File};
use std::io::BufWriter;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Colored rectangles stamped on each synthetic image.
const OVERLAY_RECTS: usize = 20;

#[derive(Debug, Clone)]
pub struct TestImage {
    pub path: PathBuf,
    /// Side length in pixels (images are square; seed copies report width).
    pub dimension: u32,
    pub bytes: u64,
    pub band: usize,
}

#[derive(Debug, Clone)]
pub struct Workload {
    pub images: Vec<TestImage>,
    pub total_bytes: u64,
    pub band_counts: [usize; BAND_COUNT],
    /// Dimension range of each band; `None` for seed copies.
    pub bands: Option<[RangeInclusive<u32>; BAND_COUNT]>,
    pub elapsed: Duration,
}

impl Workload {
    pub fn paths(&self) -> Vec<&Path> {
        self.images.iter().map(|img| img.path.as_path()).collect()
    }

    pub fn total_mb(&self) -> f64 {
        self.total_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn average_mb(&self) -> f64 {
        if self.images.is_empty() {
            return 0.0;
        }
        self.total_mb() / self.images.len() as f64
    }
}

/// Band assigned to the 1-based generation `index`.
pub fn band_for_index(index: usize) -> usize {
    (index - 1) % BAND_COUNT
}

/// `<prefix>_<index>.png`, zero-padded to the width of `total` so names sort
/// in generation order.
pub fn file_name(prefix: &str, index: usize, total: usize) -> String {
    let width = total.to_string().len();
    format!("{}_{:0width$}.png", prefix, index, width = width)
}

/// Produces the workload described by `config` inside `dir`.
pub fn generate(dir: &Path, config: &RunConfig, interrupt: &Interrupt) -> Result<Workload> {
    match &config.source {
        WorkloadSource::SeedCopy { seed } => {
            copy_seed(dir, seed, &config.file_prefix, config.num_uploads, interrupt)
        }
        WorkloadSource::Synthetic { min_dim, max_dim } => generate_synthetic(
            dir,
            &config.file_prefix,
            config.num_uploads,
            *min_dim,
            *max_dim,
            interrupt,
        ),
    }
}

/// Renders `count` high-entropy square PNGs with side lengths drawn from the
/// size band of each index.
pub fn generate_synthetic(
    dir: &Path,
    prefix: &str,
    count: usize,
    min_dim: u32,
    max_dim: u32,
    interrupt: &Interrupt,
) -> Result<Workload> {
    let bands = size_bands(min_dim, max_dim)?;
    info!(
        "Creating {} images, size range {}x{} to {}x{}",
        count, min_dim, min_dim, max_dim, max_dim
    );

    let start = Instant::now();
    let mut rng = rand::thread_rng();
    let mut images = Vec::with_capacity(count);
    let mut band_counts = [0usize; BAND_COUNT];
    let mut total_bytes = 0u64;

    for index in 1..=count {
        if interrupt.is_raised() {
            bail!("Interrupted during workload generation ({} of {} images created)", index - 1, count);
        }

        let band = band_for_index(index);
        let dimension = rng.gen_range(bands[band].clone());
        let path = dir.join(file_name(prefix, index, count));

        let img = render_image(dimension, index, &mut rng);
        let bytes = write_png(&path, &img)?;
        debug!("{} ({}x{}, {} bytes)", path.display(), dimension, dimension, bytes);

        band_counts[band] += 1;
        total_bytes += bytes;
        images.push(TestImage {
            path,
            dimension,
            bytes,
            band,
        });

        if index % 10 == 0 {
            info!("Created {}/{} images...", index, count);
        }
    }

    Ok(Workload {
        images,
        total_bytes,
        band_counts,
        bands: Some(bands),
        elapsed: start.elapsed(),
    })
}

/// Copies `seed` once per upload under indexed names.
pub fn copy_seed(
    dir: &Path,
    seed: &Path,
    prefix: &str,
    count: usize,
    interrupt: &Interrupt,
) -> Result<Workload> {
    if !seed.is_file() {
        bail!("Seed image '{}' not found", seed.display());
    }
    let (width, _) = image::image_dimensions(seed)
        .with_context(|| format!("'{}' is not a readable image", seed.display()))?;
    info!("Creating {} test files from {}", count, seed.display());

    let start = Instant::now();
    let mut images = Vec::with_capacity(count);
    let mut band_counts = [0usize; BAND_COUNT];
    let mut total_bytes = 0u64;

    for index in 1..=count {
        if interrupt.is_raised() {
            bail!("Interrupted while copying the seed image ({} of {} copies made)", index - 1, count);
        }
        let path = dir.join(file_name(prefix, index, count));
        let bytes = fs::copy(seed, &path)
            .with_context(|| format!("Failed to copy seed image to {}", path.display()))?;
        let band = band_for_index(index);
        band_counts[band] += 1;
        total_bytes += bytes;
        images.push(TestImage {
            path,
            dimension: width,
            bytes,
            band,
        });
    }

    Ok(Workload {
        images,
        total_bytes,
        band_counts,
        bands: None,
        elapsed: start.elapsed(),
    })
}

/// Random noise, then a handful of filled rectangles and a label with the
/// index and dimensions. Rectangles are capped at an eighth of the side so
/// most of the image stays noise.
pub fn render_image<R: Rng>(dimension: u32, index: usize, rng: &mut R) -> RgbImage {
    let mut raw = vec![0u8; dimension as usize * dimension as usize * 3];
    rng.fill(&mut raw[..]);
    let mut img = RgbImage::from_raw(dimension, dimension, raw)
        .unwrap_or_else(|| RgbImage::new(dimension, dimension));

    let max_side = (dimension / 8).max(1);
    for _ in 0..OVERLAY_RECTS {
        let x = rng.gen_range(0..dimension.saturating_sub(100).max(1));
        let y = rng.gen_range(0..dimension.saturating_sub(100).max(1));
        let w = rng.gen_range(50..=200).min(max_side);
        let h = rng.gen_range(50..=200).min(max_side);
        let color = Rgb([rng.gen(), rng.gen(), rng.gen()]);
        glyph::fill_rect(&mut img, x, y, w, h, color);
    }

    let label = format!("#{} {}x{}", index, dimension, dimension);
    let scale = (dimension / 400).max(1);
    glyph::draw_text(&mut img, 10, 10, &label, scale, Rgb([255, 255, 255]));
    img
}

/// Writes `img` as an RGB PNG with the cheapest compression settings and
/// returns the resulting file size.
pub fn write_png(path: &Path, img: &RgbImage) -> Result<u64> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let encoder = PngEncoder::new_with_quality(
        BufWriter::new(file),
        CompressionType::Fast,
        FilterType::NoFilter,
    );
    encoder
        .write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgb8)
        .with_context(|| format!("Failed to encode {}", path.display()))?;
    Ok(fs::metadata(path)?.len())
}

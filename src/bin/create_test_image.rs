//! Writes the seed image used by the stress profile.
//!
//! cargo run --bin create_test_image -- -o test_image.png

use anyhow::Result;
use clap::Parser;
use image::{Rgb, RgbImage};
use lb_harness::glyph;
use lb_harness::workload::write_png;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Create the seed image for the stress test", long_about = None)]
struct Cli {
    /// Where to write the PNG
    #[arg(short, long, default_value = "test_image.png")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut img = RgbImage::from_pixel(800, 600, Rgb([0, 0, 255]));
    glyph::outline_rect(&mut img, 150, 150, 500, 300, 3, Rgb([255, 255, 0]));

    let label = "800x600";
    let scale = 6;
    let x = (800 - glyph::text_width(label, scale)) / 2;
    let y = (600 - glyph::text_height(scale)) / 2;
    glyph::draw_text(&mut img, x, y, label, scale, Rgb([255, 255, 255]));

    let bytes = write_png(&cli.output, &img)?;
    println!("Test image created successfully: {} ({} bytes)", cli.output.display(), bytes);
    Ok(())
}

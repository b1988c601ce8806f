//! Run profiles for the harness.
//!
//! Every tunable the pipeline needs is carried in a [`RunConfig`] value that
//! is handed to each stage, so the stress and demo profiles (and the tests)
//! never share ambient state.

use anyhow::{bail, Result};
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

/// Number of size bands the dimension range is split into.
pub const BAND_COUNT: usize = 4;

/// Where the upload files come from.
#[derive(Debug, Clone)]
pub enum WorkloadSource {
    /// Copy a prerequisite seed image once per upload.
    SeedCopy { seed: PathBuf },
    /// Render high-entropy images with a side length in `[min_dim, max_dim]`.
    Synthetic { min_dim: u32, max_dim: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Stress,
    Demo,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Stress => write!(f, "stress"),
            Profile::Demo => write!(f, "demo"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub profile: Profile,
    pub num_uploads: usize,
    /// Identity argument appended to the client command line.
    pub identity: String,
    /// Program and leading arguments used to start the client.
    pub client_command: Vec<String>,
    pub source: WorkloadSource,
    /// File name prefix for generated images (`<prefix>_<index>.png`).
    pub file_prefix: String,
    pub timeout: Duration,
    pub confirm_before_start: bool,
    /// Where the raw client transcript is written.
    pub log_path: PathBuf,
}

impl RunConfig {
    /// Small-scale profile: copies of a seed image through the debug client.
    pub fn stress() -> Self {
        Self {
            profile: Profile::Stress,
            num_uploads: 30,
            identity: "testuser".to_string(),
            client_command: ["cargo", "run", "--bin", "client"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            source: WorkloadSource::SeedCopy {
                seed: PathBuf::from("test_image.png"),
            },
            file_prefix: "image".to_string(),
            timeout: Duration::from_secs(300),
            confirm_before_start: false,
            log_path: PathBuf::from("stress_test_output.log"),
        }
    }

    /// Larger-scale profile: heavy synthetic images through the release client.
    pub fn demo() -> Self {
        Self {
            profile: Profile::Demo,
            num_uploads: 50,
            identity: "demo".to_string(),
            client_command: ["cargo", "run", "--release", "--bin", "client"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            source: WorkloadSource::Synthetic {
                min_dim: 1600,
                max_dim: 3500,
            },
            file_prefix: "demo_image".to_string(),
            timeout: Duration::from_secs(600),
            confirm_before_start: true,
            log_path: PathBuf::from("demo_output.log"),
        }
    }

    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Stress => Self::stress(),
            Profile::Demo => Self::demo(),
        }
    }

    /// Checks prerequisites. Runs before anything is created or spawned.
    pub fn validate(&self) -> Result<()> {
        if self.num_uploads == 0 {
            bail!("Number of uploads must be at least 1");
        }
        if self.client_command.is_empty() {
            bail!("Client command is empty");
        }
        if self.timeout.is_zero() {
            bail!("Timeout must be greater than zero");
        }
        match &self.source {
            WorkloadSource::SeedCopy { seed } => {
                if !seed.is_file() {
                    bail!(
                        "Seed image '{}' not found. Create it with `cargo run --bin create_test_image`",
                        seed.display()
                    );
                }
            }
            WorkloadSource::Synthetic { min_dim, max_dim } => {
                size_bands(*min_dim, *max_dim)?;
            }
        }
        Ok(())
    }

    /// Full argv for the client: command followed by the identity.
    pub fn client_argv(&self) -> Vec<String> {
        let mut argv = self.client_command.clone();
        argv.push(self.identity.clone());
        argv
    }
}

/// Splits `[min_dim, max_dim]` into [`BAND_COUNT`] disjoint, contiguous,
/// inclusive ranges. The last band absorbs the remainder.
pub fn size_bands(min_dim: u32, max_dim: u32) -> Result<[RangeInclusive<u32>; BAND_COUNT]> {
    if min_dim == 0 || min_dim > max_dim {
        bail!("Invalid dimension range {}..={}", min_dim, max_dim);
    }
    let span = max_dim - min_dim + 1;
    if span < BAND_COUNT as u32 {
        bail!(
            "Dimension range {}..={} is too narrow for {} size bands",
            min_dim,
            max_dim,
            BAND_COUNT
        );
    }
    let width = span / BAND_COUNT as u32;
    let band = |k: u32| {
        let start = min_dim + k * width;
        let end = if k as usize == BAND_COUNT - 1 {
            max_dim
        } else {
            start + width - 1
        };
        start..=end
    };
    Ok([band(0), band(1), band(2), band(3)])
}

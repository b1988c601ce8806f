//! Human-readable run report and transcript persistence.

use crate::analyzer::LogRecord;
use crate::config::{RunConfig, WorkloadSource, BAND_COUNT};
use crate::driver::ProcessInvocation;
use crate::evaluator::{
    BalanceTier, Coverage, DistributionMetrics, OverallResult, Reliability, TestVerdict,
    IDEAL_SHARE,
};
use crate::workload::Workload;
use crate::NODE_COUNT;
use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;

const WIDTH: usize = 60;
const BAR_GLYPH: &str = "█";
/// Percentage points represented by one bar glyph.
const PCT_PER_GLYPH: f64 = 2.0;
/// Each upload is broadcast to every node.
const BROADCAST_FACTOR: f64 = NODE_COUNT as f64;

const BAND_NAMES: [&str; BAND_COUNT] = ["Small", "Medium", "Large", "XLarge"];

impl fmt::Display for BalanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceTier::Excellent => write!(f, "excellent"),
            BalanceTier::Good => write!(f, "good"),
            BalanceTier::Acceptable => write!(f, "acceptable"),
            BalanceTier::Poor => write!(f, "poor"),
        }
    }
}

impl fmt::Display for OverallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverallResult::DemoSuccessful => write!(f, "demo successful"),
            OverallResult::PassedWithMinorIssues => write!(f, "passed with minor issues"),
            OverallResult::IssuesDetected => write!(f, "issues detected"),
        }
    }
}

impl fmt::Display for Reliability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reliability::Perfect => write!(f, "PERFECT: 100.0% success rate"),
            Reliability::Excellent(rate) => write!(f, "EXCELLENT: {:.1}% success rate", rate),
            Reliability::Rate(rate) => write!(f, "{:.1}% success rate", rate),
        }
    }
}

/// Proportional bar for a percentage, one glyph per two points.
pub fn bar(percentage: f64) -> String {
    if !percentage.is_finite() || percentage <= 0.0 {
        return String::new();
    }
    BAR_GLYPH.repeat((percentage / PCT_PER_GLYPH) as usize)
}

/// Everything the report needs, borrowed from the pipeline stages.
pub struct Report<'a> {
    pub config: &'a RunConfig,
    pub workload: &'a Workload,
    pub invocation: &'a ProcessInvocation,
    pub record: &'a LogRecord,
    pub metrics: &'a DistributionMetrics,
    pub verdict: &'a TestVerdict,
}

impl Report<'_> {
    fn elapsed_secs(&self) -> f64 {
        self.invocation.elapsed.as_secs_f64()
    }

    fn per_second(&self, count: u64) -> f64 {
        let secs = self.elapsed_secs();
        if secs > 0.0 {
            count as f64 / secs
        } else {
            0.0
        }
    }

    fn configuration(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        header(f, &format!("LOAD BALANCING {} TEST", self.config.profile.to_string().to_uppercase()))?;
        writeln!(f, "Configuration:")?;
        writeln!(f, "  - Number of uploads: {}", self.config.num_uploads)?;
        writeln!(f, "  - Identity: {}", self.config.identity)?;
        writeln!(f, "  - Client: {}", self.invocation.argv.join(" "))?;
        match &self.config.source {
            WorkloadSource::SeedCopy { seed } => {
                writeln!(f, "  - Test image: {}", seed.display())?
            }
            WorkloadSource::Synthetic { min_dim, max_dim } => writeln!(
                f,
                "  - Image size range: {}x{} to {}x{}",
                min_dim, min_dim, max_dim, max_dim
            )?,
        }
        writeln!(f, "  - Timeout: {} seconds", self.config.timeout.as_secs())?;
        writeln!(f)
    }

    fn workload_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let workload = self.workload;
        writeln!(
            f,
            "Created {} images in {:.1} seconds",
            workload.images.len(),
            workload.elapsed.as_secs_f64()
        )?;
        if let Some(bands) = &workload.bands {
            writeln!(f, "  Distribution:")?;
            for (k, band) in bands.iter().enumerate() {
                writeln!(
                    f,
                    "    - {:<6} ({}-{}px): {:2} images",
                    BAND_NAMES[k],
                    band.start(),
                    band.end(),
                    workload.band_counts[k]
                )?;
            }
        }
        let total_mb = workload.total_mb();
        writeln!(f, "  Total size: {:.0} MB ({:.2} GB)", total_mb, total_mb / 1024.0)?;
        writeln!(f, "  Average size: {:.1} MB per image", workload.average_mb())?;
        writeln!(
            f,
            "  Network traffic ({}x broadcast): ~{:.2} GB",
            NODE_COUNT,
            total_mb / 1024.0 * BROADCAST_FACTOR
        )?;
        writeln!(f)
    }

    fn run_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed_secs();
        if self.invocation.timed_out {
            writeln!(
                f,
                "⚠ WARNING: Test timed out after {} seconds, results cover partial output",
                self.config.timeout.as_secs()
            )?;
        }
        writeln!(f, "Run completed in {:.1} seconds ({:.1} minutes)", secs, secs / 60.0)?;
        let attempted = self.record.attempted.max(1) as f64;
        writeln!(f, "  Average: {:.3} seconds per upload", secs / attempted)?;
        writeln!(
            f,
            "  Throughput: {:.2} uploads/sec",
            self.per_second(self.record.attempted)
        )?;
        writeln!(f)
    }

    fn statistics(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record;
        let pct = |n: u64| {
            if record.attempted == 0 {
                0.0
            } else {
                n as f64 / record.attempted as f64 * 100.0
            }
        };
        header(f, "Results Analysis")?;
        section(f, "Overall Statistics:")?;
        writeln!(f, "Total uploads attempted: {}", record.attempted)?;
        writeln!(f, "Successful uploads:      {} ({:.1}%)", record.successes, pct(record.successes))?;
        writeln!(f, "Failed uploads:          {} ({:.1}%)", record.failures, pct(record.failures))?;
        let secs = self.elapsed_secs();
        writeln!(f, "Total time:              {:.1} seconds ({:.1} minutes)", secs, secs / 60.0)?;
        writeln!(f, "Throughput:              {:.2} uploads/sec", self.per_second(record.successes))?;
        writeln!(f)?;

        section(f, "Request Distribution:")?;
        for node in 0..NODE_COUNT {
            writeln!(
                f,
                "Node {}: {:2} processed, {:2} declined",
                node + 1,
                record.processed[node],
                record.declined[node]
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Total processed: {} out of {} requests",
            self.metrics.total_processed, record.attempted
        )?;
        writeln!(f)
    }

    fn distribution(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(shares) = &self.metrics.shares else {
            writeln!(f, "No requests were processed, load distribution is empty")?;
            return writeln!(f);
        };

        section(f, "Load Distribution (%):")?;
        for node in 0..NODE_COUNT {
            let pct = shares.percentages[node];
            writeln!(
                f,
                "Node {}: {:5.1}%  {} ({} uploads)",
                node + 1,
                pct,
                bar(pct),
                self.record.processed[node]
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Balance Analysis:")?;
        writeln!(f, "  Expected per node: {:.1}%", IDEAL_SHARE)?;
        writeln!(f, "  Standard deviation: {:.2}%", shares.std_dev)?;
        let line = match shares.tier {
            BalanceTier::Excellent => "✓ Excellent balance (σ < 5%)",
            BalanceTier::Good => "✓ Good balance (σ < 10%)",
            BalanceTier::Acceptable => "⚠ Acceptable balance (σ < 15%)",
            BalanceTier::Poor => "✗ Poor balance (σ >= 15%)",
        };
        writeln!(f, "  {}", line)?;
        writeln!(f)
    }

    fn evaluation(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        header(f, "Evaluation")?;
        section(f, "Load Balancing:")?;
        match &self.verdict.coverage {
            Coverage::Pass => {
                writeln!(f, "✓ PASS: All {} nodes are actively processing requests", NODE_COUNT)?;
                writeln!(f, "✓ Load balancing is working!")?;
                if let Some(shares) = &self.metrics.shares {
                    if shares.balanced {
                        writeln!(f, "✓ Distribution is well-balanced (>20% per node)")?;
                        if shares.excellently_balanced {
                            writeln!(f, "✓ Distribution is excellently balanced (<40% per node)")?;
                        }
                    } else {
                        writeln!(f, "⚠ Distribution is uneven (some nodes <20%)")?;
                        writeln!(f, "  This might be due to hash distribution variance")?;
                    }
                }
            }
            Coverage::Fail { active_node } => {
                writeln!(f, "✗ FAIL: Only 1 node is processing requests")?;
                writeln!(f, "✗ Load balancing is NOT working!")?;
                writeln!(f, "  All requests going to: Node {}", active_node)?;
                writeln!(f, "  Possible issues:")?;
                writeln!(f, "  - Hash function not distributing properly")?;
                writeln!(f, "  - Only one node considered alive")?;
                writeln!(f, "  - Network connectivity issues")?;
            }
            Coverage::Warn { active, idle_nodes } => {
                writeln!(f, "⚠ WARNING: Only {} nodes are processing requests", active)?;
                writeln!(f, "  Check if all servers are running")?;
                for node in idle_nodes {
                    writeln!(f, "  - Node {} is not processing any requests", node)?;
                }
            }
        }
        writeln!(f)?;

        section(f, "Reliability:")?;
        let mark = match self.verdict.reliability {
            Reliability::Rate(_) => "⚠",
            _ => "✓",
        };
        writeln!(f, "{} {}", mark, self.verdict.reliability)?;
        writeln!(f)?;

        section(f, "Overall Result:")?;
        match self.verdict.overall {
            OverallResult::DemoSuccessful => {
                writeln!(f, "  ✓✓✓ DEMO SUCCESSFUL")?;
                writeln!(f, "  Load balancing distributes work across all nodes")?;
            }
            OverallResult::PassedWithMinorIssues => {
                writeln!(f, "  ✓ DEMO PASSED (with minor issues)")?;
                writeln!(f, "  Load balancing works but some uploads failed")?;
            }
            OverallResult::IssuesDetected => {
                writeln!(f, "  ✗ DEMO ISSUES DETECTED")?;
                writeln!(f, "  Not all nodes are participating in load balancing")?;
            }
        }
        writeln!(f, "  Result: {}", self.verdict.overall)?;
        writeln!(f)
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.configuration(f)?;
        self.workload_summary(f)?;
        self.run_summary(f)?;
        self.statistics(f)?;
        self.distribution(f)?;
        self.evaluation(f)
    }
}

fn header(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{}", "=".repeat(WIDTH))?;
    writeln!(f, "{:^width$}", title, width = WIDTH)?;
    writeln!(f, "{}", "=".repeat(WIDTH))?;
    writeln!(f)
}

fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "-".repeat(WIDTH))
}

/// Writes the raw client transcript for later inspection.
pub fn save_log(path: &Path, output: &str) -> Result<()> {
    fs::write(path, output).with_context(|| format!("Failed to write log file {}", path.display()))
}

//! The end-to-end run: generate, script, drive, analyze, evaluate.

use crate::analyzer::{self, LogRecord};
use crate::config::RunConfig;
use crate::driver::{self, ProcessInvocation};
use crate::evaluator::{self, DistributionMetrics, TestVerdict};
use crate::interrupt::Interrupt;
use crate::report::{self, Report};
use crate::script::CommandScript;
use crate::workload::{self, Workload};
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// Output of every stage of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub workload: Workload,
    pub invocation: ProcessInvocation,
    pub record: LogRecord,
    pub metrics: DistributionMetrics,
    pub verdict: TestVerdict,
}

impl RunOutcome {
    pub fn report<'a>(&'a self, config: &'a RunConfig) -> Report<'a> {
        Report {
            config,
            workload: &self.workload,
            invocation: &self.invocation,
            record: &self.record,
            metrics: &self.metrics,
            verdict: &self.verdict,
        }
    }
}

/// Runs one profile. The temporary workload directory is removed whether the
/// run succeeds, fails or is interrupted.
pub async fn run(config: &RunConfig, interrupt: &Interrupt) -> Result<RunOutcome> {
    config.validate()?;
    let workspace = Workspace::create()?;
    let result = execute(config, workspace.path(), interrupt).await;
    workspace.close();
    result
}

async fn execute(config: &RunConfig, dir: &Path, interrupt: &Interrupt) -> Result<RunOutcome> {
    let workload = {
        let dir = dir.to_path_buf();
        let config = config.clone();
        let interrupt = interrupt.clone();
        tokio::task::spawn_blocking(move || workload::generate(&dir, &config, &interrupt))
            .await
            .context("Workload generation task failed")??
    };
    info!(
        "Created {} test images ({:.1} MB) in {:.1}s",
        workload.images.len(),
        workload.total_mb(),
        workload.elapsed.as_secs_f64()
    );

    let script = CommandScript::build(&workload.paths());
    info!("Generated {} upload commands", script.upload_count());

    let invocation =
        driver::drive(&config.client_argv(), &script, config.timeout, interrupt).await?;

    report::save_log(&config.log_path, &invocation.output)?;
    info!("Full output saved to: {}", config.log_path.display());

    let record = analyzer::analyze(&invocation.output, config.num_uploads as u64);
    let (metrics, verdict) = evaluator::evaluate(&record);

    Ok(RunOutcome {
        workload,
        invocation,
        record,
        metrics,
        verdict,
    })
}

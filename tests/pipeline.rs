use anyhow::Result;
use image::{Rgb, RgbImage};
use lb_harness::config::{RunConfig, WorkloadSource};
use lb_harness::evaluator::{BalanceTier, Coverage, OverallResult, Reliability};
use lb_harness::harness;
use lb_harness::interrupt::Interrupt;
use lb_harness::workload::write_png;
use std::path::Path;
use std::time::Duration;

/// Fake client: checks each uploaded file exists, routes the first 11 uploads
/// to node 1, the next 10 to node 2 and the rest to node 3, declining on the
/// other nodes via stderr.
const ROUTING_CLIENT: &str = r#"
echo "=== Distributed Image Storage Client (REPL) ==="
echo "User: $1"
i=0
while read cmd path; do
  case "$cmd" in
    upload)
      i=$((i+1))
      if [ ! -f "$path" ]; then echo "Upload failed: $path missing"; continue; fi
      if [ $i -le 11 ]; then n=1; elif [ $i -le 21 ]; then n=2; else n=3; fi
      for s in 1 2 3; do
        if [ $s -eq $n ]; then echo "  ✓ Server $s processed request"; else echo "  - Server $s declined: not assigned" >&2; fi
      done
      echo ""
      echo "✓ Success!"
      ;;
    quit) echo "Goodbye!"; exit 0 ;;
  esac
done
"#;

fn test_config(log_dir: &Path, client: &str) -> RunConfig {
    let mut config = RunConfig::demo();
    config.num_uploads = 30;
    config.source = WorkloadSource::Synthetic {
        min_dim: 24,
        max_dim: 63,
    };
    config.client_command = vec![
        "sh".to_string(),
        "-c".to_string(),
        client.to_string(),
        "fake-client".to_string(),
    ];
    config.timeout = Duration::from_secs(30);
    config.confirm_before_start = false;
    config.log_path = log_dir.join("demo_output.log");
    config
}

#[tokio::test]
async fn even_routing_is_a_successful_demo() -> Result<()> {
    let out = tempfile::tempdir()?;
    let config = test_config(out.path(), ROUTING_CLIENT);

    let outcome = harness::run(&config, &Interrupt::never()).await?;

    assert_eq!(outcome.workload.images.len(), 30);
    assert_eq!(outcome.record.processed, [11, 10, 9]);
    assert_eq!(outcome.record.declined, [19, 20, 21]);
    assert_eq!(outcome.record.successes, 30);
    assert_eq!(outcome.record.failures, 0);
    assert!(!outcome.invocation.timed_out);

    let shares = outcome.metrics.shares.expect("uploads were processed");
    assert!(matches!(shares.tier, BalanceTier::Excellent | BalanceTier::Good));
    assert_eq!(outcome.verdict.coverage, Coverage::Pass);
    assert_eq!(outcome.verdict.reliability, Reliability::Perfect);
    assert_eq!(outcome.verdict.overall, OverallResult::DemoSuccessful);

    // Transcript persisted, workload removed.
    let log = std::fs::read_to_string(&config.log_path)?;
    assert!(log.contains("User: demo"));
    assert_eq!(log, outcome.invocation.output);
    assert!(outcome.workload.images.iter().all(|img| !img.path.exists()));
    let workload_dir = outcome.workload.images[0].path.parent().unwrap();
    assert!(!workload_dir.exists());

    let report = outcome.report(&config).to_string();
    println!("{}", report);
    assert!(report.contains("✓ PASS: All 3 nodes are actively processing requests"));
    assert!(report.contains("PERFECT: 100.0% success rate"));
    assert!(report.contains("DEMO SUCCESSFUL"));
    assert!(report.contains("█"));
    Ok(())
}

#[tokio::test]
async fn silent_client_degrades_to_neutral_report() -> Result<()> {
    let out = tempfile::tempdir()?;
    let config = test_config(out.path(), "cat > /dev/null; echo 'error: connection refused'");

    let outcome = harness::run(&config, &Interrupt::never()).await?;

    assert!(outcome.metrics.is_neutral());
    assert_eq!(outcome.record.failures, 30);
    assert_eq!(outcome.verdict.overall, OverallResult::IssuesDetected);

    let report = outcome.report(&config).to_string();
    assert!(report.contains("No requests were processed"));
    assert!(!report.contains("█"));
    Ok(())
}

#[tokio::test]
async fn timed_out_run_is_still_analyzed() -> Result<()> {
    let out = tempfile::tempdir()?;
    let mut config = test_config(
        out.path(),
        r#"read first; echo "  ✓ Server 2 processed request"; echo "✓ Success!"; sleep 30"#,
    );
    config.num_uploads = 4;
    config.timeout = Duration::from_secs(1);

    let outcome = harness::run(&config, &Interrupt::never()).await?;

    assert!(outcome.invocation.timed_out);
    assert_eq!(outcome.record.processed, [0, 1, 0]);
    assert_eq!(outcome.verdict.coverage, Coverage::Fail { active_node: 2 });
    assert_eq!(outcome.verdict.reliability, Reliability::Rate(25.0));

    let report = outcome.report(&config).to_string();
    assert!(report.contains("timed out"));
    assert!(report.contains("All requests going to: Node 2"));
    Ok(())
}

#[tokio::test]
async fn interrupted_run_still_removes_the_workload() -> Result<()> {
    let out = tempfile::tempdir()?;
    let marker = out.path().join("first_command");
    let client = format!("read first; echo \"$first\" > '{}'; sleep 30", marker.display());
    let mut config = test_config(out.path(), &client);
    config.num_uploads = 3;

    let (trigger, interrupt) = Interrupt::new();
    let watcher = tokio::spawn({
        let marker = marker.clone();
        async move {
            while !marker.exists() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            trigger.raise();
        }
    });

    let result = harness::run(&config, &interrupt).await;
    watcher.await?;
    assert!(result.is_err());

    let first = std::fs::read_to_string(&marker)?;
    let uploaded = first.trim().strip_prefix("upload ").expect("upload command");
    assert!(!Path::new(uploaded).exists());
    assert!(!Path::new(uploaded).parent().unwrap().exists());
    assert!(!config.log_path.exists(), "no log is written for an interrupted run");
    Ok(())
}

#[tokio::test]
async fn stress_profile_copies_the_seed_and_warns_on_idle_node() -> Result<()> {
    let out = tempfile::tempdir()?;
    let seed = out.path().join("test_image.png");
    write_png(&seed, &RgbImage::from_pixel(80, 60, Rgb([0, 0, 255])))?;

    let mut config = RunConfig::stress();
    config.source = WorkloadSource::SeedCopy { seed };
    config.num_uploads = 6;
    config.log_path = out.path().join("stress_test_output.log");
    config.client_command = vec![
        "sh".to_string(),
        "-c".to_string(),
        r#"i=0; while read cmd path; do [ "$cmd" = upload ] || continue; i=$((i+1)); n=$(( (i % 2) * 2 + 1 )); echo "Server $n processed request"; echo "✓ Success!"; done"#.to_string(),
        "fake-client".to_string(),
    ];

    let outcome = harness::run(&config, &Interrupt::never()).await?;

    assert_eq!(outcome.record.processed, [3, 0, 3]);
    assert_eq!(
        outcome.verdict.coverage,
        Coverage::Warn {
            active: 2,
            idle_nodes: vec![2]
        }
    );
    assert_eq!(outcome.verdict.overall, OverallResult::IssuesDetected);
    assert!(outcome.workload.images.iter().all(|img| img.dimension == 80));

    let report = outcome.report(&config).to_string();
    assert!(report.contains("Node 2 is not processing any requests"));
    Ok(())
}

use lb_harness::analyzer::{self, declined_marker, processed_marker, LogRecord, SUCCESS_MARKER};
use lb_harness::evaluator::{
    self, BalanceTier, Coverage, OverallResult, Reliability, IDEAL_SHARE,
};
use lb_harness::report::bar;

/// Client-like transcript with decorations and noise around each marker.
fn transcript(processed: [usize; 3], declined: [usize; 3], successes: usize) -> String {
    let mut out = String::from("=== Distributed Image Storage Client (REPL) ===\ntestuser> \n");
    for (node, &n) in processed.iter().enumerate() {
        for i in 0..n {
            out.push_str(&format!("Broadcasting request to 3 servers...\n  Sending to server {} at 127.0.0.1:800{}\n", node + 1, node + 1));
            out.push_str(&format!("[12:00:{:02}]  ✓ {}\n", i, processed_marker(node + 1)));
        }
    }
    for (node, &n) in declined.iter().enumerate() {
        for _ in 0..n {
            out.push_str(&format!("  - {} Not assigned to this node\n", declined_marker(node + 1)));
        }
    }
    for _ in 0..successes {
        out.push_str(&format!("\n{}\nEncrypted image saved to: images/encrypted_x.png\n", SUCCESS_MARKER));
    }
    out.push_str("Goodbye!\n");
    out
}

fn record(processed: [u64; 3], successes: u64, attempted: u64) -> LogRecord {
    LogRecord {
        processed,
        successes,
        failures: attempted - successes,
        attempted,
        ..LogRecord::default()
    }
}

#[test]
fn analyzer_counts_markers_between_noise() {
    let text = transcript([5, 3, 2], [5, 7, 8], 9);
    let record = analyzer::analyze(&text, 10);

    assert_eq!(record.processed, [5, 3, 2]);
    assert_eq!(record.declined, [5, 7, 8]);
    assert_eq!(record.successes, 9);
    assert_eq!(record.failures, 1);
    assert_eq!(record.successes + record.failures, record.attempted);
}

#[test]
fn analyzer_counts_duplicate_lines_independently() {
    let line = format!("{}\n", processed_marker(2));
    let text = line.repeat(4);
    let record = analyzer::analyze(&text, 4);
    assert_eq!(record.processed, [0, 4, 0]);
}

#[test]
fn analyzer_yields_zeros_for_unrelated_output() {
    let record = analyzer::analyze("error: could not compile `client`\n", 30);
    assert_eq!(record.total_processed(), 0);
    assert_eq!(record.total_declined(), 0);
    assert_eq!(record.successes, 0);
    assert_eq!(record.failures, 30);
}

#[test]
fn analyzer_clamps_failures_when_successes_overcount() {
    let text = format!("{}\n", SUCCESS_MARKER).repeat(5);
    let record = analyzer::analyze(&text, 3);
    assert_eq!(record.successes, 5);
    assert_eq!(record.failures, 0);
}

#[test]
fn near_even_split_is_excellent() {
    let metrics = evaluator::distribution(&[34, 33, 33]);
    let shares = metrics.shares.expect("non-empty distribution");

    assert_eq!(shares.percentages, [34.0, 33.0, 33.0]);
    assert!((shares.std_dev - 0.4714).abs() < 0.001, "σ = {}", shares.std_dev);
    assert_eq!(shares.tier, BalanceTier::Excellent);
    assert!(shares.balanced);
    assert!(shares.excellently_balanced);
}

#[test]
fn std_dev_is_measured_against_the_ideal_split() {
    // Sample-mean variance of (50, 50, 0) would differ; the ideal is fixed at 100/3.
    let shares = evaluator::distribution(&[1, 1, 0]).shares.unwrap();
    let expected = (((50.0 - IDEAL_SHARE).powi(2) * 2.0 + IDEAL_SHARE.powi(2)) / 3.0).sqrt();
    assert!((shares.std_dev - expected).abs() < 1e-9);
    assert_eq!(shares.tier, BalanceTier::Poor);
    assert!(!shares.balanced);
}

#[test]
fn percentages_sum_to_one_hundred() {
    for processed in [[1u64, 2, 3], [7, 0, 0], [11, 10, 9], [1, 1, 1]] {
        let metrics = evaluator::distribution(&processed);
        let sum: f64 = metrics.percentages().iter().sum();
        assert!((sum - 100.0).abs() < 1e-9, "{:?} sums to {}", processed, sum);
    }
}

#[test]
fn tiers_follow_std_dev_thresholds() {
    assert_eq!(BalanceTier::from_std_dev(4.99), BalanceTier::Excellent);
    assert_eq!(BalanceTier::from_std_dev(5.0), BalanceTier::Good);
    assert_eq!(BalanceTier::from_std_dev(9.99), BalanceTier::Good);
    assert_eq!(BalanceTier::from_std_dev(10.0), BalanceTier::Acceptable);
    assert_eq!(BalanceTier::from_std_dev(14.99), BalanceTier::Acceptable);
    assert_eq!(BalanceTier::from_std_dev(15.0), BalanceTier::Poor);
}

#[test]
fn balanced_but_not_excellently() {
    // 45% on node 1 is above the 40% ceiling, everyone is above 20%.
    let shares = evaluator::distribution(&[45, 30, 25]).shares.unwrap();
    assert!(shares.balanced);
    assert!(!shares.excellently_balanced);
}

#[test]
fn single_active_node_fails_and_is_named() {
    let (metrics, verdict) = evaluator::evaluate(&record([100, 0, 0], 100, 100));
    assert_eq!(verdict.coverage, Coverage::Fail { active_node: 1 });
    assert_eq!(verdict.overall, OverallResult::IssuesDetected);
    assert_eq!(metrics.percentages(), [100.0, 0.0, 0.0]);

    assert_eq!(evaluator::coverage(&[0, 0, 8]), Coverage::Fail { active_node: 3 });
}

#[test]
fn two_active_nodes_warn_and_list_the_idle_one() {
    assert_eq!(
        evaluator::coverage(&[4, 0, 6]),
        Coverage::Warn {
            active: 2,
            idle_nodes: vec![2]
        }
    );
}

#[test]
fn nothing_processed_is_neutral() {
    let (metrics, verdict) = evaluator::evaluate(&record([0, 0, 0], 0, 30));

    assert!(metrics.is_neutral());
    assert_eq!(metrics.total_processed, 0);
    assert!(metrics.percentages().iter().all(|p| *p == 0.0));
    assert_eq!(
        verdict.coverage,
        Coverage::Warn {
            active: 0,
            idle_nodes: vec![1, 2, 3]
        }
    );
    assert_eq!(verdict.success_rate, 0.0);
    assert!(!verdict.success_rate.is_nan());
    assert_eq!(verdict.overall, OverallResult::IssuesDetected);
}

#[test]
fn reliability_tiers() {
    assert_eq!(Reliability::from_rate(100.0), Reliability::Perfect);
    assert_eq!(Reliability::from_rate(96.0), Reliability::Excellent(96.0));
    assert_eq!(Reliability::from_rate(95.0), Reliability::Excellent(95.0));
    assert_eq!(Reliability::from_rate(80.0), Reliability::Rate(80.0));
    assert_eq!(evaluator::success_rate(5, 0), 0.0);
}

#[test]
fn overall_result_combines_coverage_and_reliability() {
    let (_, verdict) = evaluator::evaluate(&record([11, 10, 9], 30, 30));
    assert_eq!(verdict.overall, OverallResult::DemoSuccessful);

    let (_, verdict) = evaluator::evaluate(&record([11, 10, 9], 25, 30));
    assert_eq!(verdict.reliability, Reliability::Rate(25.0 / 30.0 * 100.0));
    assert_eq!(verdict.overall, OverallResult::PassedWithMinorIssues);

    let (_, verdict) = evaluator::evaluate(&record([15, 15, 0], 30, 30));
    assert_eq!(verdict.overall, OverallResult::IssuesDetected);
}

#[test]
fn bars_scale_with_percentage() {
    assert_eq!(bar(0.0).chars().count(), 0);
    assert_eq!(bar(33.3).chars().count(), 16);
    assert_eq!(bar(100.0).chars().count(), 50);
    assert_eq!(bar(f64::NAN), "");
}

#[path = "common/mod.rs"]
mod common;

use std::collections::HashSet;

use blake3::hash;
use common::uniform;
use deltashape::report::render_report;
use deltashape::{AnalysisConfig, DeltaShape};

fn wavy(len: usize, phase: f64) -> Vec<f64> {
    (0..len)
        .map(|i| ((i as f64 * 0.37 + phase).sin() + 1.0) * 0.8)
        .collect()
}

#[test]
fn report_is_identical_across_runs() {
    let a = uniform(&wavy(300, 0.0), 0.04);
    let b = uniform(&wavy(300, 0.9), 0.06);
    let config = AnalysisConfig::default()
        .with_masks(10, 20)
        .with_report_all(true)
        .with_rank_by_magnitude(true);

    let mut fingerprints = HashSet::new();
    for _ in 0..5 {
        let analysis = DeltaShape::new(config.clone()).expect("valid config");
        let results = analysis.run((&a, &b), (&b, &a)).expect("run succeeds");
        let report = render_report(&analysis.report(&results)).expect("rendering succeeds");
        fingerprints.insert(hash(report.as_bytes()));
    }

    assert_eq!(fingerprints.len(), 1, "reports diverged across runs");
}

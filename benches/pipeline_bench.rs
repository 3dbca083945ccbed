//! Pipeline benchmarks on a synthetic 2 kb transcript

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use deltashape::signal::{calc_zscore, smooth};
use deltashape::{AnalysisConfig, DeltaShape, NucleotideProfile};

const LEN: usize = 2_000;

fn synthetic(phase: f64) -> NucleotideProfile {
    let reactivity = (0..LEN)
        .map(|i| {
            if i % 97 == 0 {
                None
            } else {
                Some(((i as f64 * 0.13 + phase).sin() + 1.0) * 0.7)
            }
        })
        .collect();
    NucleotideProfile::new(reactivity, vec![Some(0.05); LEN], vec![b'A'; LEN])
        .expect("synthetic profile")
}

fn benchmark_pipeline(c: &mut Criterion) {
    let a = synthetic(0.0);
    let b = synthetic(0.4);
    let analysis = DeltaShape::new(AnalysisConfig::default().with_masks(19, 43)).expect("valid config");

    c.bench_function("smooth_pad1_2kb", |bench| {
        bench.iter(|| smooth(black_box(a.reactivity()), black_box(a.stderr()), 1));
    });

    let diff = smooth(a.reactivity(), a.stderr(), 1).values;
    c.bench_function("zscore_2kb", |bench| {
        bench.iter(|| calc_zscore(black_box(&diff)));
    });

    c.bench_function("compare_2kb", |bench| {
        bench.iter(|| analysis.compare(black_box(&a), black_box(&b)));
    });

    c.bench_function("run_and_report_2kb", |bench| {
        bench.iter(|| {
            let results = analysis.run((&a, &b), (&b, &a)).expect("run");
            black_box(analysis.report(&results))
        });
    });
}

criterion_group!(benches, benchmark_pipeline);
criterion_main!(benches);

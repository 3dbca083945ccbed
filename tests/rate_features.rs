use std::fs::{self, File};
use std::io::BufWriter;

use deltashape::rates::{
    merge_predictions, read_counts, read_predictions, write_predictions, FeatureTable, RateFilter,
};

fn count_table(rows: usize) -> String {
    let mut out = String::from(
        "pipe_truncation_ChrPos,rf_mutation_Base,base_A,base_C,base_G,base_T,rf_mutation_Count,rf_mutation_Depth,pipe_truncation_count\n",
    );
    for i in 0..rows {
        let depth = 100 + 10 * i;
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{}\n",
            i + 1,
            ["A", "C", "G", "T"][i % 4],
            depth / 4,
            depth / 4,
            depth / 4,
            depth / 4,
            i % 7,
            depth,
            (i * 3) % 11,
        ));
    }
    out
}

#[test]
fn count_table_becomes_features_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let counts_path = dir.path().join("counts.csv");
    fs::write(&counts_path, count_table(40)).expect("write counts");

    let counts = read_counts(File::open(&counts_path).expect("open")).expect("parse counts");
    assert_eq!(counts.len(), 40);

    let filter = RateFilter {
        excluded_bases: vec!["G".into()],
        ..RateFilter::default()
    };
    let table = FeatureTable::build(&counts, &filter).expect("features");
    assert_eq!(table.rows.len(), 30);
    assert!(table.rows.iter().all(|r| r.position % 4 != 3));

    let out_path = dir.path().join("features.csv");
    table
        .write_csv(BufWriter::new(File::create(&out_path).expect("create")))
        .expect("write features");
    let text = fs::read_to_string(&out_path).expect("read features");
    assert_eq!(text.lines().count(), 31);
    assert!(text.lines().skip(1).all(|line| line.split(',').count() == 8));
}

#[test]
fn control_table_corrects_treated_rates() {
    let dir = tempfile::tempdir().expect("temp dir");
    let treated_path = dir.path().join("treated.csv");
    let control_path = dir.path().join("control.csv");
    fs::write(&treated_path, count_table(40)).expect("write treated");
    // Control matches every treated row except position 1, which it lacks.
    let control_text: String = count_table(41)
        .lines()
        .enumerate()
        .filter(|(i, _)| *i != 1)
        .map(|(_, line)| format!("{line}\n"))
        .collect();
    fs::write(&control_path, control_text).expect("write control");

    let treated = read_counts(File::open(&treated_path).expect("open")).expect("parse treated");
    let control = read_counts(File::open(&control_path).expect("open")).expect("parse control");
    assert_eq!(control.len(), 40);

    let table = FeatureTable::build_with_control(&treated, &control, &RateFilter::default())
        .expect("features");
    // Identical treated and control rows correct to zero.
    assert_eq!(table.rows.len(), 39);
    assert!(table.rows.iter().all(|r| r.position != 1));
    assert!(table.rows.iter().all(|r| r.is_complete()));
    assert!(table.rows.iter().all(|r| r.rate_mut == Some(0.0)));

    let plain = FeatureTable::build(&treated, &RateFilter::default()).expect("features");
    assert_eq!(plain.rows.len(), 40);
    assert_ne!(plain.rows[1].rate_mut, table.rows[0].rate_mut);
}

#[test]
fn sparse_predictions_cover_the_transcript() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("predictions.csv");
    fs::write(
        &input,
        "ChrPos,predict,mut_score,stop_score\n3,0.9,0.4,0.1\n7,0.05,0.01,0.02\n12,0.5,0.5,0.5\n",
    )
    .expect("write predictions");

    let predictions = read_predictions(File::open(&input).expect("open")).expect("parse");
    let rows = merge_predictions(&predictions, 10);
    assert_eq!(rows.len(), 10);
    assert_eq!(rows.iter().filter(|r| r.prediction.is_some()).count(), 2);

    let output = dir.path().join("merged.csv");
    write_predictions(File::create(&output).expect("create"), &rows).expect("write");
    let text = fs::read_to_string(&output).expect("read merged");
    assert_eq!(text.lines().nth(3), Some("3,0.9,0.4,0.1"));
    assert_eq!(text.lines().nth(1), Some("1,NULL,NULL,NULL"));
}

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use deltashape::profile::format_value;
use deltashape::NucleotideProfile;

/// Ten-nucleotide pair where positions 5..=7 (1-based) gained 2.0 reactivity.
pub fn bump_pair() -> (NucleotideProfile, NucleotideProfile) {
    let mut a = vec![0.5; 10];
    for v in &mut a[4..7] {
        *v = 2.5;
    }
    (uniform(&a, 0.05), uniform(&[0.5; 10], 0.05))
}

/// Profile of present values with one shared standard error.
pub fn uniform(values: &[f64], stderr: f64) -> NucleotideProfile {
    NucleotideProfile::new(
        values.iter().map(|&v| Some(v)).collect(),
        vec![Some(stderr); values.len()],
        "GACU".bytes().cycle().take(values.len()).collect::<Vec<_>>(),
    )
    .expect("tracks share a length")
}

/// Render a reactivity table the way upstream SHAPE-MaP tools do.
pub fn profile_csv(profile: &NucleotideProfile) -> String {
    let mut out = String::from("Nucleotide,Reactivity,Standard Error,Nucleotide Type\n");
    for i in 0..profile.len() {
        out.push_str(&format!(
            "{},{},{},{}\n",
            i + 1,
            format_value(profile.reactivity()[i]),
            format_value(profile.stderr()[i]),
            profile.base(i)
        ));
    }
    out
}

/// Write `profile` as `name` under `dir`.
pub fn write_profile(dir: &Path, name: &str, profile: &NucleotideProfile) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, profile_csv(profile)).expect("write profile fixture");
    path
}

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use deltashape::config::parse_find_site;
use deltashape::rates::{self, FeatureTable, RateFilter};
use deltashape::report::write_report;
use deltashape::{AnalysisConfig, DeltaShape, PlotRange};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "deltashape",
    version,
    about = "Statistically significant changes in SHAPE-MaP reactivity between conditions"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find deltaSHAPE sites for two condition pairs.
    Compare(CompareArgs),
    /// Build classifier rate features from a mutation/truncation count table.
    Features(FeatureArgs),
    /// Spread classifier predictions over every transcript position.
    MergePredictions {
        /// Predictions CSV (`ChrPos,predict,mut_score,stop_score`).
        predictions: PathBuf,
        /// Transcript length.
        #[arg(long = "len")]
        sequence_length: usize,
        /// Output CSV.
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Reactivity CSV for the first comparison.
    csv1: PathBuf,
    /// Reactivity CSV subtracted from csv1.
    csv2: PathBuf,
    /// Reactivity CSV for the second comparison.
    csv3: PathBuf,
    /// Reactivity CSV subtracted from csv3.
    csv4: PathBuf,

    /// Nucleotides to ignore at the 5' end.
    #[arg(long, default_value_t = 0)]
    mask5: usize,
    /// Nucleotides to ignore at the 3' end.
    #[arg(long, default_value_t = 0)]
    mask3: usize,
    /// Smoothing pad; window = 2*pad+1, 0 turns smoothing off.
    #[arg(short, long, default_value_t = 1)]
    pad: usize,
    /// Z-factor equation coefficient.
    #[arg(short = 'z', long = "zcoeff", default_value_t = 1.96, allow_negative_numbers = true)]
    zcoeff: f64,
    /// Z-factor cutoff; may not exceed 1.
    #[arg(short = 't', long = "zthresh", default_value_t = 0.0, allow_negative_numbers = true)]
    zthresh: f64,
    /// Standard score cutoff.
    #[arg(short = 's', long = "ss-thresh", default_value_t = 1.0, allow_negative_numbers = true)]
    ss_thresh: f64,
    /// Site window pad and required hits, e.g. `2,3` for 3+ hits in 5 nucleotides.
    #[arg(short = 'f', long = "find-site", default_value = "2,3", value_parser = parse_find_site)]
    find_site: (usize, usize),

    /// Report file.
    #[arg(short, long, default_value = "differences.txt")]
    out: PathBuf,
    /// Sort by decreasing deltaSHAPE magnitude.
    #[arg(long)]
    magrank: bool,
    /// Report every nucleotide; insignificant changes are listed as zero.
    #[arg(long)]
    all: bool,

    /// Plot x-axis minimum.
    #[arg(long, allow_negative_numbers = true)]
    xmin: Option<f64>,
    /// Plot x-axis maximum.
    #[arg(long, allow_negative_numbers = true)]
    xmax: Option<f64>,
    /// Plot y-axis minimum.
    #[arg(long, allow_negative_numbers = true)]
    ymin: Option<f64>,
    /// Plot y-axis maximum.
    #[arg(long, allow_negative_numbers = true)]
    ymax: Option<f64>,
    /// Write plot data (layout, tracks, sites) as JSON.
    #[cfg(feature = "visualize")]
    #[arg(long)]
    plot_data: Option<PathBuf>,
    /// Include filter markers in the plot data.
    #[cfg(feature = "visualize")]
    #[arg(long)]
    markers: bool,
}

impl CompareArgs {
    fn config(&self) -> AnalysisConfig {
        let (site_pad, site_min) = self.find_site;
        AnalysisConfig::default()
            .with_masks(self.mask5, self.mask3)
            .with_pad(self.pad)
            .with_zfactor(self.zcoeff, self.zthresh)
            .with_score_threshold(self.ss_thresh)
            .with_site_window(site_pad, site_min)
            .with_report_all(self.all)
            .with_rank_by_magnitude(self.magrank)
            .with_plot_range(PlotRange {
                xmin: self.xmin,
                xmax: self.xmax,
                ymin: self.ymin,
                ymax: self.ymax,
            })
    }
}

#[derive(Args, Debug)]
struct FeatureArgs {
    /// Count table CSV.
    counts: PathBuf,
    /// Untreated control count table; treated rates are background-corrected against it.
    #[arg(long)]
    control: Option<PathBuf>,
    /// Output feature CSV.
    #[arg(short, long)]
    out: PathBuf,
    /// Minimum read depth.
    #[arg(long, default_value_t = 50.0)]
    min_depth: f64,
    /// Maximum truncation rate.
    #[arg(long, default_value_t = 1.0)]
    max_rate_stop: f64,
    /// Maximum mutation rate (exclusive).
    #[arg(long, default_value_t = 0.25)]
    max_rate_mut: f64,
    /// Minimum mutation count.
    #[arg(long, default_value_t = 0.0)]
    min_mutation_count: f64,
    /// Minimum truncation count.
    #[arg(long, default_value_t = 0.0)]
    min_truncation_count: f64,
    /// Bases to drop, comma separated.
    #[arg(long, value_delimiter = ',')]
    exclude_base: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compare(args) => run_compare(&args)?,
        Commands::Features(args) => run_features(&args)?,
        Commands::MergePredictions {
            predictions,
            sequence_length,
            out,
        } => run_merge(&predictions, sequence_length, &out)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_compare(args: &CompareArgs) -> Result<()> {
    let analysis = DeltaShape::new(args.config()).context("invalid analysis parameters")?;

    let load = |path: &PathBuf| {
        analysis
            .load_profile(path)
            .with_context(|| format!("failed to load reactivities from {}", path.display()))
    };
    let (p1, p2, p3, p4) = (load(&args.csv1)?, load(&args.csv2)?, load(&args.csv3)?, load(&args.csv4)?);

    let results = analysis
        .run((&p1, &p2), (&p3, &p4))
        .context("deltaSHAPE comparison failed")?;
    let blocks = analysis.report(&results);

    let file = File::create(&args.out)
        .with_context(|| format!("failed to create report {}", args.out.display()))?;
    write_report(&mut BufWriter::new(file), &blocks)
        .with_context(|| format!("failed to write report {}", args.out.display()))?;
    info!(
        out = %args.out.display(),
        records = blocks.iter().map(Vec::len).sum::<usize>(),
        "report written"
    );

    #[cfg(feature = "visualize")]
    if let Some(path) = &args.plot_data {
        let labels = [label(&args.csv1), label(&args.csv3)];
        let data = deltashape::plot::PlotData::new(
            analysis.config(),
            &[(labels[0].as_str(), &results[0]), (labels[1].as_str(), &results[1])],
            args.markers,
        );
        std::fs::write(path, data.to_json()?)
            .with_context(|| format!("failed to write plot data {}", path.display()))?;
    }

    Ok(())
}

#[cfg_attr(not(feature = "visualize"), allow(dead_code))]
fn label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_count_table(path: &Path) -> Result<Vec<rates::CountRecord>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open count table {}", path.display()))?;
    rates::read_counts(file).with_context(|| format!("failed to read count table {}", path.display()))
}

fn run_features(args: &FeatureArgs) -> Result<()> {
    let counts = read_count_table(&args.counts)?;

    let filter = RateFilter {
        min_depth: args.min_depth,
        max_rate_stop: args.max_rate_stop,
        max_rate_mut: args.max_rate_mut,
        min_mutation_count: args.min_mutation_count,
        min_truncation_count: args.min_truncation_count,
        excluded_bases: args.exclude_base.clone(),
    };
    let table = match &args.control {
        Some(path) => {
            let control = read_count_table(path)?;
            FeatureTable::build_with_control(&counts, &control, &filter)
        }
        None => FeatureTable::build(&counts, &filter),
    }
    .context("feature extraction failed")?;

    let out = File::create(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    table.write_csv(BufWriter::new(out))?;
    info!(rows = table.rows.len(), out = %args.out.display(), "features written");
    Ok(())
}

fn run_merge(predictions_path: &Path, sequence_length: usize, out_path: &Path) -> Result<()> {
    let file = File::open(predictions_path)
        .with_context(|| format!("failed to open predictions {}", predictions_path.display()))?;
    let predictions = rates::read_predictions(file)?;
    let rows = rates::merge_predictions(&predictions, sequence_length);

    let out = File::create(out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;
    rates::write_predictions(BufWriter::new(out), &rows)?;
    info!(rows = rows.len(), out = %out_path.display(), "predictions merged");
    Ok(())
}

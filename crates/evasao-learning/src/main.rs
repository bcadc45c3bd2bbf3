//! CLI entry point for training the dropout model.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use evasao_data::load_dataset;
use evasao_learning::{Pipeline, PipelineConfig, ProgressUpdate, TrainingResult};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Train the academic dropout prediction model",
    long_about = "Trains a random forest that predicts whether a student drops out \
                  (Desistente) or graduates (Graduado), prints cross-validation and \
                  held-out metrics, and writes the model artifact used by evasao-web.\n\n\
                  EXAMPLES:\n  \
                  # Train with the default dataset and output path\n  \
                  evasao-train\n\n  \
                  # Another dataset, a larger forest, and a JSON report\n  \
                  evasao-train -i dados/alunos.parquet --n-estimators 300 --report relatorio.json"
)]
struct Args {
    /// Labeled dataset (CSV, Parquet or xlsx) with a Target column
    #[arg(short, long, default_value = "dados/StudentsPrepared.csv")]
    input: PathBuf,

    /// Where to write the trained model
    #[arg(short, long, default_value = "modelo_evasao.bin")]
    output: PathBuf,

    /// Number of trees in the forest
    #[arg(long, default_value = "100")]
    n_estimators: usize,

    /// Random seed for the split, the folds and the forest
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Number of stratified cross-validation folds
    #[arg(long, default_value = "5")]
    cv_folds: usize,

    /// Fraction of rows held out for testing
    #[arg(long, default_value = "0.2")]
    test_size: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Also write the full training result as JSON to this path
    #[arg(short, long)]
    report: Option<PathBuf>,
}

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over `--log-level`.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    let config = PipelineConfig::builder()
        .n_estimators(args.n_estimators)
        .random_seed(args.seed)
        .cv_folds(args.cv_folds)
        .test_size(args.test_size)
        .build()?;

    info!("Loading dataset from: {}", args.input.display());
    let df = load_dataset(&args.input)?;

    let mut pipeline = Pipeline::builder()
        .config(config)
        .on_progress(|update: ProgressUpdate| {
            debug!(stage = %update.stage, "{:.0}% {}", update.progress * 100.0, update.message);
        })
        .build()?;

    let result = pipeline.train(&df)?;
    print_summary(&result);

    let model = pipeline.create_trained_model()?;
    model
        .save(&args.output)
        .with_context(|| format!("Saving model to {}", args.output.display()))?;
    info!("Model written to {}", args.output.display());

    if let Some(path) = &args.report {
        write_report(&result, path)?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}

/// Print the evaluation summary.
///
/// Uses `println!` intentionally: this is the operator-facing output of the
/// command and must show regardless of the log level.
fn print_summary(result: &TrainingResult) {
    let metrics = &result.metrics;
    println!(
        "AUC ROC médio (validação cruzada): {:.4} ± {:.4}",
        metrics.cv_auc_mean, metrics.cv_auc_std
    );
    println!("\nRelatório de Classificação (Teste):");
    println!("{}", result.classification_report);
    println!("Matriz de confusão:");
    println!("{}", result.confusion_matrix);
    println!("AUC ROC (Teste): {:.4}", metrics.test_auc);
    println!("AUC ROC (Treino): {:.4}", metrics.train_auc);
    println!("{}", result.diagnosis.message());
}

fn write_report(result: &TrainingResult, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json).with_context(|| format!("Writing report to {}", path.display()))?;
    Ok(())
}

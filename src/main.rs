use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use remittance_normalizer::{
    format_amount, BatchPipeline, BatchResult, CellValue, PipelineOptions, QualityEngine,
    RawRow, RegionConfig, RegionRegistry, StrategyCatalog,
};

const USAGE: &str = "Usage: remittance-normalizer <matrix.csv|matrix.json> <REGION> \
[--regions <file>] [--workers N] [--json] [--diagnose]";

struct CliArgs {
    input: String,
    region: String,
    regions_file: Option<String>,
    workers: usize,
    json: bool,
    diagnose: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    run(&cli)
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut positional = Vec::new();
    let mut regions_file = None;
    let mut workers = 1;
    let mut json = false;
    let mut diagnose = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--regions" => {
                let path = iter.next().context("--regions needs a file path")?;
                regions_file = Some(path.clone());
            }
            "--workers" => {
                let value = iter.next().context("--workers needs a number")?;
                workers = value
                    .parse::<usize>()
                    .with_context(|| format!("Invalid worker count: {}", value))?
                    .max(1);
            }
            "--json" => json = true,
            "--diagnose" => diagnose = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => bail!("Unknown option: {}\n{}", flag, USAGE),
            _ => positional.push(arg.clone()),
        }
    }

    if positional.len() != 2 {
        bail!("{}", USAGE);
    }

    let region = positional.pop().unwrap_or_default();
    let input = positional.pop().unwrap_or_default();

    Ok(CliArgs {
        input,
        region,
        regions_file,
        workers,
        json,
        diagnose,
    })
}

fn run(cli: &CliArgs) -> Result<()> {
    // 1. Regions
    let registry = match &cli.regions_file {
        Some(path) => RegionRegistry::from_file(path)
            .with_context(|| format!("Failed to load regions from {}", path))?,
        None => RegionRegistry::builtin().context("Failed to load built-in regions")?,
    };

    let options = PipelineOptions {
        workers: cli.workers,
        ..PipelineOptions::default()
    };
    let pipeline = BatchPipeline::new(Arc::new(registry), StrategyCatalog::builtin())?
        .with_options(options);

    // 2. Input
    let path = Path::new(&cli.input);
    let result = if is_json(path) {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let matrix: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;
        pipeline.run_json(&matrix, &cli.region)?
    } else {
        let rows = read_csv_matrix(path)?;
        pipeline.run(&rows, &cli.region)?
    };

    // 3. Output
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let config = pipeline.registry().get_config(&cli.region)?;
    print_result(config, &result);

    if cli.diagnose {
        print_diagnostics(&result);
    }

    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Read a CSV export; the header row is dropped and empty cells become Empty
fn read_csv_matrix(path: &Path) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", index + 1))?;
        let row: RawRow = record
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::from(cell)
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

fn print_result(config: &RegionConfig, result: &BatchResult) {
    println!("🌍 {} ({}) - {}", config.name, config.code, config.currency.code());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📄 {}: {}", config.label("records"), result.records.len());
    for record in &result.records {
        println!(
            "  {:>4}  {:<24} {:<16} {:>10}  {:>14} {}  [{}]",
            record.row_number,
            truncate(&record.payee_name, 24),
            truncate(&record.invoice_number, 16),
            record.transaction.date,
            format_amount(record.transaction.amount),
            record.transaction.currency.code(),
            record.category.as_str()
        );
    }

    if !result.rejections.is_empty() {
        println!("\n❌ {}: {}", config.label("rejections"), result.rejections.len());
        for rejection in &result.rejections {
            println!("  {:>4}  {}", rejection.row_number, rejection.message);
        }
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}: {}", config.label("amount"), result.total_display());
    println!("{}", result.summary_line());
    if result.summary.zero_amounts > 0 || result.summary.unknown_dates > 0 {
        println!(
            "⚠️  {} zero amounts, {} unknown dates (run with --diagnose)",
            result.summary.zero_amounts, result.summary.unknown_dates
        );
    }
}

fn print_diagnostics(result: &BatchResult) {
    let engine = QualityEngine::new();
    let reports = engine.inspect_batch(result);

    println!("\n🔍 Diagnostics");
    for report in reports.iter().filter(|r| !r.is_clean()) {
        println!("  {}", report.summary());
        for issue in &report.issues {
            println!("    {:?} {}: {}", issue.severity, issue.field, issue.issue);
        }
    }

    println!("\n{}", engine.batch_summary(&reports).summary());
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

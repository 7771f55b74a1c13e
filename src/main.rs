use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, warn};

use holdings_extractor::logging;
use holdings_extractor::observability::metrics;
use holdings_extractor::pipeline::processing::numeric::{format_grouped, parse_literal, NumberStyle};
use holdings_extractor::{EngineConfig, ExtractionPipeline, ExtractionReport, RuleSet};

#[derive(Parser)]
#[command(name = "holdings_extractor")]
#[command(about = "Extract security holdings from statement text and reconcile them")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records from a plain-text statement
    Extract {
        /// Text file to read
        file: PathBuf,
        /// Known portfolio total, e.g. 1'250'000 or 1250000.00
        #[arg(long)]
        expected_total: Option<String>,
        /// Engine configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Correction rules (TOML, [[rules]] array)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print Prometheus metrics to stderr after the run
        #[arg(long)]
        metrics: bool,
        /// Also write JSON logs under logs/
        #[arg(long)]
        log_json: bool,
    },
    /// Normalize one numeric literal and show it in every grouping style
    Normalize {
        literal: String,
    },
    /// Load a correction rule file and list its rules
    CheckRules {
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            file,
            expected_total,
            config,
            rules,
            output,
            metrics: with_metrics,
            log_json,
        } => {
            let _guard = logging::init_logging(log_json);
            let handle = if with_metrics {
                Some(metrics::init().map_err(|e| anyhow!("{}", e))?)
            } else {
                None
            };

            let config = match config {
                Some(path) => EngineConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => EngineConfig::default(),
            };
            let rules = match rules {
                Some(path) => RuleSet::load(&path).with_context(|| format!("loading rules {}", path.display()))?,
                None => RuleSet::empty(),
            };
            let expected_total = expected_total
                .map(|raw| parse_total(&raw))
                .transpose()?;

            let bytes = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let pipeline = ExtractionPipeline::new(config, rules)?;
            info!("Loaded {} correction rules", pipeline.rules().len());
            let report = pipeline.extract_bytes(&bytes, expected_total)?;

            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(path) => {
                    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
                    println!("📄 Report written to {}", path.display());
                }
                None => println!("{}", json),
            }
            print_summary(&report);

            if let Some(handle) = handle {
                eprintln!("{}", handle.render());
            }
        }
        Commands::Normalize { literal } => match parse_literal(&literal) {
            Some(parsed) => {
                println!("✅ {}", parsed.value);
                if parsed.percent {
                    println!("   (percentage)");
                }
                for style in NumberStyle::ALL {
                    println!("   {:?}: {}", style, format_grouped(parsed.value, style));
                }
            }
            None => {
                println!("❌ Malformed numeric literal: {:?}", literal);
                std::process::exit(1);
            }
        },
        Commands::CheckRules { path } => {
            let rules = RuleSet::load(&path).with_context(|| format!("loading rules {}", path.display()))?;
            println!("✅ {} rules loaded from {}", rules.len(), path.display());
            for (index, rule) in rules.rules().iter().enumerate() {
                let target = match (&rule.identifier, &rule.name_contains) {
                    (Some(id), _) => format!("identifier {}", id),
                    (None, Some(fragment)) => format!("name contains {:?}", fragment),
                    (None, None) => "no target".to_string(),
                };
                println!("   #{} {} -> {:?} ({})", index, target, rule.action, rule.reason);
            }
        }
    }

    Ok(())
}

fn parse_total(raw: &str) -> anyhow::Result<Decimal> {
    parse_literal(raw)
        .filter(|parsed| !parsed.percent)
        .map(|parsed| parsed.value)
        .ok_or_else(|| anyhow!("expected total {:?} is not a number", raw))
}

fn print_summary(report: &ExtractionReport) {
    let r = &report.reconciliation;
    eprintln!("\n📊 Extraction summary:");
    eprintln!("   Records: {} of {} identifiers", r.valid_record_count, r.total_record_count);
    eprintln!("   Extracted total: {}", format_grouped(r.extracted_total, NumberStyle::Apostrophe));
    if let Some(expected) = r.expected_total {
        eprintln!("   Expected total: {}", format_grouped(expected, NumberStyle::Apostrophe));
    }
    if let Some(accuracy) = r.accuracy {
        eprintln!("   Accuracy: {:.2}%", accuracy * 100.0);
    }
    eprintln!("   Grade: {:?}", r.grade);
    if r.mismatch {
        warn!("Extracted total does not reconcile with the expected total");
        eprintln!("\n⚠️  Totals do not reconcile");
    }
    if r.conflict_count > 0 {
        eprintln!("⚠️  {} conflicting duplicates flagged", r.conflict_count);
    }
}

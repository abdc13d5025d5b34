//! MacLab CLI — validate models, score dates, run backtests, generate demo data.
//!
//! Commands:
//! - `validate` — check a model TOML file and print its fingerprint
//! - `score` — evaluate the MAC index at one date
//! - `backtest` — run a full backtest and save report artifacts
//! - `synth` — write a synthetic model, observation set, and episode list

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use maclab_core::{CompositeSnapshot, Pillar};
use maclab_runner::data_loader::{episodes_to_toml, write_observations_csv};
use maclab_runner::synthetic::{generate, SyntheticSpec};
use maclab_runner::{
    load_config, load_inputs, load_observations_csv, save_artifacts, BacktestEngine,
    BacktestProgress, BacktestReport,
};

#[derive(Parser)]
#[command(
    name = "maclab",
    about = "MacLab CLI — Market Absorption Capacity index engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a model configuration file.
    Validate {
        /// Path to the model TOML file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Score the MAC index at a single date.
    Score {
        /// Path to the model TOML file.
        #[arg(long)]
        config: PathBuf,

        /// Observation CSV (indicator,date,value).
        #[arg(long)]
        observations: PathBuf,

        /// Evaluation date (YYYY-MM-DD). Defaults to the last observation date.
        #[arg(long)]
        date: Option<String>,

        /// Print the snapshot as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run a backtest and save report artifacts.
    Backtest {
        /// Path to the model TOML file (may include a [backtest] table).
        #[arg(long)]
        config: PathBuf,

        /// Observation CSV (indicator,date,value).
        #[arg(long)]
        observations: PathBuf,

        /// Crisis episodes (.csv or .toml).
        #[arg(long)]
        episodes: Option<PathBuf>,

        /// Score pillars on the rayon thread pool.
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Output directory for report artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Generate a synthetic dataset (model.toml, observations.csv, episodes.toml).
    Synth {
        /// Output directory.
        #[arg(long, default_value = "synthetic")]
        out_dir: PathBuf,

        /// Calendar days to cover.
        #[arg(long, default_value_t = 3 * 365)]
        days: i64,

        /// Number of planted crisis episodes.
        #[arg(long, default_value_t = 3)]
        episodes: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => run_validate(&config),
        Commands::Score {
            config,
            observations,
            date,
            json,
        } => run_score(&config, &observations, date.as_deref(), json),
        Commands::Backtest {
            config,
            observations,
            episodes,
            parallel,
            output_dir,
        } => run_backtest_cmd(&config, &observations, episodes.as_deref(), parallel, &output_dir),
        Commands::Synth {
            out_dir,
            days,
            episodes,
            seed,
            start,
        } => run_synth(&out_dir, days, episodes, seed, start.as_deref()),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn run_validate(path: &Path) -> Result<()> {
    let (config, settings) = load_config(path)?;
    let model = config
        .validate()
        .with_context(|| format!("{} is not a valid model", path.display()))?;

    println!("OK: {}", path.display());
    if let Some(name) = &config.name {
        println!("  name:        {name}");
    }
    println!("  fingerprint: {}", model.fingerprint());
    println!("  indicators:  {}", model.indicators().len());
    for pillar in Pillar::ALL {
        let members: Vec<&str> = model.members(pillar).map(|s| s.id.as_str()).collect();
        let listed = if members.is_empty() {
            "(none)".to_string()
        } else {
            members.join(", ")
        };
        println!("    {:<24} {listed}", pillar.name());
    }
    println!(
        "  backtest:    window {}d, chronology {:?}, missing pillars {:?}",
        settings.warning_window_days, settings.chronology, settings.missing_pillar
    );
    Ok(())
}

fn run_score(config: &Path, observations: &Path, date: Option<&str>, json: bool) -> Result<()> {
    let (config, settings) = load_config(config)?;
    let model = config.validate()?;
    let observations = load_observations_csv(observations)?;
    let engine = BacktestEngine::new(model, observations, settings)?;

    let date = match date {
        Some(d) => parse_date(d)?,
        None => engine
            .store()
            .date_range()
            .map(|r| r.1)
            .context("observation file is empty")?,
    };

    let snapshot = engine
        .evaluate_at(date)
        .with_context(|| format!("cannot score {date}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}

fn print_snapshot(s: &CompositeSnapshot) {
    println!("=== MAC {} ===", s.date);
    println!(
        "Composite: {:.1} / 100  ({})",
        s.composite_percent(),
        s.regime
    );
    println!("  {}", s.regime.description());
    println!();
    for r in &s.pillars {
        match r.score {
            Some(score) => println!(
                "  {:<24} {:>6.1}  weight {:.2}",
                r.pillar.name(),
                score * 100.0,
                r.effective_weight
            ),
            None => println!("  {:<24} {:>6}", r.pillar.name(), "n/a"),
        }
    }
    if !s.exclusions.indicators.is_empty() {
        println!();
        println!("Excluded indicators:");
        for e in &s.exclusions.indicators {
            println!("  {} ({}): {:?}", e.indicator, e.pillar, e.reason);
        }
    }
}

fn run_backtest_cmd(
    config: &Path,
    observations: &Path,
    episodes: Option<&Path>,
    parallel: bool,
    output_dir: &Path,
) -> Result<()> {
    let inputs = load_inputs(config, observations, episodes)?;
    let model = inputs.config.validate()?;
    let mut settings = inputs.settings;
    settings.parallel_pillars |= parallel;

    let engine = BacktestEngine::new(model, inputs.observations, settings)?;

    // Ctrl-C stops after the current step; the partial report is still saved.
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl-C, stopping after the current step...");
        flag.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    let progress = |p: &BacktestProgress| {
        let tenth = (p.steps_total / 10).max(1);
        if p.steps_complete % tenth == 0 || p.steps_complete == p.steps_total {
            eprintln!(
                "  [{:>3}%] {} ({} snapshots, {} skipped)",
                p.steps_complete * 100 / p.steps_total.max(1),
                p.date,
                p.snapshots,
                p.skipped
            );
        }
    };
    let report = engine.run(&inputs.episodes, Some(&progress), Some(cancel.as_ref()))?;

    print_summary(&report);

    let run_dir = save_artifacts(&report, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn print_summary(report: &BacktestReport) {
    let ev = &report.evaluation;
    println!("=== Backtest Summary ===");
    if report.cancelled {
        println!(
            "Status:          CANCELLED after {} of {} steps",
            report.steps_completed, report.steps_total
        );
    }
    if let (Some(first), Some(last)) = (report.first_date(), report.last_date()) {
        println!("Period:          {first} to {last}");
    }
    println!(
        "Snapshots:       {} ({} skipped)",
        report.snapshots.len(),
        report.skipped.len()
    );
    println!("Alerts:          {}", ev.alert_count);
    println!(
        "False positives: {} ({:.2}%)",
        ev.false_positive_count,
        ev.false_positive_rate * 100.0
    );
    if let Some(hit) = ev.hit_rate {
        println!("Hit rate:        {:.1}%", hit * 100.0);
    }
    if let Some(mean) = ev.mean_lead_days {
        println!("Mean lead:       {mean:.1} days");
    }
    for o in &ev.episodes {
        match o.lead_days {
            Some(d) => println!("  {:<24} lead {d:>4} days", o.episode.name),
            None => println!("  {:<24} no warning", o.episode.name),
        }
    }
    for q in &report.quarantined {
        println!("Quarantined:     {} ({} after {})", q.indicator, q.offending, q.previous);
    }
}

fn run_synth(out_dir: &Path, days: i64, episodes: usize, seed: u64, start: Option<&str>) -> Result<()> {
    let mut spec = SyntheticSpec {
        days,
        episodes,
        seed,
        ..SyntheticSpec::default()
    };
    if let Some(s) = start {
        spec.start = parse_date(s)?;
    }
    let data = generate(&spec);

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let model_toml = format!(
        "{}\n{}",
        data.config.to_toml()?,
        maclab_runner::BacktestSettings::default().to_toml()?
    );
    std::fs::write(out_dir.join("model.toml"), model_toml)?;
    std::fs::write(
        out_dir.join("observations.csv"),
        write_observations_csv(&data.observations)?,
    )?;
    std::fs::write(out_dir.join("episodes.toml"), episodes_to_toml(&data.episodes)?)?;

    println!(
        "Wrote {} observations and {} episodes to {}",
        data.observations.len(),
        data.episodes.len(),
        out_dir.display()
    );
    Ok(())
}

//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest reports:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: snapshot series and per-episode lead-time table
//! - **Markdown**: human-readable single-run report
//!
//! All persisted artifacts include a `schema_version` field. Newer versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use maclab_core::{CompositeSnapshot, Pillar};

use crate::backtest::{BacktestReport, SCHEMA_VERSION};
use crate::evaluation::EvaluationSummary;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestReport` to pretty JSON.
pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport` from JSON, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn join_pillars(pillars: &[Pillar]) -> String {
    pillars
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(";")
}

/// Export the snapshot series as CSV, one row per date.
///
/// Columns: date, composite, regime, one score column per pillar (empty when
/// undefined), excluded_pillars, carried_forward, excluded_indicators
pub fn export_snapshots_csv(snapshots: &[CompositeSnapshot]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["date", "composite", "regime"];
    header.extend(Pillar::ALL.iter().map(|p| p.name()));
    header.extend(["excluded_pillars", "carried_forward", "excluded_indicators"]);
    wtr.write_record(&header)?;

    for s in snapshots {
        let mut row = vec![
            s.date.to_string(),
            format!("{:.6}", s.composite),
            s.regime.to_string(),
        ];
        row.extend(
            Pillar::ALL
                .iter()
                .map(|&p| opt(s.pillar_score(p).map(|v| format!("{v:.6}")))),
        );
        row.push(join_pillars(&s.exclusions.pillars));
        row.push(join_pillars(&s.exclusions.carried_forward));
        row.push(
            s.exclusions
                .indicators
                .iter()
                .map(|e| e.indicator.as_str())
                .collect::<Vec<_>>()
                .join(";"),
        );
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the per-episode lead-time table as CSV.
pub fn export_lead_times_csv(evaluation: &EvaluationSummary) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "episode",
        "start",
        "end",
        "first_warning",
        "lead_days",
        "lead_steps",
        "warned_in_advance",
        "peak_regime",
    ])?;
    for o in &evaluation.episodes {
        wtr.write_record([
            o.episode.name.clone(),
            o.episode.start.to_string(),
            o.episode.end.to_string(),
            opt(o.first_warning),
            opt(o.lead_days),
            opt(o.lead_steps),
            o.warned_in_advance().to_string(),
            opt(o.peak_regime),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest.
///
/// Creates a directory named `mac_{fingerprint}_{timestamp}/` under
/// `output_dir` containing:
/// - `report.json` — the full `BacktestReport`
/// - `snapshots.csv` — composite series with pillar scores
/// - `lead_times.csv` — per-episode early-warning table
/// - `report.md` — Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "mac_{}_{}",
        report.config_fingerprint.short(),
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(
        run_dir.join("snapshots.csv"),
        export_snapshots_csv(&report.snapshots)?,
    )?;
    std::fs::write(
        run_dir.join("lead_times.csv"),
        export_lead_times_csv(&report.evaluation)?,
    )?;
    std::fs::write(run_dir.join("report.md"), generate_report(report))?;

    Ok(run_dir)
}

/// Load a `BacktestReport` from an artifact directory's report.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

fn fmt_opt_f64(v: Option<f64>, suffix: &str) -> String {
    match v {
        Some(x) => format!("{x:.1}{suffix}"),
        None => "n/a".into(),
    }
}

/// Generate a Markdown report for a single backtest.
pub fn generate_report(report: &BacktestReport) -> String {
    let mut md = String::with_capacity(2048);
    let ev = &report.evaluation;

    md.push_str("# MAC Backtest Report\n\n");

    // Metadata
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Config Fingerprint | {} |\n",
        report.config_fingerprint.short()
    ));
    md.push_str(&format!("| Dataset Hash | {} |\n", report.dataset_hash));
    if let (Some(first), Some(last)) = (report.first_date(), report.last_date()) {
        md.push_str(&format!("| Period | {first} to {last} |\n"));
    }
    md.push_str(&format!(
        "| Steps | {} of {} ({} skipped) |\n",
        report.steps_completed,
        report.steps_total,
        report.skipped.len()
    ));
    md.push_str(&format!(
        "| Warning Window | {} days |\n",
        ev.warning_window_days
    ));
    if report.cancelled {
        md.push_str("| Status | **CANCELLED** |\n");
    }
    md.push('\n');

    // Early-warning summary
    md.push_str("## Early-Warning Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Episodes | {} |\n", ev.episodes.len()));
    md.push_str(&format!(
        "| Hit Rate | {} |\n",
        fmt_opt_f64(ev.hit_rate.map(|h| h * 100.0), "%")
    ));
    md.push_str(&format!(
        "| Mean Lead | {} |\n",
        fmt_opt_f64(ev.mean_lead_days, " days")
    ));
    md.push_str(&format!(
        "| Median Lead | {} |\n",
        fmt_opt_f64(ev.median_lead_days, " days")
    ));
    md.push_str(&format!("| Alerts | {} |\n", ev.alert_count));
    md.push_str(&format!(
        "| False Positives | {} ({:.2}%) |\n",
        ev.false_positive_count,
        ev.false_positive_rate * 100.0
    ));
    md.push('\n');

    // Episodes
    if !ev.episodes.is_empty() {
        md.push_str("## Episodes\n\n");
        md.push_str("| Episode | Start | First Warning | Lead (days) | Lead (steps) | Peak |\n");
        md.push_str("| --- | --- | --- | ---: | ---: | --- |\n");
        for o in &ev.episodes {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                o.episode.name,
                o.episode.start,
                o.first_warning
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "none".into()),
                opt(o.lead_days),
                opt(o.lead_steps),
                opt(o.peak_regime),
            ));
        }
        md.push('\n');
    }

    // Regimes
    md.push_str("## Regime Distribution\n\n");
    md.push_str("| Regime | Steps | Share | Mean Composite |\n");
    md.push_str("| --- | ---: | ---: | ---: |\n");
    for r in &ev.regimes {
        md.push_str(&format!(
            "| {} | {} | {:.1}% | {} |\n",
            r.regime,
            r.steps,
            r.time_share * 100.0,
            r.mean_composite
                .map(|m| format!("{:.1}", m * 100.0))
                .unwrap_or_else(|| "n/a".into()),
        ));
    }
    md.push('\n');

    // Data quality
    if !report.quarantined.is_empty() {
        md.push_str("## Data Quality\n\n");
        for q in &report.quarantined {
            md.push_str(&format!(
                "- {} quarantined: {} followed {}\n",
                q.indicator, q.offending, q.previous
            ));
        }
        md.push('\n');
    }

    md
}

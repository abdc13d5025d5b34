//! Input loading for the runner.
//!
//! Three inputs, all local files:
//! 1. Model configuration — TOML (`MacConfig`, optional `[backtest]` table)
//! 2. Observations — long-format CSV with `indicator,date,value` columns
//! 3. Crisis episodes — CSV with `name,start,end` columns, or TOML with an
//!    `[[episodes]]` array
//!
//! An empty `value` cell is a missing observation and is skipped. Rows are
//! kept in file order; chronology is checked later by the observation store.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use maclab_core::{CrisisEpisode, MacConfig, MacError, Observation};

use crate::backtest::BacktestSettings;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {reason}")]
    Row { row: usize, reason: String },

    #[error("toml error in {path}: {reason}")]
    Toml { path: PathBuf, reason: String },

    #[error("unsupported episode file '{0}' (expected .csv or .toml)")]
    UnsupportedFormat(PathBuf),

    #[error(transparent)]
    Mac(#[from] MacError),
}

/// Everything the backtest needs from disk.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub config: MacConfig,
    pub settings: BacktestSettings,
    pub observations: Vec<Observation>,
    pub episodes: Vec<CrisisEpisode>,
}

#[derive(Debug, Deserialize)]
struct ObservationRow {
    indicator: String,
    date: NaiveDate,
    value: Option<f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EpisodeFile {
    #[serde(default)]
    episodes: Vec<CrisisEpisode>,
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ─── Configuration ───────────────────────────────────────────────────

/// Load a model configuration and its `[backtest]` settings from one file.
pub fn load_config(path: &Path) -> Result<(MacConfig, BacktestSettings), LoadError> {
    let content = read_file(path)?;
    let config = MacConfig::from_toml(&content)?;
    let settings = BacktestSettings::from_toml(&content).map_err(|e| LoadError::Toml {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), indicators = config.indicators.len(), "loaded config");
    Ok((config, settings))
}

// ─── Observations ────────────────────────────────────────────────────

/// Parse long-format observation CSV from any reader.
pub fn parse_observations_csv<R: Read>(reader: R) -> Result<Vec<Observation>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();
    let mut missing = 0usize;

    for (i, row) in rdr.deserialize::<ObservationRow>().enumerate() {
        let row = row?;
        if row.indicator.is_empty() {
            return Err(LoadError::Row {
                row: i + 2,
                reason: "empty indicator id".into(),
            });
        }
        match row.value {
            Some(value) => out.push(Observation::new(row.indicator, row.date, value)),
            None => missing += 1,
        }
    }

    if missing > 0 {
        debug!(missing, "skipped empty observation cells");
    }
    Ok(out)
}

pub fn load_observations_csv(path: &Path) -> Result<Vec<Observation>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let observations = parse_observations_csv(file)?;
    info!(path = %path.display(), count = observations.len(), "loaded observations");
    Ok(observations)
}

/// Write observations in the same long format `parse_observations_csv` reads.
pub fn write_observations_csv(observations: &[Observation]) -> Result<String, LoadError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["indicator", "date", "value"])?;
    for obs in observations {
        wtr.write_record([
            obs.indicator.as_str(),
            &obs.date.to_string(),
            &format!("{:.6}", obs.value),
        ])?;
    }
    let data = wtr.into_inner().map_err(|e| LoadError::Row {
        row: 0,
        reason: e.to_string(),
    })?;
    String::from_utf8(data).map_err(|e| LoadError::Row {
        row: 0,
        reason: e.to_string(),
    })
}

// ─── Episodes ────────────────────────────────────────────────────────

/// Parse episode CSV (`name,start,end`) from any reader.
pub fn parse_episodes_csv<R: Read>(reader: R) -> Result<Vec<CrisisEpisode>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut episodes = Vec::new();
    for (i, ep) in rdr.deserialize::<CrisisEpisode>().enumerate() {
        let ep = ep?;
        check_episode(&ep, i + 2)?;
        episodes.push(ep);
    }
    Ok(episodes)
}

/// Parse an `[[episodes]]` TOML document.
pub fn parse_episodes_toml(content: &str) -> Result<Vec<CrisisEpisode>, LoadError> {
    let file: EpisodeFile = toml::from_str(content).map_err(|e| LoadError::Toml {
        path: PathBuf::new(),
        reason: e.to_string(),
    })?;
    for (i, ep) in file.episodes.iter().enumerate() {
        check_episode(ep, i + 1)?;
    }
    Ok(file.episodes)
}

/// Render episodes as an `[[episodes]]` TOML document.
pub fn episodes_to_toml(episodes: &[CrisisEpisode]) -> Result<String, LoadError> {
    let file = EpisodeFile {
        episodes: episodes.to_vec(),
    };
    toml::to_string_pretty(&file).map_err(|e| LoadError::Toml {
        path: PathBuf::new(),
        reason: e.to_string(),
    })
}

/// Load episodes, choosing the format from the file extension.
pub fn load_episodes(path: &Path) -> Result<Vec<CrisisEpisode>, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let episodes = match ext.as_deref() {
        Some("csv") => {
            let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parse_episodes_csv(file)?
        }
        Some("toml") => parse_episodes_toml(&read_file(path)?).map_err(|e| match e {
            LoadError::Toml { reason, .. } => LoadError::Toml {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?,
        _ => return Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    };
    info!(path = %path.display(), count = episodes.len(), "loaded episodes");
    Ok(episodes)
}

fn check_episode(ep: &CrisisEpisode, row: usize) -> Result<(), LoadError> {
    if ep.end < ep.start {
        return Err(LoadError::Row {
            row,
            reason: format!("episode '{}' ends ({}) before it starts ({})", ep.name, ep.end, ep.start),
        });
    }
    Ok(())
}

// ─── Bundle ──────────────────────────────────────────────────────────

/// Load config, observations, and (optionally) episodes.
pub fn load_inputs(
    config_path: &Path,
    observations_path: &Path,
    episodes_path: Option<&Path>,
) -> Result<LoadedInputs, LoadError> {
    let (config, settings) = load_config(config_path)?;
    let observations = load_observations_csv(observations_path)?;
    let episodes = match episodes_path {
        Some(p) => load_episodes(p)?,
        None => Vec::new(),
    };
    Ok(LoadedInputs {
        config,
        settings,
        observations,
        episodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_format_with_gaps() {
        let csv = "indicator,date,value\n\
                   vix,2020-01-02,13.8\n\
                   ted,2020-01-02,\n\
                   vix,2020-01-03, 14.1 \n\
                   vix,2020-01-06,NaN\n";
        let obs = parse_observations_csv(csv.as_bytes()).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].indicator.as_str(), "vix");
        assert_eq!(obs[1].value, 14.1);
        assert!(obs[2].value.is_nan());
    }

    #[test]
    fn bad_date_is_an_error() {
        let csv = "indicator,date,value\nvix,02/01/2020,13.8\n";
        assert!(matches!(
            parse_observations_csv(csv.as_bytes()),
            Err(LoadError::Csv(_))
        ));
    }

    #[test]
    fn empty_indicator_reports_row() {
        let csv = "indicator,date,value\nvix,2020-01-02,1\n,2020-01-03,2\n";
        match parse_observations_csv(csv.as_bytes()) {
            Err(LoadError::Row { row, .. }) => assert_eq!(row, 3),
            other => panic!("expected row error, got {other:?}"),
        }
    }

    #[test]
    fn observations_csv_roundtrip() {
        let d = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let obs = vec![
            Observation::new("vix", d, 17.25),
            Observation::new("hy_oas", d, 350.5),
        ];
        let text = write_observations_csv(&obs).unwrap();
        assert_eq!(parse_observations_csv(text.as_bytes()).unwrap(), obs);
    }

    #[test]
    fn episodes_from_csv_and_toml_agree() {
        let csv = "name,start,end\nGFC,2008-09-15,2009-03-09\n";
        let toml = r#"
[[episodes]]
name = "GFC"
start = "2008-09-15"
end = "2009-03-09"
"#;
        let a = parse_episodes_csv(csv.as_bytes()).unwrap();
        let b = parse_episodes_toml(toml).unwrap();
        assert_eq!(a, b);
        assert_eq!(parse_episodes_toml(&episodes_to_toml(&a).unwrap()).unwrap(), a);
    }

    #[test]
    fn inverted_episode_rejected() {
        let csv = "name,start,end\nbad,2010-05-10,2010-05-01\n";
        assert!(matches!(
            parse_episodes_csv(csv.as_bytes()),
            Err(LoadError::Row { row: 2, .. })
        ));
    }
}

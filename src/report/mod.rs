//! Reports over the mirrored time-series and population objects
//!
//! Reads two objects from the store and derives:
//! 1. mean / sample standard deviation of population over 2013–2018
//! 2. the best year of every series by summed quarterly value, top 10
//! 3. one series/period joined with population by year (preview)

mod population;
mod timeseries;

pub use population::{parse_population, population_rows, PopulationPayload, PopulationRow};
pub use timeseries::{is_quarter, parse_timeseries, SeriesRow};

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::ReportConfig;
use crate::error::Result;
use crate::store::ObjectStore;

pub const SUMMARY_FIRST_YEAR: i32 = 2013;
pub const SUMMARY_LAST_YEAR: i32 = 2018;
pub const TOP_SERIES_LIMIT: usize = 10;
pub const PREVIEW_LIMIT: usize = 10;

/// Report 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSummary {
    pub mean_population_2013_2018: Option<f64>,
    pub std_population_2013_2018: Option<f64>,
}

/// Report 2 entry: a series and its best year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesBestYear {
    pub series_id: String,
    pub year: i32,
    pub value: f64,
}

/// Report 3 entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedRow {
    pub series_id: String,
    pub year: i32,
    pub period: String,
    pub value: f64,
    pub population: Option<f64>,
}

/// All three reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reports {
    pub report1: PopulationSummary,
    pub report2_top10_series: Vec<SeriesBestYear>,
    pub report3_preview: Vec<JoinedRow>,
}

/// Mean and sample standard deviation of population within `[first, last]`
pub fn population_summary(rows: &[PopulationRow], first: i32, last: i32) -> PopulationSummary {
    let values: Vec<f64> = rows
        .iter()
        .filter(|r| (first..=last).contains(&r.year))
        .map(|r| r.population)
        .collect();

    if values.is_empty() {
        return PopulationSummary {
            mean_population_2013_2018: None,
            std_population_2013_2018: None,
        };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() > 1 {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(variance.sqrt())
    } else {
        None
    };

    PopulationSummary {
        mean_population_2013_2018: Some(mean),
        std_population_2013_2018: std,
    }
}

/// Best (series, year) by summed value, one entry per series
///
/// Ordered by sum descending; equal sums prefer the more recent year, then
/// the lower series id.
pub fn top_series_by_annual_sum(rows: &[SeriesRow], limit: usize) -> Vec<SeriesBestYear> {
    let mut sums: BTreeMap<(&str, i32), f64> = BTreeMap::new();
    for row in rows {
        *sums.entry((row.series_id.as_str(), row.year)).or_insert(0.0) += row.value;
    }

    let mut ranked: Vec<SeriesBestYear> = sums
        .into_iter()
        .map(|((series_id, year), value)| SeriesBestYear {
            series_id: series_id.to_string(),
            year,
            value,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| b.year.cmp(&a.year))
            .then_with(|| a.series_id.cmp(&b.series_id))
    });

    let mut seen = HashSet::new();
    ranked
        .into_iter()
        .filter(|entry| seen.insert(entry.series_id.clone()))
        .take(limit)
        .collect()
}

/// Left join of one series/period with population by year, first `limit` rows
pub fn join_series_population(
    rows: &[SeriesRow],
    population: &[PopulationRow],
    series_id: &str,
    period: &str,
    limit: usize,
) -> Vec<JoinedRow> {
    let mut by_year: HashMap<i32, Vec<f64>> = HashMap::new();
    for row in population {
        by_year.entry(row.year).or_default().push(row.population);
    }

    let joined = |row: &SeriesRow, population: Option<f64>| JoinedRow {
        series_id: row.series_id.clone(),
        year: row.year,
        period: row.period.clone(),
        value: row.value,
        population,
    };

    rows.iter()
        .filter(|row| row.series_id == series_id && row.period == period)
        .flat_map(|row| match by_year.get(&row.year) {
            Some(matches) => matches.iter().map(|p| joined(row, Some(*p))).collect::<Vec<_>>(),
            None => vec![joined(row, None)],
        })
        .take(limit)
        .collect()
}

/// Build all three reports from parsed inputs
pub fn build_reports(
    series: &[SeriesRow],
    population: &[PopulationRow],
    config: &ReportConfig,
) -> Reports {
    Reports {
        report1: population_summary(population, SUMMARY_FIRST_YEAR, SUMMARY_LAST_YEAR),
        report2_top10_series: top_series_by_annual_sum(series, TOP_SERIES_LIMIT),
        report3_preview: join_series_population(
            series,
            population,
            &config.series_id,
            &config.period,
            PREVIEW_LIMIT,
        ),
    }
}

/// Read both objects from the store and build the reports
pub async fn run_reports(store: &dyn ObjectStore, config: &ReportConfig) -> Result<Reports> {
    let series_bytes = store.get_object(&config.bucket, &config.pr_current_key).await?;
    let series = parse_timeseries(&series_bytes)?;

    let population_bytes = store.get_object(&config.bucket, &config.pop_key).await?;
    let population = parse_population(&population_bytes)?;

    let reports = build_reports(&series, &population, config);

    tracing::info!(
        "REPORT 1: mean={:?} std={:?}",
        reports.report1.mean_population_2013_2018,
        reports.report1.std_population_2013_2018
    );
    tracing::info!("REPORT 2: {} series", reports.report2_top10_series.len());
    tracing::info!("REPORT 3: {} rows", reports.report3_preview.len());

    Ok(reports)
}

//! Tab-delimited BLS time-series parsing

use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, Result};

const REQUIRED_COLUMNS: [&str; 4] = ["series_id", "year", "period", "value"];

/// One quarterly observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub series_id: String,
    pub year: i32,
    pub period: String,
    pub value: f64,
}

/// `Q01`..`Q04`; annual (`Q05`) and monthly periods are excluded
pub fn is_quarter(period: &str) -> bool {
    let bytes = period.as_bytes();
    bytes.len() == 3 && bytes[0] == b'Q' && bytes[1] == b'0' && (b'1'..=b'4').contains(&bytes[2])
}

/// Parse a year cell; accepts `2015` and `2015.0`
pub(crate) fn parse_year(cell: &str) -> Option<i32> {
    let cell = cell.trim();
    if let Ok(year) = cell.parse::<i32>() {
        return Some(year);
    }
    let float = cell.parse::<f64>().ok()?;
    if float.is_finite() && float.fract() == 0.0 && float.abs() <= i32::MAX as f64 {
        Some(float as i32)
    } else {
        None
    }
}

pub(crate) fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse the time-series file into quarterly rows
///
/// Header names are trimmed and lowercased, cells are trimmed. Rows whose
/// year or value is not numeric are dropped, as are non-quarterly periods.
pub fn parse_timeseries(data: &[u8]) -> Result<Vec<SeriesRow>> {
    let text = String::from_utf8_lossy(data);
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header: Vec<String> = match lines.next() {
        Some(line) => line.split('\t').map(|c| c.trim().to_lowercase()).collect(),
        None => Vec::new(),
    };

    let position = |name: &str| header.iter().position(|c| c == name);
    let mut missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| position(*name).is_none())
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(MirrorError::Parse(format!(
            "Missing columns in time-series file: {:?}",
            missing
        )));
    }

    let (Some(series_col), Some(year_col), Some(period_col), Some(value_col)) = (
        position("series_id"),
        position("year"),
        position("period"),
        position("value"),
    ) else {
        return Ok(Vec::new());
    };

    let rows = lines
        .filter_map(|line| {
            let cells: Vec<&str> = line.split('\t').map(str::trim).collect();
            let cell = |idx: usize| cells.get(idx).copied();

            let period = cell(period_col)?;
            if !is_quarter(period) {
                return None;
            }

            Some(SeriesRow {
                series_id: cell(series_col)?.to_string(),
                year: parse_year(cell(year_col)?)?,
                period: period.to_string(),
                value: parse_number(cell(value_col)?)?,
            })
        })
        .collect();

    Ok(rows)
}

//! Population payload parsing
//!
//! The population API answers in one of two shapes:
//! - paged: `[ {page metadata}, [rows...] ]` (World Bank style)
//! - wrapped: `{ "data": [rows...] }`
//!
//! Anything else is rejected rather than read as an empty data set.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::timeseries::{parse_number, parse_year};
use crate::error::{MirrorError, Result};

/// One year of population
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationRow {
    pub year: i32,
    pub population: f64,
}

/// Recognized top-level response shapes
#[derive(Debug, Clone, PartialEq)]
pub enum PopulationPayload {
    Paged { rows: Vec<Value> },
    Wrapped { rows: Vec<Value> },
}

impl PopulationPayload {
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(mut items) if items.len() > 1 => match items.swap_remove(1) {
                Value::Array(rows) => Ok(Self::Paged { rows }),
                Value::Null => Ok(Self::Paged { rows: Vec::new() }),
                other => Err(MirrorError::Parse(format!(
                    "population page body must be an array, got {}",
                    type_name(&other)
                ))),
            },
            Value::Object(mut map) => match map.remove("data") {
                Some(Value::Array(rows)) => Ok(Self::Wrapped { rows }),
                None | Some(Value::Null) => Ok(Self::Wrapped { rows: Vec::new() }),
                Some(other) => Err(MirrorError::Parse(format!(
                    "population \"data\" must be an array, got {}",
                    type_name(&other)
                ))),
            },
            other => Err(MirrorError::Parse(format!(
                "unrecognized population payload: {}",
                describe(&other)
            ))),
        }
    }

    pub fn rows(&self) -> &[Value] {
        match self {
            Self::Paged { rows } | Self::Wrapped { rows } => rows,
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Array(items) => format!("array of {} element(s)", items.len()),
        other => type_name(other).to_string(),
    }
}

/// Row keys trimmed and lowercased; non-object rows are skipped
fn normalized_rows(rows: &[Value]) -> Vec<Map<String, Value>> {
    rows.iter()
        .filter_map(Value::as_object)
        .map(|row| {
            row.iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v.clone()))
                .collect()
        })
        .collect()
}

/// Pick the first field name of `candidates` present in any row
fn resolve_field(rows: &[Map<String, Value>], candidates: &[&'static str]) -> Option<&'static str> {
    candidates
        .iter()
        .copied()
        .find(|name| rows.iter().any(|row| row.contains_key(*name)))
}

fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn year_of(value: Option<&Value>) -> Option<i32> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .and_then(|y| i32::try_from(y).ok())
            .or_else(|| n.as_f64().and_then(|f| parse_year(&f.to_string()))),
        Value::String(s) => parse_year(s),
        _ => None,
    }
}

/// Normalize payload rows into `(year, population)` pairs
///
/// Year comes from `year`, else `date`; population from `population`, else
/// `value`. Rows with null or non-numeric cells are dropped.
pub fn population_rows(payload: &PopulationPayload) -> Result<Vec<PopulationRow>> {
    let rows = normalized_rows(payload.rows());
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let year_field = resolve_field(&rows, &["year", "date"]).ok_or_else(|| {
        MirrorError::Parse("Population JSON missing 'year'/'date' field".to_string())
    })?;
    let population_field = resolve_field(&rows, &["population", "value"]).ok_or_else(|| {
        MirrorError::Parse("Population JSON missing 'population'/'value' field".to_string())
    })?;

    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(PopulationRow {
                year: year_of(row.get(year_field))?,
                population: numeric(row.get(population_field))?,
            })
        })
        .collect())
}

/// Parse stored population bytes
pub fn parse_population(data: &[u8]) -> Result<Vec<PopulationRow>> {
    let value: Value = serde_json::from_slice(data)
        .map_err(|e| MirrorError::Parse(format!("population JSON: {}", e)))?;
    population_rows(&PopulationPayload::from_value(value)?)
}

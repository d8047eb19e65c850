//! Sheet schema and ingestion.
//!
//! Raw sheets arrive as a grid of JSON cells with a header row. Ingestion
//! normalizes header names through [`ALIASES`], coerces numeric cells and
//! builds a typed [`Table`].

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::LoadError;
use crate::data::{ColumnSet, Observation, Table};

pub const BATCH: &str = "№ партии";
pub const MACHINE: &str = "№ ПМ";
pub const STRENGTH: &str = "Относительная разрывная нагрузка, сН/текс";
pub const CV: &str = "Коэффициент вариации, %";
pub const DENSITY: &str = "Линейная плотность, текс";
pub const DRAW: &str = "Пласт. вытяжка, %";

/// Columns without which no observation can be built.
pub const REQUIRED: &[&str] = &[BATCH, MACHINE, STRENGTH];

/// Alternate header spellings seen in the source sheet, after trimming.
pub const ALIASES: &[(&str, &str)] = &[("Номер ПМ", MACHINE), ("№ ПМ.", MACHINE)];

/// Fragments identifying the forming-speed column, whose full header varies.
const SPEED_MARKERS: &[&str] = &["Скорость", "формования"];

/// CV and density are stored in the sheet multiplied by ten.
const SCALED_DIVISOR: f64 = 10.0;

/// A sheet as returned by the values API: rows of cells, header first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSheet {
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

/// Map a raw header to its canonical name.
pub fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == trimmed)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// The first header that names the forming speed.
pub fn find_speed_column(headers: &[String]) -> Option<usize> {
    headers
        .iter()
        .position(|h| SPEED_MARKERS.iter().all(|m| h.contains(m)))
}

/// Coerce a cell into a number.
///
/// Accepts JSON numbers and numeric strings, with `,` as an alternative
/// decimal separator. Blank or unparsable cells are missing.
pub fn coerce(cell: Option<&Value>) -> Option<f64> {
    let value = match cell? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.replace(',', ".").parse::<f64>().ok()
            }
        }
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

/// Integer ids may be written as `715` or `715.0`.
fn coerce_id(cell: Option<&Value>) -> Option<i64> {
    let v = coerce(cell)?;
    (v.fract() == 0.0).then_some(v as i64)
}

/// Build a [`Table`] from a raw sheet.
pub fn ingest(raw: RawSheet) -> Result<Table, LoadError> {
    let mut rows = raw.values.into_iter();
    let headers: Vec<String> = match rows.next() {
        Some(header) if !header.is_empty() => header
            .iter()
            .map(|cell| match cell {
                Value::String(s) => normalize_header(s),
                other => normalize_header(&other.to_string()),
            })
            .collect(),
        _ => return Err(LoadError::Empty),
    };

    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .rev()
        .map(|(i, h)| (h.as_str(), i))
        .collect();

    let missing: Vec<String> = REQUIRED
        .iter()
        .filter(|c| !index.contains_key(*c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            missing,
            available: headers.clone(),
        });
    }

    let batch = index[BATCH];
    let machine = index[MACHINE];
    let strength = index[STRENGTH];
    let cv = index.get(CV).copied();
    let density = index.get(DENSITY).copied();
    let draw = index.get(DRAW).copied();
    let speed = find_speed_column(&headers);

    let columns = ColumnSet {
        coefficient_of_variation: cv.is_some(),
        linear_density: density.is_some(),
        plastification_draw: draw.is_some(),
        forming_speed: speed.is_some(),
    };

    let mut dropped = 0usize;
    let mut observations = Vec::new();
    for row in rows {
        let cell = |col: Option<usize>| col.and_then(|i| coerce(row.get(i)));

        let (Some(batch_id), Some(machine_id), Some(breaking_strength)) = (
            coerce_id(row.get(batch)),
            coerce_id(row.get(machine)),
            coerce(row.get(strength)),
        ) else {
            dropped += 1;
            continue;
        };

        observations.push(Observation {
            batch_id,
            machine_id,
            breaking_strength,
            coefficient_of_variation: cell(cv).map(|v| v / SCALED_DIVISOR),
            linear_density: cell(density).map(|v| v / SCALED_DIVISOR),
            plastification_draw: cell(draw),
            forming_speed: cell(speed),
        });
    }

    if dropped > 0 {
        debug!(dropped, "Dropped rows missing batch, machine or strength");
    }
    if observations.is_empty() {
        return Err(LoadError::Empty);
    }

    let table = Table::new(observations, columns);
    let duplicates = table.duplicate_keys();
    if !duplicates.is_empty() {
        warn!(
            count = duplicates.len(),
            first = ?duplicates.first(),
            "Duplicate (batch, machine) pairs in source data"
        );
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sheet(values: Value) -> RawSheet {
        serde_json::from_value(json!({ "values": values })).unwrap()
    }

    #[test]
    fn test_aliases_and_trimming() {
        assert_eq!(normalize_header("Номер ПМ"), MACHINE);
        assert_eq!(normalize_header("№ ПМ "), MACHINE);
        assert_eq!(normalize_header("Линейная плотность, текс "), DENSITY);
        assert_eq!(normalize_header("  № партии"), BATCH);
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(Some(&json!(12.5))), Some(12.5));
        assert_eq!(coerce(Some(&json!("12,5"))), Some(12.5));
        assert_eq!(coerce(Some(&json!(" 7 "))), Some(7.0));
        assert_eq!(coerce(Some(&json!(""))), None);
        assert_eq!(coerce(Some(&json!("n/a"))), None);
        assert_eq!(coerce(Some(&json!(null))), None);
        assert_eq!(coerce(None), None);
    }

    #[test]
    fn test_ingest_scales_and_drops() {
        let raw = sheet(json!([
            ["№ партии", "Номер ПМ", STRENGTH, CV, "Линейная плотность, текс ", DRAW, "Скорость формования, м/мин"],
            [715, 1, 280, 75, 289, 60, 16.4],
            ["715", "2", "265,5", "", "290", "65", "18.8"],
            [715, "", 270, 80, 290, 60, 16.4],
            [716, 3]
        ]));

        let table = ingest(raw).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns, ColumnSet::all());

        let first = &table.rows[0];
        assert_eq!(first.batch_id, 715);
        assert_eq!(first.coefficient_of_variation, Some(7.5));
        assert_eq!(first.linear_density, Some(28.9));
        assert_eq!(first.plastification_draw, Some(60.0));
        assert_eq!(first.forming_speed, Some(16.4));

        let second = &table.rows[1];
        assert_eq!(second.machine_id, 2);
        assert_eq!(second.breaking_strength, 265.5);
        assert_eq!(second.coefficient_of_variation, None);
    }

    #[test]
    fn test_optional_columns_absent() {
        let raw = sheet(json!([[BATCH, MACHINE, STRENGTH], [715, 1, 280]]));
        let table = ingest(raw).unwrap();
        assert_eq!(table.columns, ColumnSet::default());
        assert_eq!(table.rows[0].linear_density, None);
    }

    #[test]
    fn test_missing_required_columns() {
        let raw = sheet(json!([[BATCH, "Прочее"], [715, 1]]));
        match ingest(raw) {
            Err(LoadError::MissingColumns { missing, available }) => {
                assert_eq!(missing, vec![MACHINE.to_string(), STRENGTH.to_string()]);
                assert_eq!(available, vec![BATCH.to_string(), "Прочее".to_string()]);
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_sheet() {
        assert!(matches!(ingest(RawSheet::default()), Err(LoadError::Empty)));
        assert!(matches!(ingest(sheet(json!([[]]))), Err(LoadError::Empty)));
    }

    #[test]
    fn test_no_usable_rows_is_empty() {
        let header_only = sheet(json!([[BATCH, MACHINE, STRENGTH]]));
        assert!(matches!(ingest(header_only), Err(LoadError::Empty)));

        let all_dropped = sheet(json!([
            [BATCH, MACHINE, STRENGTH, DRAW],
            [715, 1, ""],
            ["", 2, 280]
        ]));
        assert!(matches!(ingest(all_dropped), Err(LoadError::Empty)));
    }

    #[test]
    fn test_speed_column_detection() {
        let headers = vec![
            "Скорость намотки".to_string(),
            "Скорость формования нити".to_string(),
        ];
        assert_eq!(find_speed_column(&headers), Some(1));
        assert_eq!(find_speed_column(&headers[..1]), None);
    }
}

//! Result records and the append-only results file.
//!
//! A record is a flat JSON object. The results file is a sequence of
//! independent pretty-printed records, each followed by a newline; it is not
//! a single JSON document.
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::EvaluationError;
use crate::evaluation::Regime;

pub type Record = Map<String, Value>;

/// Merge records left to right; later keys overwrite earlier ones.
pub fn concatenate_dicts(records: &[&Record]) -> Record {
    let mut merged = Record::new();
    for record in records {
        for (key, value) in record.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Canonical `key_value` rendering of a parameter set, keys sorted.
///
/// `{"b": 1, "a": 2}` becomes `a_2_b_1`.
pub fn params_to_str(params: &Record) -> String {
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();
    keys.iter()
        .map(|key| {
            let value = match &params[key.as_str()] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{key}_{value}")
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// Flatten a serializable struct into a record.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, EvaluationError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(EvaluationError::Json(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        )))),
    }
}

/// Merge the parts of one regime run and tag it with its `type`.
pub fn build_record(regime: Regime, parts: &[&Record]) -> Record {
    let mut record = concatenate_dicts(parts);
    record.insert("type".to_string(), Value::from(regime.as_str()));
    record
}

/// Append `record` to `path`, creating the file if needed.
pub fn export_json<P: AsRef<Path>>(record: &Record, path: P) -> Result<(), EvaluationError> {
    export_records(std::slice::from_ref(record), path)
}

/// Append every record of `records` to `path` with a single write.
pub fn export_records<P: AsRef<Path>>(
    records: &[Record],
    path: P,
) -> Result<(), EvaluationError> {
    let path = path.as_ref();
    let mut buffer = Vec::new();
    for record in records {
        serde_json::to_writer_pretty(&mut buffer, record)?;
        buffer.push(b'\n');
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| EvaluationError::io(path, e))?;
    file.write_all(&buffer)
        .and_then(|_| file.flush())
        .map_err(|e| EvaluationError::io(path, e))?;
    log::debug!("Appended {} record(s) to {}", records.len(), path.display());
    Ok(())
}

/// Every record appended to `path` so far, oldest first.
pub fn read_results<P: AsRef<Path>>(path: P) -> Result<Vec<Record>, EvaluationError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| EvaluationError::io(path, e))?;
    serde_json::Deserializer::from_reader(BufReader::new(file))
        .into_iter::<Record>()
        .map(|record| record.map_err(EvaluationError::from))
        .collect()
}

//! Loading of the student-grades sample dataset.
//!
//! The input file is a JSON array of grade records whose date fields are
//! wrapped as `{"$date": "<timestamp>"}`. Records are converted to BSON
//! documents with native datetime fields before the bulk insert. The target
//! collection is dropped first, so reloading the same file always yields
//! the same document count.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use mongodb::Collection;
use mongodb::bson::{Bson, DateTime as BsonDateTime, Document, to_bson};
use serde_json::Value;

use crate::error::ColdlineError;

/// Read and convert the dataset file into insertable documents.
pub fn load_grades(path: &Path) -> Result<Vec<Document>, ColdlineError> {
    let contents = std::fs::read_to_string(path)?;
    parse_grades(&contents)
}

/// Parse a JSON array of grade records into BSON documents.
pub fn parse_grades(json: &str) -> Result<Vec<Document>, ColdlineError> {
    let records: Vec<Value> = serde_json::from_str(json)?;
    records.into_iter().map(grade_to_document).collect()
}

/// Drop the collection and bulk-insert the documents, returning the count.
/// Destructive on any pre-existing collection of the same name.
pub async fn replace_collection(
    collection: &Collection<Document>,
    docs: Vec<Document>,
) -> Result<u64, ColdlineError> {
    collection.drop().await?;
    if docs.is_empty() {
        return Ok(0);
    }
    let result = collection.insert_many(docs).await?;
    Ok(result.inserted_ids.len() as u64)
}

fn grade_to_document(mut value: Value) -> Result<Document, ColdlineError> {
    let record = value
        .as_object_mut()
        .ok_or_else(|| ColdlineError::Dataset("expected a JSON object per record".into()))?;

    // Pull the date fields out before the generic conversion so the
    // `$date` wrappers are never interpreted as extended JSON.
    let assigned = take_date(record, "date_assigned")?
        .ok_or_else(|| ColdlineError::Dataset("record is missing date_assigned".into()))?;
    let completed = take_date(record, "date_completed")?;

    let mut doc = match to_bson(&value) {
        Ok(Bson::Document(doc)) => doc,
        Ok(_) => return Err(ColdlineError::Dataset("record is not a document".into())),
        Err(e) => return Err(ColdlineError::Dataset(format!("invalid record: {e}"))),
    };

    doc.insert("date_assigned", Bson::DateTime(assigned));
    if let Some(completed) = completed {
        doc.insert("date_completed", Bson::DateTime(completed));
    }
    Ok(doc)
}

fn take_date(
    record: &mut serde_json::Map<String, Value>,
    field: &str,
) -> Result<Option<BsonDateTime>, ColdlineError> {
    let Some(raw) = record.remove(field) else {
        return Ok(None);
    };
    let text = match &raw {
        Value::Object(wrapper) => wrapper.get("$date").and_then(Value::as_str).ok_or_else(|| {
            ColdlineError::Dataset(format!("{field} wrapper has no \"$date\" string"))
        })?,
        Value::String(text) => text.as_str(),
        _ => {
            return Err(ColdlineError::Dataset(format!(
                "{field} must be a string or a {{\"$date\": ...}} wrapper"
            )));
        }
    };
    Ok(Some(parse_timestamp(text)?))
}

/// Parse a dataset timestamp into a BSON datetime.
///
/// Full RFC 3339 inputs keep their offset and sub-second precision and are
/// converted to UTC. Offset-less inputs are interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Result<BsonDateTime, ColdlineError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(BsonDateTime::from_millis(
            parsed.with_timezone(&Utc).timestamp_millis(),
        ));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| ColdlineError::Dataset(format!("unparseable timestamp {raw:?}: {e}")))?;
    Ok(BsonDateTime::from_millis(naive.and_utc().timestamp_millis()))
}

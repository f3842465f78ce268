//! Server-side date normalization.
//!
//! The sample dataset carries dates from whenever it was authored. To make
//! the archive criterion meaningful the whole collection is shifted forward
//! so the most recent completion lands on "yesterday": every document gets
//! `(days between max(date_completed) and $$NOW) - 1` added to its
//! `date_assigned`, and to `date_completed` when its status is complete.
//! The shift is computed server-side in one aggregation-pipeline update, so
//! it is uniform within each document and consistent across the collection.
//! Running it again shifts again relative to a new "now" — it is a one-shot
//! transform, not an idempotent one.

use mongodb::bson::{Bson, DateTime as BsonDateTime, Document, doc};
use mongodb::{Collection, IndexModel};

use crate::error::ColdlineError;

/// Find the most recent `date_completed` in the collection.
pub async fn max_date_completed(
    collection: &Collection<Document>,
) -> Result<Option<BsonDateTime>, ColdlineError> {
    let newest = collection
        .find_one(doc! { "date_completed": { "$type": "date" } })
        .sort(doc! { "date_completed": -1 })
        .await?;
    Ok(newest.and_then(|doc| doc.get_datetime("date_completed").ok().copied()))
}

/// Build the update pipeline shifting all dates forward relative to `max`.
///
/// Documents whose `status` is not `"complete"` get `date_completed`
/// cleared instead of shifted.
pub fn shift_pipeline(max: BsonDateTime) -> Vec<Document> {
    let shift_days = doc! { "$subtract": ["$diff", 1] };
    vec![
        doc! {
            "$addFields": {
                "diff": {
                    "$dateDiff": {
                        "startDate": max,
                        "endDate": "$$NOW",
                        "unit": "day",
                    }
                }
            }
        },
        doc! {
            "$set": {
                "date_assigned": {
                    "$dateAdd": {
                        "startDate": "$date_assigned",
                        "unit": "day",
                        "amount": shift_days.clone(),
                    }
                },
                "date_completed": {
                    "$cond": {
                        "if": { "$eq": ["$status", "complete"] },
                        "then": {
                            "$dateAdd": {
                                "startDate": "$date_completed",
                                "unit": "day",
                                "amount": shift_days,
                            }
                        },
                        "else": Bson::Null,
                    }
                },
            }
        },
        doc! { "$unset": "diff" },
    ]
}

/// Apply the shift to every document. Returns the modified count.
pub async fn normalize_dates(collection: &Collection<Document>) -> Result<u64, ColdlineError> {
    let max = max_date_completed(collection).await?.ok_or_else(|| {
        ColdlineError::Dataset("no document has a date_completed to normalize against".into())
    })?;
    let result = collection
        .update_many(doc! {}, shift_pipeline(max))
        .await?;
    Ok(result.modified_count)
}

/// Create the (non-unique) index on `date_completed` the archive criterion
/// evaluates against.
pub async fn ensure_completed_index(
    collection: &Collection<Document>,
) -> Result<(), ColdlineError> {
    let index = IndexModel::builder()
        .keys(doc! { "date_completed": 1 })
        .build();
    collection.create_index(index).await?;
    Ok(())
}

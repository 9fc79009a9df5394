//! Shared row-decoding helpers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Decodes an epoch-milliseconds column into a UTC timestamp.
pub(crate) fn parse_timestamp<'r, R>(row: &'r R, column: &'r str) -> Result<DateTime<Utc>, sqlx::Error>
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    let millis: i64 = row.try_get(column)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Out-of-range timestamp: {}", millis),
        )),
    })
}

/// Decodes a TEXT column holding a UUID.
pub(crate) fn parse_uuid<'r, R>(row: &'r R, column: &'r str) -> Result<Uuid, sqlx::Error>
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

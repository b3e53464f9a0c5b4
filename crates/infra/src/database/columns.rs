//! Column encoding shared by the SQLite repositories.

use std::str::FromStr;

use cadence_domain::CadenceError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use tokio::task::JoinError;

/// Fixed-width RFC 3339 so text comparison matches chronological order.
pub(crate) fn encode_time(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_time(&raw, idx)
}

pub(crate) fn optional_time_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| parse_time(&value, idx)).transpose()
}

/// Parse any `FromStr` column (ids, enums) with a conversion error on failure.
pub(crate) fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_error(idx, e.to_string()))
}

fn parse_time(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e.to_string()))
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

pub(crate) fn map_join_error(err: JoinError) -> CadenceError {
    if err.is_cancelled() {
        CadenceError::Internal("blocking task cancelled".into())
    } else {
        CadenceError::Internal(format!("blocking task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn encoded_times_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 10, 1, 9, 0, 0).unwrap();

        assert!(encode_time(early) < encode_time(late));
        assert_eq!(encode_time(early), "2025-09-01T09:00:00.000Z");
    }
}

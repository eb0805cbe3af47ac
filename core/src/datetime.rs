//! Conversion of date/time columns between storage and in-memory form.
//!
//! Datetime columns are stored as `YYYY-MM-DD HH:MM:SS` (UTC) and held in
//! memory as ISO-8601 `YYYY-MM-DDTHH:MM:SS+00:00`, the same shape the query
//! builder projects them in. Time columns are `HH:MM:SS` on both sides.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::{Result, TabulaError, Value};

pub const SERVER_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const ISO_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S+00:00";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Which temporal shape a column holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemporalKind {
    Time,
    DateTime,
}

/// Parses any accepted datetime spelling into a UTC naive datetime.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for format in [SERVER_DATETIME_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parses `HH:MM:SS` or `HH:MM`; a full datetime contributes its time part.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
        .or_else(|| parse_datetime(text).map(|dt| dt.time()))
}

/// Converts a value read from the database into its in-memory form.
///
/// Values that do not parse are handed back untouched.
pub fn from_server(value: Value, kind: TemporalKind) -> Value {
    let Value::Text(text) = &value else {
        return value;
    };
    match kind {
        TemporalKind::DateTime => match parse_datetime(text) {
            Some(dt) => Value::Text(dt.format(ISO_DATETIME_FORMAT).to_string()),
            None => value,
        },
        TemporalKind::Time => match parse_time(text) {
            Some(t) => Value::Text(t.format(TIME_FORMAT).to_string()),
            None => value,
        },
    }
}

/// Converts an in-memory value into the form written to the database.
pub fn to_server(column: &str, value: &Value, kind: TemporalKind) -> Result<Value> {
    let text = match value {
        Value::Null => return Ok(Value::Null),
        Value::Text(text) => text,
        other => return Err(TabulaError::argument(column, other)),
    };
    let converted = match kind {
        TemporalKind::DateTime => {
            parse_datetime(text).map(|dt| dt.format(SERVER_DATETIME_FORMAT).to_string())
        }
        TemporalKind::Time => parse_time(text).map(|t| t.format(TIME_FORMAT).to_string()),
    };
    converted
        .map(Value::Text)
        .ok_or_else(|| TabulaError::argument(column, text))
}

/// The current instant in a column's in-memory form.
pub fn now(kind: TemporalKind) -> Value {
    let now = Utc::now().naive_utc();
    match kind {
        TemporalKind::DateTime => Value::Text(now.format(ISO_DATETIME_FORMAT).to_string()),
        TemporalKind::Time => Value::Text(now.format(TIME_FORMAT).to_string()),
    }
}

/// Resolves SQL clock defaults (`CURRENT_TIMESTAMP` and friends) to values.
///
/// Returns `None` when the default is an ordinary literal.
pub fn resolve_clock_default(default: &Value, kind: Option<TemporalKind>) -> Option<Value> {
    let keyword = default.as_str()?.trim().to_ascii_uppercase();
    let now = Utc::now().naive_utc();
    let value = match keyword.as_str() {
        "CURRENT_TIMESTAMP" | "NOW()" | "CURRENT_TIMESTAMP()" => match kind {
            Some(kind) => return Some(self::now(kind)),
            None => now.format(SERVER_DATETIME_FORMAT).to_string(),
        },
        "CURRENT_DATE" => now.format("%Y-%m-%d").to_string(),
        "CURRENT_TIME" => now.format(TIME_FORMAT).to_string(),
        _ => return None,
    };
    Some(Value::Text(value))
}

/// Returns true when `end` is strictly after `start`.
///
/// `None` means one side is null and there is nothing to compare.
pub fn is_after(column: &str, start: &Value, end: &Value, kind: TemporalKind) -> Result<Option<bool>> {
    if start.is_null() || end.is_null() {
        return Ok(None);
    }
    let text = |v: &Value| -> Result<String> {
        match v {
            Value::Text(s) => Ok(s.clone()),
            other => Err(TabulaError::argument(column, other)),
        }
    };
    let (start, end) = (text(start)?, text(end)?);
    let ordered = match kind {
        TemporalKind::DateTime => {
            let s = parse_datetime(&start).ok_or_else(|| TabulaError::argument(column, &start))?;
            let e = parse_datetime(&end).ok_or_else(|| TabulaError::argument(column, &end))?;
            e > s
        }
        TemporalKind::Time => {
            let s = parse_time(&start).ok_or_else(|| TabulaError::argument(column, &start))?;
            let e = parse_time(&end).ok_or_else(|| TabulaError::argument(column, &end))?;
            e > s
        }
    };
    Ok(Some(ordered))
}

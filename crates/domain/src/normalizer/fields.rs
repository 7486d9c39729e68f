//! Lenient field extraction shared by the provider shapes

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Conversion factor from metres per second to kilometres per hour
pub const MS_TO_KMH: f64 = 3.6;

/// Naive timestamp layouts providers use, tried in order
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Read a finite number, accepting numeric strings
pub fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Read an integral number such as a condition code
///
/// Floats with a fractional part are rejected rather than truncated.
pub fn integer(value: Option<&Value>) -> Option<i64> {
    if let Some(Value::Number(n)) = value {
        if let Some(i) = n.as_i64() {
            return Some(i);
        }
    }
    let n = number(value)?;
    if n.fract() != 0.0 || n < i64::MIN as f64 || n > i64::MAX as f64 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(n as i64)
}

/// Condition codes are carried as `i32`; anything outside that range is dropped
pub fn condition_code(value: Option<&Value>) -> Option<i32> {
    integer(value).and_then(|code| i32::try_from(code).ok())
}

/// Parse a provider timestamp into UTC
///
/// Naive timestamps are local to `utc_offset_seconds`; RFC 3339 timestamps
/// carry their own offset.
pub fn timestamp(value: Option<&Value>, utc_offset_seconds: i64) -> Option<DateTime<Utc>> {
    let text = value?.as_str()?.trim();
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            let utc = Utc.from_utc_datetime(&naive);
            return utc.checked_sub_signed(Duration::try_seconds(utc_offset_seconds)?);
        }
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse unix seconds into UTC
pub fn unix_seconds(value: Option<&Value>) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(integer(value)?, 0)
}

/// Convert a raw humidity value into a whole percentage
///
/// Fractions strictly between 0 and 1 are treated as ratios.
pub fn humidity_pct(raw: f64) -> u8 {
    let pct = if raw > 0.0 && raw < 1.0 { raw * 100.0 } else { raw };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamped = pct.round().clamp(0.0, 100.0) as u8;
    clamped
}

/// Convert m/s to km/h, `None` if the result is not finite
pub fn ms_to_kmh(ms: f64) -> Option<f64> {
    round2(ms * MS_TO_KMH)
}

/// Round to two decimals, `None` for non-finite input
///
/// Magnitudes too large to scale are already integral and kept as is.
pub fn round2(value: f64) -> Option<f64> {
    let scaled = value * 100.0;
    let rounded = if scaled.is_finite() {
        scaled.round() / 100.0
    } else {
        value
    };
    rounded.is_finite().then_some(rounded)
}

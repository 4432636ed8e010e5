//! Decoding of the status log returned by `laststatus`.

use serde_json::Value;
use tracing::{debug, trace};

use helty_types::SensorReading;

/// Parse a `laststatus` payload into a reading.
///
/// The payload is a list of `{ "field": <name>, "value": <number> }` entries.
/// Unknown field names are ignored, an entry without `value` counts as `0`,
/// and entries whose value is not a number are skipped. Anything other than
/// a list yields an empty reading.
pub fn parse_sensor_data(raw: &Value) -> SensorReading {
    let mut reading = SensorReading::default();

    let Some(entries) = raw.as_array() else {
        debug!("status log is not a list, no sensor data");
        return reading;
    };

    for entry in entries {
        let Some(field) = entry.get("field").and_then(Value::as_str) else {
            trace!(?entry, "status entry without field name");
            continue;
        };
        let value = match entry.get("value") {
            None => 0.0,
            Some(value) => match value.as_f64() {
                Some(v) => v,
                None => {
                    debug!(field, %value, "non-numeric status value");
                    continue;
                }
            },
        };
        if !reading.record(field, value) {
            trace!(field, "ignoring status field");
        }
    }

    reading
}

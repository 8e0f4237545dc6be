use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const STATUS_ACTIVE: &str = "active";

const TEMP_MIN: f64 = 20.0;
const TEMP_MAX: f64 = 30.0;
const HUMIDITY_MIN: f64 = 50.0;
const HUMIDITY_MAX: f64 = 70.0;

/// Synthetic sensor reading published once per loop iteration.
///
/// Field order is the wire order of the JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    pub device: String,
    pub message_id: u32,
    pub temperature: f64,
    pub humidity: f64,
    pub timestamp: i64,
    pub status: String,
}

impl Telemetry {
    pub fn generate(rng: &mut impl Rng, device: &str, message_id: u32) -> Self {
        Self {
            device: device.to_string(),
            message_id,
            temperature: sample_tenths(rng, TEMP_MIN, TEMP_MAX),
            humidity: sample_tenths(rng, HUMIDITY_MIN, HUMIDITY_MAX),
            timestamp: Utc::now().timestamp(),
            status: STATUS_ACTIVE.to_string(),
        }
    }

    /// JSON payload; serde_json leaves non-ASCII characters unescaped.
    pub fn to_payload(&self) -> crate::errors::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Uniform sample in `[min, max)` rounded to one decimal place.
///
/// Rounding up to `max` itself is pulled back to the last tenth below it.
fn sample_tenths(rng: &mut impl Rng, min: f64, max: f64) -> f64 {
    let raw = rng.gen_range(min..max);
    let tenths = (raw * 10.0).round().min(max * 10.0 - 1.0);
    tenths / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn is_one_decimal(value: f64) -> bool {
        ((value * 10.0).round() / 10.0 - value).abs() < 1e-9
    }

    #[test]
    fn test_generated_values_in_range() {
        let mut rng = StdRng::seed_from_u64(7);

        for id in 1..=1000 {
            let t = Telemetry::generate(&mut rng, "dev-1", id);
            assert!((TEMP_MIN..TEMP_MAX).contains(&t.temperature), "{}", t.temperature);
            assert!((HUMIDITY_MIN..HUMIDITY_MAX).contains(&t.humidity), "{}", t.humidity);
            assert!(is_one_decimal(t.temperature));
            assert!(is_one_decimal(t.humidity));
            assert_eq!(t.status, "active");
            assert_eq!(t.message_id, id);
        }
    }

    #[test]
    fn test_sample_never_rounds_to_upper_bound() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..10_000 {
            let v = sample_tenths(&mut rng, 29.95, 30.0);
            assert!(v < 30.0);
            assert!(v >= 29.9);
        }
    }

    #[test]
    fn test_payload_key_order() {
        let t = Telemetry {
            device: "dev-1".to_string(),
            message_id: 3,
            temperature: 21.5,
            humidity: 55.0,
            timestamp: 1_700_000_000,
            status: STATUS_ACTIVE.to_string(),
        };

        let payload = t.to_payload().unwrap();
        assert_eq!(
            payload,
            r#"{"device":"dev-1","messageId":3,"temperature":21.5,"humidity":55.0,"timestamp":1700000000,"status":"active"}"#
        );
    }

    #[test]
    fn test_payload_keeps_non_ascii() {
        let mut rng = StdRng::seed_from_u64(1);
        let t = Telemetry::generate(&mut rng, "sensor-ñandú", 1);

        let payload = t.to_payload().unwrap();
        assert!(payload.contains("sensor-ñandú"));
        assert!(!payload.contains("\\u"));
    }
}

//! Wire decoder for upstream position frames.
//!
//! One frame is one UTF-8 JSON object:
//! ```json
//! {"ts_ms": 1000, "planet_name": "Calypso", "x": 10, "y": 20, "z": null}
//! ```
//! `ts_ms`, `x` and `y` are required finite numbers. `planet_name`
//! defaults to `""` and `z` to `null`. Unknown fields are ignored.

use serde::Deserialize;

use crate::error::DecodeError;
use crate::types::{PositionDto, WorldPosition};

#[derive(Debug, Deserialize)]
struct PositionWire {
    ts_ms: f64,
    #[serde(default)]
    planet_name: Option<String>,
    x: f64,
    y: f64,
    #[serde(default)]
    z: Option<f64>,
}

/// Decode one raw frame into a validated [`PositionDto`].
///
/// Never panics; every malformed input maps to a [`DecodeError`].
/// Fractional `ts_ms` values are truncated toward zero.
pub fn decode(raw: &[u8]) -> Result<PositionDto, DecodeError> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(raw).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let wire = PositionWire::deserialize(serde_json::Value::Object(object))
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    ensure_finite("ts_ms", wire.ts_ms)?;
    ensure_finite("x", wire.x)?;
    ensure_finite("y", wire.y)?;
    if let Some(z) = wire.z {
        ensure_finite("z", z)?;
    }

    Ok(PositionDto {
        timestamp_ms: wire.ts_ms.trunc() as i64,
        position: WorldPosition {
            planet_name: wire.planet_name.unwrap_or_default(),
            x: wire.x,
            y: wire.y,
            z: wire.z,
        },
    })
}

fn ensure_finite(field: &'static str, value: f64) -> Result<(), DecodeError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DecodeError::NonFinite { field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_frame() {
        let raw = br#"{"ts_ms":1000,"planet_name":"Calypso","x":10,"y":20,"z":null}"#;
        let dto = decode(raw).unwrap();
        assert_eq!(
            dto,
            PositionDto {
                timestamp_ms: 1000,
                position: WorldPosition {
                    planet_name: "Calypso".into(),
                    x: 10.0,
                    y: 20.0,
                    z: None,
                },
            }
        );
    }

    #[test]
    fn optional_fields_default() {
        let dto = decode(br#"{"ts_ms":5,"x":1.5,"y":-2.25}"#).unwrap();
        assert_eq!(dto.position.planet_name, "");
        assert_eq!(dto.position.z, None);
        assert_eq!(dto.position.x, 1.5);
        assert_eq!(dto.position.y, -2.25);
    }

    #[test]
    fn null_planet_name_defaults_to_empty() {
        let dto = decode(br#"{"ts_ms":5,"planet_name":null,"x":1,"y":2}"#).unwrap();
        assert_eq!(dto.position.planet_name, "");
    }

    #[test]
    fn z_is_kept_when_present() {
        let dto = decode(br#"{"ts_ms":5,"x":1,"y":2,"z":130.5}"#).unwrap();
        assert_eq!(dto.position.z, Some(130.5));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let dto = decode(br#"{"ts_ms":5,"x":1,"y":2,"confidence":0.9,"source":"ocr"}"#).unwrap();
        assert_eq!(dto.timestamp_ms, 5);
    }

    #[test]
    fn fractional_timestamp_truncates() {
        let dto = decode(br#"{"ts_ms":1234.9,"x":1,"y":2}"#).unwrap();
        assert_eq!(dto.timestamp_ms, 1234);
    }

    #[test]
    fn decode_is_deterministic() {
        let raw = br#"{"ts_ms":42,"planet_name":"Arkadia","x":-3.5,"y":7,"z":1}"#;
        assert_eq!(decode(raw).unwrap(), decode(raw).unwrap());
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            decode(b"this is not valid json {{{"),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(decode(&[0xff, 0xfe, b'{', b'}']).is_err());
    }

    #[test]
    fn rejects_missing_required_fields() {
        for raw in [
            &br#"{"x":1,"y":2}"#[..],
            br#"{"ts_ms":1,"y":2}"#,
            br#"{"ts_ms":1,"x":2}"#,
            br#"{}"#,
        ] {
            assert!(decode(raw).is_err(), "should reject {}", String::from_utf8_lossy(raw));
        }
    }

    #[test]
    fn rejects_wrong_types() {
        for raw in [
            &br#"{"ts_ms":"1000","x":1,"y":2}"#[..],
            br#"{"ts_ms":1000,"x":"1","y":2}"#,
            br#"{"ts_ms":1000,"x":1,"y":null}"#,
            br#"{"ts_ms":1000,"x":1,"y":2,"z":"high"}"#,
            br#"{"ts_ms":1000,"x":1,"y":2,"planet_name":5}"#,
        ] {
            assert!(decode(raw).is_err(), "should reject {}", String::from_utf8_lossy(raw));
        }
    }

    #[test]
    fn rejects_non_object_json() {
        for raw in [&b"[1000, \"Calypso\", 10, 20, null]"[..], b"42", b"null", b"\"x\""] {
            assert!(decode(raw).is_err(), "should reject {}", String::from_utf8_lossy(raw));
        }
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        // JSON cannot spell NaN/Infinity; an overflowing literal is the closest input.
        assert!(decode(br#"{"ts_ms":1e400,"x":1,"y":2}"#).is_err());
        assert!(decode(br#"{"ts_ms":1,"x":NaN,"y":2}"#).is_err());
    }

    #[test]
    fn ensure_finite_flags_field() {
        assert_eq!(
            ensure_finite("x", f64::INFINITY),
            Err(DecodeError::NonFinite { field: "x" })
        );
        assert_eq!(
            ensure_finite("y", f64::NAN),
            Err(DecodeError::NonFinite { field: "y" })
        );
        assert!(ensure_finite("ts_ms", 0.0).is_ok());
    }
}

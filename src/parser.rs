//! Protobuf decoding and canonical serialization for GTFS Realtime feeds.

use anyhow::Result;
use prost::Message;

use crate::gtfs_rt::FeedMessage;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// Optional fields absent from the payload decode to their defaults rather
/// than failing the document; only malformed or truncated protobuf is an
/// error.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    Ok(FeedMessage::decode(bytes)?)
}

/// Serializes a decoded feed into its canonical textual form.
///
/// Pretty-printed JSON with fields in struct declaration order, so the same
/// document always renders to the same text.
pub fn to_canonical_text(feed: &FeedMessage) -> Result<String> {
    Ok(serde_json::to_string_pretty(feed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::{FeedEntity, FeedHeader, FeedMessage, Position, VehiclePosition};

    fn one_vehicle_feed() -> FeedMessage {
        FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".to_string(),
                incrementality: None,
                timestamp: Some(1709650029),
                feed_version: None,
            },
            entity: vec![FeedEntity {
                id: "veh-42".to_string(),
                vehicle: Some(VehiclePosition {
                    position: Some(Position {
                        latitude: 47.2184,
                        longitude: -1.5536,
                        bearing: Some(90.0),
                        odometer: None,
                        speed: Some(8.3),
                    }),
                    timestamp: Some(1709650020),
                    ..Default::default()
                }),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn parse_empty_bytes_returns_default_feed() {
        // An empty byte array decodes to a FeedMessage with default values.
        // This is valid protobuf behavior.
        let feed = parse_feed(&[]).unwrap();
        assert_eq!(feed.header.gtfs_realtime_version, "");
        assert!(feed.entity.is_empty());
    }

    #[test]
    fn parse_invalid_bytes_is_an_error() {
        let invalid_bytes = vec![0xFF, 0xFE, 0x00, 0x01];
        assert!(parse_feed(&invalid_bytes).is_err());
    }

    #[test]
    fn parse_round_trips_an_encoded_feed() {
        let encoded = one_vehicle_feed().encode_to_vec();
        let parsed = parse_feed(&encoded).unwrap();

        assert_eq!(parsed.header.gtfs_realtime_version, "2.0");
        assert_eq!(parsed.header.timestamp, Some(1709650029));
        assert_eq!(parsed.entity.len(), 1);
        assert_eq!(parsed.entity[0].id, "veh-42");
    }

    #[test]
    fn missing_optional_fields_do_not_fail_the_decode() {
        // A vehicle entity with no position, trip or descriptor still parses;
        // the absent attributes come back as None.
        let feed = FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".to_string(),
                incrementality: None,
                timestamp: None,
                feed_version: None,
            },
            entity: vec![FeedEntity {
                id: "bare".to_string(),
                vehicle: Some(VehiclePosition::default()),
                ..Default::default()
            }],
        };

        let parsed = parse_feed(&feed.encode_to_vec()).unwrap();
        let vehicle = parsed.entity[0].vehicle.as_ref().unwrap();
        assert!(vehicle.position.is_none());
        assert!(vehicle.trip.is_none());
        assert!(vehicle.timestamp.is_none());
    }

    #[test]
    fn canonical_text_is_deterministic() {
        let encoded = one_vehicle_feed().encode_to_vec();

        let first = to_canonical_text(&parse_feed(&encoded).unwrap()).unwrap();
        let second = to_canonical_text(&parse_feed(&encoded).unwrap()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn canonical_text_preserves_names_and_nesting() {
        let text = to_canonical_text(&one_vehicle_feed()).unwrap();

        assert!(text.contains("\"gtfs_realtime_version\""));
        assert!(text.contains("\"entity\""));
        assert!(text.contains("\"latitude\""));

        // Re-parseable by downstream consumers.
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["entity"][0]["id"], "veh-42");
        assert_eq!(value["header"]["gtfs_realtime_version"], "2.0");
    }
}

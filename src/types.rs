//! Flat flight records projected from feed responses.

use crate::proto::{self, Flight};
use crate::request::FlightId;
use serde::Serialize;
use std::borrow::Cow;

/// One position sample relative to the previous one.
///
/// The first sample of a buffer is relative to the record timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PositionDelta {
    pub delta_lat: i32,
    pub delta_lon: i32,
    pub delta_ms: u32,
}

impl From<&proto::RecentPosition> for PositionDelta {
    fn from(p: &proto::RecentPosition) -> Self {
        Self {
            delta_lat: p.delta_lat,
            delta_lon: p.delta_lon,
            delta_ms: p.delta_ms,
        }
    }
}

/// Sample offset from the record timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PositionOffset {
    pub lat: i64,
    pub lon: i64,
    pub ms: u64,
}

/// A flight flattened into one row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlightRecord {
    /// Unix seconds.
    pub timestamp: u32,
    pub flightid: u32,
    pub latitude: f32,
    pub longitude: f32,
    pub track: i32,
    /// Feet.
    pub altitude: i32,
    /// Knots.
    pub ground_speed: i32,
    /// Feet per minute.
    pub vertical_speed: i32,
    pub on_ground: bool,
    pub callsign: String,
    pub source: i32,
    pub registration: String,
    pub origin: String,
    pub destination: String,
    pub typecode: String,
    pub eta: u32,
    pub squawk: u32,
    pub position_buffer: Vec<PositionDelta>,
}

impl FlightRecord {
    /// Column names in declaration order.
    pub const COLUMNS: [&'static str; 18] = [
        "timestamp",
        "flightid",
        "latitude",
        "longitude",
        "track",
        "altitude",
        "ground_speed",
        "vertical_speed",
        "on_ground",
        "callsign",
        "source",
        "registration",
        "origin",
        "destination",
        "typecode",
        "eta",
        "squawk",
        "position_buffer",
    ];

    pub fn flight_id(&self) -> FlightId {
        FlightId(self.flightid)
    }

    pub fn source(&self) -> Option<proto::DataSource> {
        proto::DataSource::try_from(self.source).ok()
    }

    /// Fold the delta chain into offsets from the record timestamp.
    pub fn cumulative_offsets(&self) -> Vec<PositionOffset> {
        self.position_buffer
            .iter()
            .scan(PositionOffset::default(), |acc, d| {
                acc.lat += i64::from(d.delta_lat);
                acc.lon += i64::from(d.delta_lon);
                acc.ms += u64::from(d.delta_ms);
                Some(*acc)
            })
            .collect()
    }
}

impl From<&Flight> for FlightRecord {
    fn from(f: &Flight) -> Self {
        let extra = f.extra_info.clone().unwrap_or_default();
        let route = extra.route.unwrap_or_default();
        let schedule = extra.schedule.unwrap_or_default();

        Self {
            timestamp: f.timestamp,
            flightid: f.flightid,
            latitude: f.lat,
            longitude: f.lon,
            track: f.track,
            altitude: f.alt,
            ground_speed: f.speed,
            vertical_speed: extra.vspeed,
            on_ground: f.on_ground,
            callsign: f.callsign.clone(),
            source: f.source,
            registration: extra.reg,
            origin: route.from,
            destination: route.to,
            typecode: extra.r#type,
            eta: schedule.eta,
            squawk: extra.squawk,
            position_buffer: f
                .position_buffer
                .as_ref()
                .map(|b| b.recent_positions_list.iter().map(PositionDelta::from).collect())
                .unwrap_or_default(),
        }
    }
}

/// A flight record with its distance from the search point.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NearbyFlightRecord {
    #[serde(flatten)]
    pub record: FlightRecord,
    /// Metres.
    pub distance: u32,
}

impl From<&proto::NearestFlight> for NearbyFlightRecord {
    fn from(n: &proto::NearestFlight) -> Self {
        Self {
            record: n.flight.as_ref().map(FlightRecord::from).unwrap_or_default(),
            distance: n.distance,
        }
    }
}

/// A response that carries a list of flights.
///
/// Yields one flight per list entry. An entry without a flight message is
/// yielded as an owned default flight.
pub trait FlightList {
    fn flights(&self) -> Vec<Cow<'_, Flight>>;
}

impl FlightList for proto::LiveFeedResponse {
    fn flights(&self) -> Vec<Cow<'_, Flight>> {
        self.flights_list.iter().map(Cow::Borrowed).collect()
    }
}

impl FlightList for proto::PlaybackResponse {
    fn flights(&self) -> Vec<Cow<'_, Flight>> {
        self.live_feed_response
            .as_ref()
            .map(FlightList::flights)
            .unwrap_or_default()
    }
}

impl FlightList for proto::NearestFlightsResponse {
    fn flights(&self) -> Vec<Cow<'_, Flight>> {
        self.flights_list
            .iter()
            .map(|n| match &n.flight {
                Some(flight) => Cow::Borrowed(flight),
                None => Cow::Owned(Flight::default()),
            })
            .collect()
    }
}

/// Project every flight of `response` into a row. Never fails.
pub fn project(response: &impl FlightList) -> Vec<FlightRecord> {
    response
        .flights()
        .iter()
        .map(|flight| FlightRecord::from(&**flight))
        .collect()
}

/// Like [`project`], keeping each entry's distance from the search point.
pub fn project_nearest(response: &proto::NearestFlightsResponse) -> Vec<NearbyFlightRecord> {
    response
        .flights_list
        .iter()
        .map(NearbyFlightRecord::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{
        ExtraFlightInfo, LiveFeedResponse, NearestFlight, NearestFlightsResponse,
        PlaybackResponse, PositionBuffer, RecentPosition, Route, Schedule,
    };

    fn full_flight() -> Flight {
        Flight {
            flightid: 0x2f4b1c9a,
            lat: 48.5,
            lon: 2.25,
            track: 270,
            alt: 35000,
            speed: 450,
            timestamp: 1_700_000_000,
            callsign: "AFR123".into(),
            source: 1,
            extra_info: Some(ExtraFlightInfo {
                flight: "AF123".into(),
                reg: "F-GKXA".into(),
                route: Some(Route {
                    from: "CDG".into(),
                    to: "NCE".into(),
                }),
                r#type: "A320".into(),
                squawk: 0o7421,
                vspeed: -640,
                schedule: Some(Schedule {
                    eta: 1_700_003_600,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            position_buffer: Some(PositionBuffer {
                recent_positions_list: vec![
                    RecentPosition {
                        delta_lat: 190,
                        delta_lon: -15,
                        delta_ms: 1000,
                    },
                    RecentPosition {
                        delta_lat: 215,
                        delta_lon: -20,
                        delta_ms: 2000,
                    },
                ],
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_projection_of_full_flight() {
        let response = LiveFeedResponse {
            flights_list: vec![full_flight()],
            ..Default::default()
        };
        let rows = project(&response);
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.flight_id().to_string(), "2f4b1c9a");
        assert_eq!(row.registration, "F-GKXA");
        assert_eq!(row.origin, "CDG");
        assert_eq!(row.destination, "NCE");
        assert_eq!(row.typecode, "A320");
        assert_eq!(row.vertical_speed, -640);
        assert_eq!(row.eta, 1_700_003_600);
        assert_eq!(row.source(), Some(proto::DataSource::Mlat));
        assert_eq!(row.position_buffer.len(), 2);
    }

    #[test]
    fn test_projection_is_total() {
        let response = LiveFeedResponse {
            flights_list: vec![Flight::default()],
            ..Default::default()
        };
        let rows = project(&response);
        assert_eq!(rows, vec![FlightRecord::default()]);
        assert!(rows[0].callsign.is_empty());
        assert!(rows[0].position_buffer.is_empty());
    }

    #[test]
    fn test_playback_without_inner_response() {
        assert!(project(&PlaybackResponse::default()).is_empty());

        let playback = PlaybackResponse {
            live_feed_response: Some(LiveFeedResponse {
                flights_list: vec![full_flight(), Flight::default()],
                ..Default::default()
            }),
        };
        assert_eq!(project(&playback).len(), 2);
    }

    #[test]
    fn test_cumulative_offsets() {
        let record = FlightRecord::from(&full_flight());
        assert_eq!(
            record.cumulative_offsets(),
            vec![
                PositionOffset {
                    lat: 190,
                    lon: -15,
                    ms: 1000
                },
                PositionOffset {
                    lat: 405,
                    lon: -35,
                    ms: 3000
                },
            ]
        );
    }

    #[test]
    fn test_nearest_keeps_distance() {
        let response = NearestFlightsResponse {
            flights_list: vec![
                NearestFlight {
                    flight: Some(full_flight()),
                    distance: 1200,
                },
                NearestFlight {
                    flight: None,
                    distance: 9000,
                },
            ],
        };
        let rows = project(&response);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], FlightRecord::default());

        let nearby = project_nearest(&response);
        assert_eq!(nearby.len(), 2);
        assert_eq!(nearby[0].distance, 1200);
        assert_eq!(nearby[1].record, FlightRecord::default());
        for (row, near) in rows.iter().zip(&nearby) {
            assert_eq!(row, &near.record);
        }
    }

    #[test]
    fn test_nearest_entry_without_flight_gets_row() {
        let response = NearestFlightsResponse {
            flights_list: vec![NearestFlight {
                flight: None,
                distance: 500,
            }],
        };
        assert_eq!(project(&response), vec![FlightRecord::default()]);
    }

    #[test]
    fn test_serialized_columns() {
        let value = serde_json::to_value(FlightRecord::from(&full_flight())).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), FlightRecord::COLUMNS.len());
        for column in FlightRecord::COLUMNS {
            assert!(object.contains_key(column), "missing {}", column);
        }
        assert_eq!(object["origin"], "CDG");
    }
}

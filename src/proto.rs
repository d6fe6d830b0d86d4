//! Wire schema for the `fr24.feed.api.v1.Feed` service.
//!
//! The messages are declared by hand with `prost` derives so the crate builds
//! without `protoc`. Only the fields this crate reads or writes are declared;
//! unknown fields on the wire are skipped by the decoder.

#![allow(clippy::derive_partial_eq_without_eq)]

pub use prost_types::FieldMask;

// === Enumerations ===

/// Receiver network that produced a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DataSource {
    Adsb = 0,
    Mlat = 1,
    Flarm = 2,
    Faa = 3,
    Estimated = 4,
    Satellite = 5,
    OtherDataSource = 6,
    Uat = 7,
    Spidertracks = 8,
    Aus = 9,
}

impl DataSource {
    pub const ALL: [DataSource; 10] = [
        Self::Adsb,
        Self::Mlat,
        Self::Flarm,
        Self::Faa,
        Self::Estimated,
        Self::Satellite,
        Self::OtherDataSource,
        Self::Uat,
        Self::Spidertracks,
        Self::Aus,
    ];
}

/// Category of operation a flight belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Service {
    Passenger = 0,
    Cargo = 1,
    MilitaryAndGovernment = 2,
    BusinessJets = 3,
    GeneralAviation = 4,
    Helicopters = 5,
    LighterThanAir = 6,
    Gliders = 7,
    Drones = 8,
    GroundVehicles = 9,
    OtherService = 10,
    NonCategorized = 11,
}

impl Service {
    pub const ALL: [Service; 12] = [
        Self::Passenger,
        Self::Cargo,
        Self::MilitaryAndGovernment,
        Self::BusinessJets,
        Self::GeneralAviation,
        Self::Helicopters,
        Self::LighterThanAir,
        Self::Gliders,
        Self::Drones,
        Self::GroundVehicles,
        Self::OtherService,
        Self::NonCategorized,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TrafficType {
    None = 0,
    GroundOnly = 1,
    AirborneOnly = 2,
    All = 3,
}

/// Whether flights with restricted visibility are returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum RestrictionVisibility {
    NotVisible = 0,
    PartiallyVisible = 1,
    FullyVisible = 2,
}

// === Shared messages ===

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LocationBoundaries {
    #[prost(float, tag = "1")]
    pub north: f32,
    #[prost(float, tag = "2")]
    pub south: f32,
    #[prost(float, tag = "3")]
    pub west: f32,
    #[prost(float, tag = "4")]
    pub east: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VisibilitySettings {
    #[prost(enumeration = "DataSource", repeated, tag = "1")]
    pub sources_list: Vec<i32>,
    #[prost(enumeration = "Service", repeated, tag = "2")]
    pub services_list: Vec<i32>,
    #[prost(enumeration = "TrafficType", tag = "3")]
    pub traffic_type: i32,
    #[prost(bool, optional, tag = "4")]
    pub only_restricted: Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Geolocation {
    #[prost(double, tag = "1")]
    pub lat: f64,
    #[prost(double, tag = "2")]
    pub lon: f64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Route {
    #[prost(string, tag = "1")]
    pub from: String,
    #[prost(string, tag = "2")]
    pub to: String,
}

/// Scheduled, estimated and actual times, unix seconds.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Schedule {
    #[prost(uint32, tag = "1")]
    pub std: u32,
    #[prost(uint32, tag = "2")]
    pub etd: u32,
    #[prost(uint32, tag = "3")]
    pub atd: u32,
    #[prost(uint32, tag = "4")]
    pub sta: u32,
    #[prost(uint32, tag = "5")]
    pub eta: u32,
    #[prost(uint32, tag = "6")]
    pub ata: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExtraFlightInfo {
    #[prost(string, tag = "1")]
    pub flight: String,
    #[prost(string, tag = "2")]
    pub reg: String,
    #[prost(message, optional, tag = "3")]
    pub route: Option<Route>,
    #[prost(string, tag = "4")]
    pub r#type: String,
    #[prost(uint32, tag = "5")]
    pub squawk: u32,
    #[prost(int32, tag = "6")]
    pub vspeed: i32,
    #[prost(uint32, tag = "7")]
    pub age: u32,
    #[prost(uint32, tag = "8")]
    pub country_of_reg: u32,
    #[prost(message, optional, tag = "9")]
    pub schedule: Option<Schedule>,
    #[prost(uint32, tag = "10")]
    pub logo_id: u32,
    #[prost(string, tag = "11")]
    pub airspace: String,
}

/// One sample of the recent-position buffer, relative to the previous one.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecentPosition {
    #[prost(int32, tag = "1")]
    pub delta_lat: i32,
    #[prost(int32, tag = "2")]
    pub delta_lon: i32,
    #[prost(uint32, tag = "3")]
    pub delta_ms: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PositionBuffer {
    #[prost(message, repeated, tag = "1")]
    pub recent_positions_list: Vec<RecentPosition>,
}

/// Live snapshot of a single flight.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Flight {
    #[prost(uint32, tag = "1")]
    pub flightid: u32,
    #[prost(float, tag = "2")]
    pub lat: f32,
    #[prost(float, tag = "3")]
    pub lon: f32,
    #[prost(int32, tag = "4")]
    pub track: i32,
    #[prost(int32, tag = "5")]
    pub alt: i32,
    #[prost(int32, tag = "6")]
    pub speed: i32,
    #[prost(int32, tag = "7")]
    pub icon: i32,
    #[prost(int32, tag = "8")]
    pub status: i32,
    #[prost(uint32, tag = "9")]
    pub timestamp: u32,
    #[prost(bool, tag = "10")]
    pub on_ground: bool,
    #[prost(string, tag = "11")]
    pub callsign: String,
    #[prost(enumeration = "DataSource", tag = "12")]
    pub source: i32,
    #[prost(message, optional, tag = "13")]
    pub extra_info: Option<ExtraFlightInfo>,
    #[prost(message, optional, tag = "14")]
    pub position_buffer: Option<PositionBuffer>,
    #[prost(uint64, tag = "15")]
    pub timestamp_ms: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TrailPoint {
    #[prost(uint64, tag = "1")]
    pub snapshot_id: u64,
    #[prost(float, tag = "2")]
    pub lat: f32,
    #[prost(float, tag = "3")]
    pub lon: f32,
    #[prost(int32, tag = "4")]
    pub altitude: i32,
    #[prost(uint32, tag = "5")]
    pub spd: u32,
    #[prost(uint32, tag = "6")]
    pub heading: u32,
    #[prost(int32, tag = "7")]
    pub vspd: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AircraftInfo {
    #[prost(uint32, tag = "1")]
    pub icao_address: u32,
    #[prost(string, tag = "2")]
    pub reg: String,
    #[prost(string, tag = "3")]
    pub r#type: String,
    #[prost(uint32, tag = "4")]
    pub country_of_reg: u32,
    #[prost(string, tag = "5")]
    pub msn: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExtendedFlightInfo {
    #[prost(uint32, tag = "1")]
    pub flightid: u32,
    #[prost(float, tag = "2")]
    pub lat: f32,
    #[prost(float, tag = "3")]
    pub lon: f32,
    #[prost(int32, tag = "4")]
    pub track: i32,
    #[prost(int32, tag = "5")]
    pub alt: i32,
    #[prost(int32, tag = "6")]
    pub speed: i32,
    #[prost(int32, tag = "7")]
    pub status: i32,
    #[prost(uint64, tag = "8")]
    pub timestamp_ms: u64,
    #[prost(bool, tag = "9")]
    pub on_ground: bool,
    #[prost(string, tag = "10")]
    pub callsign: String,
    #[prost(enumeration = "DataSource", tag = "11")]
    pub source: i32,
    #[prost(uint32, tag = "12")]
    pub squawk: u32,
    #[prost(int32, tag = "13")]
    pub vspeed: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScheduleInfo {
    #[prost(string, tag = "1")]
    pub flight_number: String,
    #[prost(uint32, tag = "2")]
    pub operated_by_id: u32,
    #[prost(uint32, tag = "3")]
    pub painted_as_id: u32,
    #[prost(uint32, tag = "4")]
    pub origin_id: u32,
    #[prost(uint32, tag = "5")]
    pub destination_id: u32,
    #[prost(uint32, tag = "6")]
    pub diverted_to_id: u32,
    #[prost(uint32, tag = "7")]
    pub scheduled_departure: u32,
    #[prost(uint32, tag = "8")]
    pub scheduled_arrival: u32,
    #[prost(uint32, tag = "9")]
    pub actual_departure: u32,
    #[prost(uint32, tag = "10")]
    pub actual_arrival: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FlightProgress {
    #[prost(uint32, tag = "1")]
    pub traversed_distance: u32,
    #[prost(uint32, tag = "2")]
    pub remaining_distance: u32,
    #[prost(uint32, tag = "3")]
    pub elapsed_time: u32,
    #[prost(uint32, tag = "4")]
    pub remaining_time: u32,
    #[prost(uint32, tag = "5")]
    pub eta: u32,
    #[prost(uint32, tag = "6")]
    pub great_circle_distance: u32,
    #[prost(uint32, tag = "7")]
    pub progress_pct: u32,
}

// === LiveFeed / Playback ===

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LiveFeedRequest {
    #[prost(message, optional, tag = "1")]
    pub bounds: Option<LocationBoundaries>,
    #[prost(message, optional, tag = "2")]
    pub settings: Option<VisibilitySettings>,
    #[prost(bool, optional, tag = "5")]
    pub highlight_mode: Option<bool>,
    #[prost(bool, optional, tag = "6")]
    pub stats: Option<bool>,
    #[prost(int32, optional, tag = "7")]
    pub limit: Option<i32>,
    #[prost(int32, optional, tag = "8")]
    pub maxage: Option<i32>,
    #[prost(enumeration = "RestrictionVisibility", optional, tag = "9")]
    pub restriction_mode: Option<i32>,
    #[prost(message, optional, tag = "10")]
    pub field_mask: Option<FieldMask>,
    #[prost(uint32, repeated, tag = "11")]
    pub selected_flight_ids: Vec<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LiveFeedResponse {
    #[prost(message, repeated, tag = "1")]
    pub flights_list: Vec<Flight>,
    #[prost(message, repeated, tag = "3")]
    pub selected_flight_info: Vec<Flight>,
    #[prost(uint64, tag = "4")]
    pub server_time_ms: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlaybackRequest {
    #[prost(message, optional, tag = "1")]
    pub live_feed_request: Option<LiveFeedRequest>,
    #[prost(uint32, tag = "2")]
    pub timestamp: u32,
    #[prost(uint32, tag = "3")]
    pub prefetch: u32,
    #[prost(uint32, optional, tag = "4")]
    pub hfreq: Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlaybackResponse {
    #[prost(message, optional, tag = "1")]
    pub live_feed_response: Option<LiveFeedResponse>,
}

// === NearestFlights ===

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NearestFlightsRequest {
    #[prost(message, optional, tag = "1")]
    pub location: Option<Geolocation>,
    #[prost(uint32, tag = "2")]
    pub radius: u32,
    #[prost(uint32, tag = "3")]
    pub limit: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NearestFlight {
    #[prost(message, optional, tag = "1")]
    pub flight: Option<Flight>,
    /// Distance from the query point, metres.
    #[prost(uint32, tag = "2")]
    pub distance: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NearestFlightsResponse {
    #[prost(message, repeated, tag = "1")]
    pub flights_list: Vec<NearestFlight>,
}

// === LiveFlightsStatus ===

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LiveFlightsStatusRequest {
    #[prost(uint32, repeated, tag = "1")]
    pub flight_ids_list: Vec<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LiveFlightStatusData {
    #[prost(float, tag = "1")]
    pub lat: f32,
    #[prost(float, tag = "2")]
    pub lon: f32,
    #[prost(int32, tag = "3")]
    pub status: i32,
    #[prost(uint32, tag = "4")]
    pub squawk: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LiveFlightStatus {
    #[prost(uint32, tag = "1")]
    pub flight_id: u32,
    #[prost(message, optional, tag = "2")]
    pub data: Option<LiveFlightStatusData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LiveFlightsStatusResponse {
    #[prost(message, repeated, tag = "1")]
    pub flights_map: Vec<LiveFlightStatus>,
}

// === FlightDetails / FollowFlight / PlaybackFlight ===

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FlightDetailsRequest {
    #[prost(uint32, tag = "1")]
    pub flight_id: u32,
    #[prost(enumeration = "RestrictionVisibility", tag = "2")]
    pub restriction_mode: i32,
    #[prost(bool, tag = "3")]
    pub verbose: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FlightDetailsResponse {
    #[prost(message, optional, tag = "1")]
    pub aircraft_info: Option<AircraftInfo>,
    #[prost(message, optional, tag = "3")]
    pub flight_info: Option<ExtendedFlightInfo>,
    #[prost(message, optional, tag = "4")]
    pub schedule_info: Option<ScheduleInfo>,
    #[prost(message, optional, tag = "5")]
    pub flight_progress: Option<FlightProgress>,
    #[prost(message, repeated, tag = "6")]
    pub flight_trail_list: Vec<TrailPoint>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FollowFlightRequest {
    #[prost(uint32, tag = "1")]
    pub flight_id: u32,
    #[prost(enumeration = "RestrictionVisibility", tag = "2")]
    pub restriction_mode: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FollowFlightResponse {
    #[prost(message, optional, tag = "1")]
    pub aircraft_info: Option<AircraftInfo>,
    #[prost(message, optional, tag = "3")]
    pub flight_info: Option<ExtendedFlightInfo>,
    #[prost(message, optional, tag = "4")]
    pub schedule_info: Option<ScheduleInfo>,
    #[prost(message, optional, tag = "5")]
    pub flight_progress: Option<FlightProgress>,
    #[prost(message, repeated, tag = "6")]
    pub flight_trail_list: Vec<TrailPoint>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlaybackFlightRequest {
    #[prost(uint32, tag = "1")]
    pub flight_id: u32,
    #[prost(uint64, tag = "2")]
    pub timestamp: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlaybackFlightResponse {
    #[prost(message, optional, tag = "1")]
    pub aircraft_info: Option<AircraftInfo>,
    #[prost(message, optional, tag = "2")]
    pub schedule_info: Option<ScheduleInfo>,
    #[prost(message, repeated, tag = "3")]
    pub flight_trail_list: Vec<TrailPoint>,
}

// === TopFlights ===

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TopFlightsRequest {
    #[prost(uint32, tag = "1")]
    pub limit: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FollowedFlight {
    #[prost(uint32, tag = "1")]
    pub flight_id: u32,
    #[prost(uint32, tag = "2")]
    pub live_clicks: u32,
    #[prost(uint32, tag = "3")]
    pub total_clicks: u32,
    #[prost(string, tag = "4")]
    pub flight_number: String,
    #[prost(string, tag = "5")]
    pub callsign: String,
    #[prost(uint32, tag = "6")]
    pub squawk: u32,
    #[prost(string, tag = "7")]
    pub from_iata: String,
    #[prost(string, tag = "8")]
    pub from_city: String,
    #[prost(string, tag = "9")]
    pub to_iata: String,
    #[prost(string, tag = "10")]
    pub to_city: String,
    #[prost(string, tag = "11")]
    pub r#type: String,
    #[prost(string, tag = "12")]
    pub full_description: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TopFlightsResponse {
    #[prost(message, repeated, tag = "1")]
    pub scoreboard_list: Vec<FollowedFlight>,
}

// === LiveTrail / HistoricTrail ===

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LiveTrailRequest {
    #[prost(uint32, tag = "1")]
    pub flight_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LiveTrailResponse {
    #[prost(message, repeated, tag = "1")]
    pub radar_records_list: Vec<TrailPoint>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HistoricTrailRequest {
    #[prost(uint32, tag = "1")]
    pub flight_id: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HistoricTrailResponse {
    #[prost(message, repeated, tag = "1")]
    pub radar_records_list: Vec<TrailPoint>,
}

//! Request parameters, field masks and HTTP envelopes.
//!
//! Builders here are pure: they turn a parameter value into a wire message and
//! then into an [`Envelope`] ready to send. Nothing in this module performs I/O
//! or reads the clock.

use crate::proto::{self, FieldMask};
use crate::protocol;
use bytes::Bytes;
use prost::Message;
use rand::{distr::Alphanumeric, Rng};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CACHE_CONTROL,
    CONTENT_TYPE, ORIGIN, PRAGMA, REFERER, TE, USER_AGENT,
};
use reqwest::Method;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub const DEFAULT_SERVICE_ROOT: &str = "https://data-feed.flightradar24.com";
pub const FEED_SERVICE: &str = "fr24.feed.api.v1.Feed";
pub const GRPC_WEB_CONTENT_TYPE: &str = "application/grpc-web+proto";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEVICE_ID_HEADER: &str = "fr24-device-id";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid bounding box: north {north} must be greater than south {south}")]
    InvalidBounds { north: f64, south: f64 },
    #[error("Invalid location: lat {lat}, lon {lon}")]
    InvalidLocation { lat: f64, lon: f64 },
    #[error("Fields not permitted without authentication: {0:?}")]
    FieldNotPermitted(Vec<LiveFeedField>),
    #[error("Unknown live feed field: {0:?}")]
    UnknownField(String),
    #[error("Invalid value for header {name}")]
    InvalidHeader { name: &'static str },
    #[error("Invalid flight id: {0:?}")]
    InvalidFlightId(String),
}

// === Geometry ===

/// Geographic rectangle used to filter the live feed.
///
/// East and west are kept exactly as given; a box with `west > east` crosses
/// the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Global bounding box covering the entire world.
    pub const GLOBAL: Self = Self {
        north: 90.0,
        south: -90.0,
        west: -180.0,
        east: 180.0,
    };

    /// French upper information region, the default live feed area.
    pub const FRANCE_UIR: Self = Self {
        north: 52.0,
        south: 42.0,
        west: -8.0,
        east: 10.0,
    };

    /// Checked box. Fails unless `north > south`.
    pub fn new(north: f64, south: f64, west: f64, east: f64) -> Result<Self, BuildError> {
        let bbox = Self {
            north,
            south,
            west,
            east,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.north > self.south {
            Ok(())
        } else {
            Err(BuildError::InvalidBounds {
                north: self.north,
                south: self.south,
            })
        }
    }

    /// Longitudinal extent in degrees, accounting for antimeridian wrap.
    pub fn width(&self) -> f64 {
        if self.east >= self.west {
            self.east - self.west
        } else {
            self.east + 360.0 - self.west
        }
    }

    /// Split into a `rows` x `cols` grid, north-west tile first.
    ///
    /// Used to fan a large area out over several requests. Tile edges that run
    /// past 180 degrees are wrapped back into range.
    pub fn tiles(&self, rows: usize, cols: usize) -> Vec<BoundingBox> {
        if rows == 0 || cols == 0 {
            return Vec::new();
        }

        let lat_step = (self.north - self.south) / rows as f64;
        let lon_step = self.width() / cols as f64;
        let wrap = |lon: f64| if lon > 180.0 { lon - 360.0 } else { lon };

        let mut tiles = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            let north = self.north - lat_step * r as f64;
            let south = if r + 1 == rows {
                self.south
            } else {
                self.north - lat_step * (r + 1) as f64
            };
            for c in 0..cols {
                let west = wrap(self.west + lon_step * c as f64);
                let east = if c + 1 == cols {
                    self.east
                } else {
                    wrap(self.west + lon_step * (c + 1) as f64)
                };
                tiles.push(BoundingBox {
                    north,
                    south,
                    west,
                    east,
                });
            }
        }
        tiles
    }

    fn to_proto(self) -> proto::LocationBoundaries {
        proto::LocationBoundaries {
            north: self.north as f32,
            south: self.south as f32,
            west: self.west as f32,
            east: self.east as f32,
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::FRANCE_UIR
    }
}

// === Identifiers ===

/// Flight identifier as used by the feed. Text form is hexadecimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlightId(pub u32);

impl From<u32> for FlightId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl FromStr for FlightId {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        u32::from_str_radix(hex, 16)
            .map(Self)
            .map_err(|_| BuildError::InvalidFlightId(s.to_string()))
    }
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

// === Credentials and field masks ===

/// Opaque credential. Only its presence and its header value matter here.
#[derive(Clone)]
pub struct Credential {
    header: HeaderValue,
}

impl Credential {
    /// `authorization: Bearer <token>`.
    pub fn bearer(token: &str) -> Result<Self, BuildError> {
        Self::raw(&format!("Bearer {}", token))
    }

    /// Use `value` verbatim as the authorization header.
    pub fn raw(value: &str) -> Result<Self, BuildError> {
        let mut header = HeaderValue::from_str(value).map_err(|_| BuildError::InvalidHeader {
            name: "authorization",
        })?;
        header.set_sensitive(true);
        Ok(Self { header })
    }

    pub fn header_value(&self) -> &HeaderValue {
        &self.header
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTier {
    Anonymous,
    Authenticated,
}

impl AuthTier {
    pub fn of(credential: Option<&Credential>) -> Self {
        match credential {
            Some(_) => Self::Authenticated,
            None => Self::Anonymous,
        }
    }

    pub fn permits(self, field: LiveFeedField) -> bool {
        match self {
            Self::Authenticated => true,
            Self::Anonymous => LiveFeedField::BASELINE.contains(&field),
        }
    }
}

/// Optional per-flight fields the live feed can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LiveFeedField {
    Flight,
    Reg,
    Route,
    Type,
    Squawk,
    Vspeed,
    Airspace,
    LogoId,
    Age,
}

impl LiveFeedField {
    /// Requested when the caller selects nothing; also the anonymous ceiling.
    pub const BASELINE: [LiveFeedField; 4] = [Self::Flight, Self::Reg, Self::Route, Self::Type];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::Reg => "reg",
            Self::Route => "route",
            Self::Type => "type",
            Self::Squawk => "squawk",
            Self::Vspeed => "vspeed",
            Self::Airspace => "airspace",
            Self::LogoId => "logo_id",
            Self::Age => "age",
        }
    }
}

impl fmt::Display for LiveFeedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LiveFeedField {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "flight" => Self::Flight,
            "reg" => Self::Reg,
            "route" => Self::Route,
            "type" => Self::Type,
            "squawk" => Self::Squawk,
            "vspeed" => Self::Vspeed,
            "airspace" => Self::Airspace,
            "logo_id" => Self::LogoId,
            "age" => Self::Age,
            other => return Err(BuildError::UnknownField(other.to_string())),
        })
    }
}

/// What to do when an anonymous caller asks for fields above its tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldMaskPolicy {
    /// Fail the build with [`BuildError::FieldNotPermitted`].
    #[default]
    Reject,
    /// Silently drop the fields the tier does not allow.
    Clip,
}

/// Resolve a field selection into the mask paths sent on the wire.
pub fn resolve_field_mask(
    fields: &BTreeSet<LiveFeedField>,
    tier: AuthTier,
    policy: FieldMaskPolicy,
) -> Result<Vec<LiveFeedField>, BuildError> {
    if fields.is_empty() {
        return Ok(LiveFeedField::BASELINE.to_vec());
    }

    let (allowed, denied): (Vec<_>, Vec<_>) = fields.iter().copied().partition(|f| tier.permits(*f));
    if denied.is_empty() {
        return Ok(allowed);
    }

    match policy {
        FieldMaskPolicy::Reject => Err(BuildError::FieldNotPermitted(denied)),
        FieldMaskPolicy::Clip if allowed.is_empty() => Ok(LiveFeedField::BASELINE.to_vec()),
        FieldMaskPolicy::Clip => {
            tracing::debug!(?denied, "Clipping live feed fields for anonymous caller");
            Ok(allowed)
        }
    }
}

/// Everything a builder needs besides its own parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildContext<'a> {
    pub credential: Option<&'a Credential>,
    pub field_mask_policy: FieldMaskPolicy,
}

impl<'a> BuildContext<'a> {
    /// Context for builds made under `credential`.
    pub fn new(credential: Option<&'a Credential>, field_mask_policy: FieldMaskPolicy) -> Self {
        Self {
            credential,
            field_mask_policy,
        }
    }

    pub fn tier(&self) -> AuthTier {
        AuthTier::of(self.credential)
    }
}

// === Envelope ===

/// Service methods exposed by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    LiveFeed,
    Playback,
    NearestFlights,
    LiveFlightsStatus,
    FlightDetails,
    PlaybackFlight,
    FollowFlight,
    TopFlights,
    LiveTrail,
    HistoricTrail,
}

impl RpcMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LiveFeed => "LiveFeed",
            Self::Playback => "Playback",
            Self::NearestFlights => "NearestFlights",
            Self::LiveFlightsStatus => "LiveFlightsStatus",
            Self::FlightDetails => "FlightDetails",
            Self::PlaybackFlight => "PlaybackFlight",
            Self::FollowFlight => "FollowFlight",
            Self::TopFlights => "TopFlights",
            Self::LiveTrail => "LiveTrail",
            Self::HistoricTrail => "HistoricTrail",
        }
    }

    /// Whether the service answers with a stream of frames.
    pub fn is_streaming(self) -> bool {
        matches!(self, Self::FollowFlight)
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where requests go and how the client identifies itself.
#[derive(Debug, Clone)]
pub struct ServiceTarget {
    root: String,
    service: String,
    device_id: HeaderValue,
    user_agent: HeaderValue,
}

impl ServiceTarget {
    /// Target `root` with the feed service and a freshly generated device id.
    pub fn new(root: impl Into<String>) -> Self {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let device_id = HeaderValue::from_str(&format!("web-{}", suffix))
            .unwrap_or_else(|_| HeaderValue::from_static("web"));

        Self {
            root: root.into().trim_end_matches('/').to_string(),
            service: FEED_SERVICE.to_string(),
            device_id,
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
        }
    }

    /// Override the fully qualified service name.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Pin the device id. Fails when it is not a valid header value.
    pub fn with_device_id(mut self, device_id: &str) -> Result<Self, BuildError> {
        self.device_id = HeaderValue::from_str(device_id).map_err(|_| BuildError::InvalidHeader {
            name: DEVICE_ID_HEADER,
        })?;
        Ok(self)
    }

    /// Fails when `user_agent` is not a valid header value.
    pub fn with_user_agent(mut self, user_agent: &str) -> Result<Self, BuildError> {
        self.user_agent = HeaderValue::from_str(user_agent)
            .map_err(|_| BuildError::InvalidHeader { name: "user-agent" })?;
        Ok(self)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// `<root>/<package>.<Service>/<Method>`
    pub fn url(&self, rpc: RpcMethod) -> String {
        format!("{}/{}/{}", self.root, self.service, rpc.as_str())
    }

    fn headers(&self, credential: Option<&Credential>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-GB,en-US;q=0.9,en;q=0.8"),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://www.flightradar24.com"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.flightradar24.com/"));
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(GRPC_WEB_CONTENT_TYPE));
        headers.insert(TE, HeaderValue::from_static("trailers"));
        headers.insert(
            HeaderName::from_static("x-envoy-retry-grpc-on"),
            HeaderValue::from_static("unavailable"),
        );
        headers.insert(
            HeaderName::from_static("x-user-agent"),
            HeaderValue::from_static("grpc-web-javascript/0.1"),
        );
        headers.insert(HeaderName::from_static("x-grpc-web"), HeaderValue::from_static("1"));
        headers.insert(HeaderName::from_static(DEVICE_ID_HEADER), self.device_id.clone());

        if let Some(credential) = credential {
            headers.insert(AUTHORIZATION, credential.header_value().clone());
        }

        headers
    }
}

impl Default for ServiceTarget {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_ROOT)
    }
}

/// A fully built HTTP request for one RPC.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub rpc: RpcMethod,
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Envelope {
    pub fn new<M: Message>(
        target: &ServiceTarget,
        rpc: RpcMethod,
        message: &M,
        credential: Option<&Credential>,
    ) -> Self {
        Self {
            rpc,
            method: Method::POST,
            url: target.url(rpc),
            headers: target.headers(credential),
            body: protocol::encode(message),
        }
    }
}

// === Parameters ===

/// A parameter object for one RPC.
pub trait RpcParams {
    const METHOD: RpcMethod;
    type Request: Message;
    type Response: Message + Default;

    fn to_message(&self, ctx: &BuildContext<'_>) -> Result<Self::Request, BuildError>;

    fn build(
        &self,
        target: &ServiceTarget,
        ctx: &BuildContext<'_>,
    ) -> Result<Envelope, BuildError> {
        let message = self.to_message(ctx)?;
        Ok(Envelope::new(target, Self::METHOD, &message, ctx.credential))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveFeedParams {
    pub bounding_box: BoundingBox,
    /// Include per-source statistics for the area.
    pub stats: bool,
    /// Maximum number of flights; 1500 anonymous, 2000 authenticated.
    pub limit: u32,
    /// Maximum time since last update, seconds.
    pub maxage: u32,
    /// Optional fields to populate. Empty means the baseline set.
    pub fields: BTreeSet<LiveFeedField>,
}

impl Default for LiveFeedParams {
    fn default() -> Self {
        Self {
            bounding_box: BoundingBox::FRANCE_UIR,
            stats: false,
            limit: 1500,
            maxage: 14400,
            fields: LiveFeedField::BASELINE.into_iter().collect(),
        }
    }
}

impl LiveFeedParams {
    /// Baseline fields, limit and max age over `bounding_box`.
    pub fn new(bounding_box: BoundingBox) -> Self {
        Self {
            bounding_box,
            ..Default::default()
        }
    }

    /// Replace the field selection. An empty selection means the baseline.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = LiveFeedField>) -> Self {
        self.fields = fields.into_iter().collect();
        self
    }

    /// Maximum number of flights returned.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

impl RpcParams for LiveFeedParams {
    const METHOD: RpcMethod = RpcMethod::LiveFeed;
    type Request = proto::LiveFeedRequest;
    type Response = proto::LiveFeedResponse;

    fn to_message(&self, ctx: &BuildContext<'_>) -> Result<Self::Request, BuildError> {
        self.bounding_box.validate()?;
        let fields = resolve_field_mask(&self.fields, ctx.tier(), ctx.field_mask_policy)?;

        Ok(proto::LiveFeedRequest {
            bounds: Some(self.bounding_box.to_proto()),
            settings: Some(proto::VisibilitySettings {
                sources_list: proto::DataSource::ALL.iter().map(|s| *s as i32).collect(),
                services_list: proto::Service::ALL.iter().map(|s| *s as i32).collect(),
                traffic_type: proto::TrafficType::All as i32,
                only_restricted: Some(false),
            }),
            highlight_mode: Some(false),
            stats: Some(self.stats),
            limit: Some(self.limit as i32),
            maxage: Some(self.maxage as i32),
            restriction_mode: Some(proto::RestrictionVisibility::NotVisible as i32),
            field_mask: Some(FieldMask {
                paths: fields.iter().map(|f| f.as_str().to_string()).collect(),
            }),
            selected_flight_ids: Vec::new(),
        })
    }
}

/// Live feed as it was at `timestamp`, built on an embedded [`LiveFeedParams`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackParams {
    pub live_feed: LiveFeedParams,
    /// Start of the window, unix seconds.
    pub timestamp: u32,
    /// Prefetch length in seconds, `floor(7.5 * multiplier)`; 7 for 1x playback.
    pub duration: u32,
    /// High frequency mode.
    pub hfreq: Option<u32>,
}

impl PlaybackParams {
    /// Window starting at `timestamp` with the 1x prefetch of 7 seconds.
    pub fn new(live_feed: LiveFeedParams, timestamp: u32) -> Self {
        Self {
            live_feed,
            timestamp,
            duration: 7,
            hfreq: None,
        }
    }

    /// Window of `duration` seconds ending at the current time.
    ///
    /// Reads the system clock once. The prefetch end never lies in the future.
    pub fn starting_now(live_feed: LiveFeedParams, duration: u32) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or_default();
        Self::new(live_feed, now.saturating_sub(duration)).with_duration(duration)
    }

    /// Seconds past `timestamp` the server prefetches.
    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }
}

impl RpcParams for PlaybackParams {
    const METHOD: RpcMethod = RpcMethod::Playback;
    type Request = proto::PlaybackRequest;
    type Response = proto::PlaybackResponse;

    fn to_message(&self, ctx: &BuildContext<'_>) -> Result<Self::Request, BuildError> {
        Ok(proto::PlaybackRequest {
            live_feed_request: Some(self.live_feed.to_message(ctx)?),
            timestamp: self.timestamp,
            prefetch: self.timestamp.saturating_add(self.duration),
            hfreq: self.hfreq,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearestFlightsParams {
    pub lat: f64,
    pub lon: f64,
    /// Search radius, metres.
    pub radius: u32,
    pub limit: u32,
}

impl NearestFlightsParams {
    /// Search within 10 km of a point, up to 1500 flights.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            radius: 10_000,
            limit: 1500,
        }
    }
}

impl RpcParams for NearestFlightsParams {
    const METHOD: RpcMethod = RpcMethod::NearestFlights;
    type Request = proto::NearestFlightsRequest;
    type Response = proto::NearestFlightsResponse;

    fn to_message(&self, _ctx: &BuildContext<'_>) -> Result<Self::Request, BuildError> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(BuildError::InvalidLocation {
                lat: self.lat,
                lon: self.lon,
            });
        }
        Ok(proto::NearestFlightsRequest {
            location: Some(proto::Geolocation {
                lat: self.lat,
                lon: self.lon,
            }),
            radius: self.radius,
            limit: self.limit,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveFlightsStatusParams {
    pub flight_ids: Vec<FlightId>,
}

impl RpcParams for LiveFlightsStatusParams {
    const METHOD: RpcMethod = RpcMethod::LiveFlightsStatus;
    type Request = proto::LiveFlightsStatusRequest;
    type Response = proto::LiveFlightsStatusResponse;

    fn to_message(&self, _ctx: &BuildContext<'_>) -> Result<Self::Request, BuildError> {
        Ok(proto::LiveFlightsStatusRequest {
            flight_ids_list: self.flight_ids.iter().map(|id| id.0).collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightDetailsParams {
    pub flight_id: FlightId,
    pub restriction_mode: proto::RestrictionVisibility,
    /// Include the full trail.
    pub verbose: bool,
}

impl FlightDetailsParams {
    /// Verbose details for `flight_id`, restricted flights hidden.
    pub fn new(flight_id: impl Into<FlightId>) -> Self {
        Self {
            flight_id: flight_id.into(),
            restriction_mode: proto::RestrictionVisibility::NotVisible,
            verbose: true,
        }
    }
}

impl RpcParams for FlightDetailsParams {
    const METHOD: RpcMethod = RpcMethod::FlightDetails;
    type Request = proto::FlightDetailsRequest;
    type Response = proto::FlightDetailsResponse;

    fn to_message(&self, _ctx: &BuildContext<'_>) -> Result<Self::Request, BuildError> {
        Ok(proto::FlightDetailsRequest {
            flight_id: self.flight_id.0,
            restriction_mode: self.restriction_mode as i32,
            verbose: self.verbose,
        })
    }
}

/// Trail of a past flight starting at `timestamp` (unix seconds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackFlightParams {
    pub flight_id: FlightId,
    pub timestamp: u64,
}

impl RpcParams for PlaybackFlightParams {
    const METHOD: RpcMethod = RpcMethod::PlaybackFlight;
    type Request = proto::PlaybackFlightRequest;
    type Response = proto::PlaybackFlightResponse;

    fn to_message(&self, _ctx: &BuildContext<'_>) -> Result<Self::Request, BuildError> {
        Ok(proto::PlaybackFlightRequest {
            flight_id: self.flight_id.0,
            timestamp: self.timestamp,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowFlightParams {
    pub flight_id: FlightId,
    pub restriction_mode: proto::RestrictionVisibility,
}

impl FollowFlightParams {
    /// Follow `flight_id`, restricted flights hidden.
    pub fn new(flight_id: impl Into<FlightId>) -> Self {
        Self {
            flight_id: flight_id.into(),
            restriction_mode: proto::RestrictionVisibility::NotVisible,
        }
    }
}

impl RpcParams for FollowFlightParams {
    const METHOD: RpcMethod = RpcMethod::FollowFlight;
    type Request = proto::FollowFlightRequest;
    type Response = proto::FollowFlightResponse;

    fn to_message(&self, _ctx: &BuildContext<'_>) -> Result<Self::Request, BuildError> {
        Ok(proto::FollowFlightRequest {
            flight_id: self.flight_id.0,
            restriction_mode: self.restriction_mode as i32,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopFlightsParams {
    pub limit: u32,
}

impl Default for TopFlightsParams {
    fn default() -> Self {
        Self { limit: 10 }
    }
}

impl RpcParams for TopFlightsParams {
    const METHOD: RpcMethod = RpcMethod::TopFlights;
    type Request = proto::TopFlightsRequest;
    type Response = proto::TopFlightsResponse;

    fn to_message(&self, _ctx: &BuildContext<'_>) -> Result<Self::Request, BuildError> {
        Ok(proto::TopFlightsRequest { limit: self.limit })
    }
}

/// Unstable upstream: the service often answers with an empty body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveTrailParams {
    pub flight_id: FlightId,
}

impl RpcParams for LiveTrailParams {
    const METHOD: RpcMethod = RpcMethod::LiveTrail;
    type Request = proto::LiveTrailRequest;
    type Response = proto::LiveTrailResponse;

    fn to_message(&self, _ctx: &BuildContext<'_>) -> Result<Self::Request, BuildError> {
        Ok(proto::LiveTrailRequest {
            flight_id: self.flight_id.0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricTrailParams {
    pub flight_id: FlightId,
}

impl RpcParams for HistoricTrailParams {
    const METHOD: RpcMethod = RpcMethod::HistoricTrail;
    type Request = proto::HistoricTrailRequest;
    type Response = proto::HistoricTrailResponse;

    fn to_message(&self, _ctx: &BuildContext<'_>) -> Result<Self::Request, BuildError> {
        Ok(proto::HistoricTrailRequest {
            flight_id: self.flight_id.0,
        })
    }
}

/// Any supported request, for callers that mix RPCs in one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestParams {
    LiveFeed(LiveFeedParams),
    Playback(PlaybackParams),
    NearestFlights(NearestFlightsParams),
    FlightDetails(FlightDetailsParams),
    LiveFlightsStatus(LiveFlightsStatusParams),
    FollowFlight(FollowFlightParams),
    TopFlights(TopFlightsParams),
    LiveTrail(LiveTrailParams),
    HistoricTrail(HistoricTrailParams),
    PlaybackFlight(PlaybackFlightParams),
}

impl RequestParams {
    pub fn method(&self) -> RpcMethod {
        match self {
            Self::LiveFeed(_) => LiveFeedParams::METHOD,
            Self::Playback(_) => PlaybackParams::METHOD,
            Self::NearestFlights(_) => NearestFlightsParams::METHOD,
            Self::FlightDetails(_) => FlightDetailsParams::METHOD,
            Self::LiveFlightsStatus(_) => LiveFlightsStatusParams::METHOD,
            Self::FollowFlight(_) => FollowFlightParams::METHOD,
            Self::TopFlights(_) => TopFlightsParams::METHOD,
            Self::LiveTrail(_) => LiveTrailParams::METHOD,
            Self::HistoricTrail(_) => HistoricTrailParams::METHOD,
            Self::PlaybackFlight(_) => PlaybackFlightParams::METHOD,
        }
    }

    pub fn build(
        &self,
        target: &ServiceTarget,
        ctx: &BuildContext<'_>,
    ) -> Result<Envelope, BuildError> {
        match self {
            Self::LiveFeed(p) => p.build(target, ctx),
            Self::Playback(p) => p.build(target, ctx),
            Self::NearestFlights(p) => p.build(target, ctx),
            Self::FlightDetails(p) => p.build(target, ctx),
            Self::LiveFlightsStatus(p) => p.build(target, ctx),
            Self::FollowFlight(p) => p.build(target, ctx),
            Self::TopFlights(p) => p.build(target, ctx),
            Self::LiveTrail(p) => p.build(target, ctx),
            Self::HistoricTrail(p) => p.build(target, ctx),
            Self::PlaybackFlight(p) => p.build(target, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{LiveFeedRequest, PlaybackRequest};

    fn target() -> ServiceTarget {
        ServiceTarget::default().with_device_id("web-test").unwrap()
    }

    fn paths(req: &LiveFeedRequest) -> Vec<String> {
        req.field_mask.clone().unwrap_or_default().paths
    }

    #[test]
    fn test_bounding_box_invariant() {
        assert!(BoundingBox::new(52.0, 42.0, -8.0, 10.0).is_ok());
        assert!(matches!(
            BoundingBox::new(42.0, 52.0, -8.0, 10.0),
            Err(BuildError::InvalidBounds { .. })
        ));
        // Antimeridian crossing is stored as given.
        let pacific = BoundingBox::new(10.0, -10.0, 170.0, -170.0).unwrap();
        assert_eq!(pacific.west, 170.0);
        assert_eq!(pacific.width(), 20.0);
    }

    #[test]
    fn test_global_tiles() {
        let tiles = BoundingBox::GLOBAL.tiles(2, 2);
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles[0], BoundingBox::new(90.0, 0.0, -180.0, 0.0).unwrap());
        assert_eq!(tiles[3], BoundingBox::new(0.0, -90.0, 0.0, 180.0).unwrap());
        assert!(BoundingBox::GLOBAL.tiles(0, 3).is_empty());
    }

    #[test]
    fn test_tiles_across_antimeridian() {
        let pacific = BoundingBox::new(10.0, -10.0, 170.0, -170.0).unwrap();
        let tiles = pacific.tiles(1, 2);
        assert_eq!(tiles[0].west, 170.0);
        assert_eq!(tiles[0].east, 180.0);
        assert_eq!(tiles[1].west, 180.0);
        assert_eq!(tiles[1].east, -170.0);
    }

    #[test]
    fn test_flight_id_parsing() {
        assert_eq!("2f4b1c9a".parse::<FlightId>().unwrap(), FlightId(0x2f4b1c9a));
        assert_eq!("0x2F4B1C9A".parse::<FlightId>().unwrap(), FlightId(0x2f4b1c9a));
        assert!("not-hex".parse::<FlightId>().is_err());
        assert_eq!(FlightId(0xab).to_string(), "000000ab");
    }

    #[test]
    fn test_envelope_url_and_headers() {
        let env = LiveFeedParams::default()
            .build(&target(), &BuildContext::default())
            .unwrap();
        assert_eq!(env.method, Method::POST);
        assert_eq!(
            env.url,
            "https://data-feed.flightradar24.com/fr24.feed.api.v1.Feed/LiveFeed"
        );
        assert_eq!(env.headers[CONTENT_TYPE], GRPC_WEB_CONTENT_TYPE);
        assert_eq!(env.headers[DEVICE_ID_HEADER], "web-test");
        assert!(env.headers.get(AUTHORIZATION).is_none());
        assert_eq!(env.body[0], protocol::FLAG_DATA);
    }

    #[test]
    fn test_envelope_with_credential() {
        let credential = Credential::bearer("abc").unwrap();
        let ctx = BuildContext::new(Some(&credential), FieldMaskPolicy::Reject);
        let env = TopFlightsParams::default().build(&target(), &ctx).unwrap();
        assert_eq!(env.headers[AUTHORIZATION], "Bearer abc");
        assert!(env.headers[AUTHORIZATION].is_sensitive());
        assert!(env.url.ends_with("/TopFlights"));
    }

    #[test]
    fn test_builders_are_deterministic() {
        let params = LiveFeedParams::new(BoundingBox::GLOBAL);
        let ctx = BuildContext::default();
        let t = target();
        let a = params.build(&t, &ctx).unwrap();
        let b = params.build(&t, &ctx).unwrap();
        assert_eq!(a.body, b.body);
        assert_eq!(a.headers, b.headers);
    }

    #[test]
    fn test_empty_fields_use_baseline() {
        let params = LiveFeedParams::default().with_fields(std::iter::empty());
        let req = params.to_message(&BuildContext::default()).unwrap();
        assert_eq!(paths(&req), vec!["flight", "reg", "route", "type"]);
    }

    #[test]
    fn test_anonymous_over_selection_rejected() {
        let params = LiveFeedParams::default().with_fields([
            LiveFeedField::Flight,
            LiveFeedField::Squawk,
            LiveFeedField::Vspeed,
        ]);
        let ctx = BuildContext::new(None, FieldMaskPolicy::Reject);
        match params.to_message(&ctx) {
            Err(BuildError::FieldNotPermitted(denied)) => {
                assert_eq!(denied, vec![LiveFeedField::Squawk, LiveFeedField::Vspeed]);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_anonymous_over_selection_clipped() {
        let params = LiveFeedParams::default().with_fields([
            LiveFeedField::Flight,
            LiveFeedField::Route,
            LiveFeedField::Squawk,
            LiveFeedField::Age,
        ]);
        let ctx = BuildContext::new(None, FieldMaskPolicy::Clip);
        let req = params.to_message(&ctx).unwrap();
        assert_eq!(paths(&req), vec!["flight", "route"]);

        // Clipping everything falls back to the baseline.
        let only_extra = LiveFeedParams::default().with_fields([LiveFeedField::Squawk]);
        let req = only_extra.to_message(&ctx).unwrap();
        assert_eq!(paths(&req), vec!["flight", "reg", "route", "type"]);
    }

    #[test]
    fn test_authenticated_fields_pass() {
        let credential = Credential::bearer("t").unwrap();
        let params = LiveFeedParams::default().with_fields([
            LiveFeedField::Squawk,
            LiveFeedField::Vspeed,
            LiveFeedField::LogoId,
        ]);
        let req = params
            .to_message(&BuildContext::new(Some(&credential), FieldMaskPolicy::Reject))
            .unwrap();
        assert_eq!(paths(&req), vec!["squawk", "vspeed", "logo_id"]);
    }

    #[test]
    fn test_live_feed_defaults() {
        let req = LiveFeedParams::default()
            .to_message(&BuildContext::default())
            .unwrap();
        let settings = req.settings.unwrap();
        assert_eq!(settings.sources_list, (0..10).collect::<Vec<_>>());
        assert_eq!(settings.services_list, (0..12).collect::<Vec<_>>());
        assert_eq!(req.limit, Some(1500));
        assert_eq!(req.maxage, Some(14400));
        assert_eq!(req.bounds.unwrap().north, 52.0);
    }

    #[test]
    fn test_playback_embeds_live_feed() {
        let live = LiveFeedParams::new(BoundingBox::GLOBAL);
        let params = PlaybackParams::new(live.clone(), 1_700_000_000);
        let req: PlaybackRequest = params.to_message(&BuildContext::default()).unwrap();
        assert_eq!(req.timestamp, 1_700_000_000);
        assert_eq!(req.prefetch, 1_700_000_007);
        assert_eq!(
            req.live_feed_request.unwrap(),
            live.to_message(&BuildContext::default()).unwrap()
        );
    }

    #[test]
    fn test_starting_now_window_ends_by_now() {
        let unix_now = || {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs() as u32
        };
        let before = unix_now();
        let params = PlaybackParams::starting_now(LiveFeedParams::default(), 30);
        let after = unix_now();

        assert_eq!(params.duration, 30);
        let req: PlaybackRequest = params.to_message(&BuildContext::default()).unwrap();
        assert!(req.prefetch >= before && req.prefetch <= after);
        assert_eq!(req.prefetch - req.timestamp, 30);
    }

    #[test]
    fn test_playback_propagates_live_feed_errors() {
        let mut live = LiveFeedParams::default();
        live.bounding_box.south = 60.0;
        let params = PlaybackParams::new(live, 1);
        assert!(matches!(
            params.to_message(&BuildContext::default()),
            Err(BuildError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_nearest_rejects_bad_location() {
        let params = NearestFlightsParams::new(95.0, 0.0);
        assert!(params.to_message(&BuildContext::default()).is_err());
    }

    #[test]
    fn test_request_params_dispatch() {
        let t = target();
        let ctx = BuildContext::default();
        let all = [
            RequestParams::LiveFeed(LiveFeedParams::default()),
            RequestParams::FollowFlight(FollowFlightParams::new(0x2f4b1c9a)),
            RequestParams::LiveTrail(LiveTrailParams {
                flight_id: FlightId(1),
            }),
        ];
        for params in &all {
            let env = params.build(&t, &ctx).unwrap();
            assert_eq!(env.rpc, params.method());
            assert!(env.url.ends_with(params.method().as_str()));
        }
        assert!(RpcMethod::FollowFlight.is_streaming());
        assert!(!RpcMethod::LiveFeed.is_streaming());
    }
}

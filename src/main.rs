//! Flightradar24 feed CLI
//!
//! Queries the live feed and prints flights as JSON lines.

use base64::Engine;
use clap::{Args, Parser, Subcommand, ValueEnum};
use fr24_feed::{
    batch::BatchSummary,
    client::{ClientConfig, FeedClient},
    proto,
    request::{
        BoundingBox, Credential, FieldMaskPolicy, FlightId, FollowFlightParams, LiveFeedField,
        LiveFeedParams, NearestFlightsParams, PlaybackParams, ServiceTarget, DEFAULT_SERVICE_ROOT,
    },
    types::{project, project_nearest},
};
use futures::StreamExt;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "fr24-feed")]
#[command(about = "Flightradar24 gRPC-web feed client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Bearer token; anonymous access when unset
    #[arg(long, env = "FR24_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Service root URL
    #[arg(long, env = "FR24_SERVICE_ROOT", default_value = DEFAULT_SERVICE_ROOT)]
    service_root: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Maximum requests in flight
    #[arg(long, default_value = "8")]
    max_concurrent: usize,

    /// Drop live feed fields the credential does not allow instead of failing
    #[arg(long)]
    clip_fields: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Args, Clone, Copy)]
struct BoundsArgs {
    /// North bound of bounding box
    #[arg(long, default_value = "52", allow_hyphen_values = true)]
    north: f64,

    /// South bound of bounding box
    #[arg(long, default_value = "42", allow_hyphen_values = true)]
    south: f64,

    /// West bound of bounding box
    #[arg(long, default_value = "-8", allow_hyphen_values = true)]
    west: f64,

    /// East bound of bounding box
    #[arg(long, default_value = "10", allow_hyphen_values = true)]
    east: f64,
}

#[derive(Args, Clone)]
struct FeedArgs {
    #[command(flatten)]
    bounds: BoundsArgs,

    /// Split the box into this many rows of tiles
    #[arg(long, default_value = "1")]
    rows: usize,

    /// Split the box into this many columns of tiles
    #[arg(long, default_value = "1")]
    cols: usize,

    /// Comma-separated fields (flight, reg, route, type, squawk, vspeed, airspace, logo_id, age)
    #[arg(long, value_delimiter = ',')]
    fields: Vec<LiveFeedField>,

    /// Maximum flights per tile
    #[arg(long, default_value = "1500")]
    limit: u32,
}

impl FeedArgs {
    fn params(&self) -> Result<Vec<LiveFeedParams>, Box<dyn std::error::Error>> {
        let b = self.bounds;
        let bbox = BoundingBox::new(b.north, b.south, b.west, b.east)?;
        let mut base = LiveFeedParams::new(bbox).with_limit(self.limit);
        if !self.fields.is_empty() {
            base = base.with_fields(self.fields.iter().copied());
        }

        Ok(bbox
            .tiles(self.rows.max(1), self.cols.max(1))
            .into_iter()
            .map(|tile| LiveFeedParams {
                bounding_box: tile,
                ..base.clone()
            })
            .collect())
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SavedKind {
    LiveFeed,
    Playback,
    Nearest,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the live feed for an area
    LiveFeed {
        #[command(flatten)]
        feed: FeedArgs,
    },

    /// Fetch the feed as it was at a past time
    Playback {
        #[command(flatten)]
        feed: FeedArgs,

        /// Unix timestamp in seconds; defaults to now
        #[arg(long)]
        timestamp: Option<u32>,

        /// Window length in seconds
        #[arg(long, default_value = "7")]
        duration: u32,
    },

    /// Flights nearest to a point
    Nearest {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Search radius in metres
        #[arg(long, default_value = "10000")]
        radius: u32,

        #[arg(long, default_value = "1500")]
        limit: u32,
    },

    /// Follow a live flight until the stream ends
    Follow {
        /// Flight id in hex, e.g. "2f4b1c9a"
        flight_id: FlightId,

        /// Stop after this many updates
        #[arg(long)]
        max_updates: Option<usize>,
    },

    /// Decode a saved response body (for testing)
    Decode {
        /// Path to the body, raw or base64 encoded
        file: PathBuf,

        /// Message type of the body
        #[arg(long, value_enum, default_value = "live-feed")]
        kind: SavedKind,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let client = build_client(&cli)?;

    match cli.command {
        Commands::LiveFeed { feed } => {
            let params = feed.params()?;
            tracing::info!("Fetching live feed over {} tile(s)", params.len());

            let results = client.live_feed_batch(&params).await;
            for (i, result) in results.iter().enumerate() {
                match result {
                    Ok(response) => print_rows(&project(response))?,
                    Err(e) => tracing::error!("Tile {} failed: {}", i, e),
                }
            }
            tracing::info!("Live feed: {}", BatchSummary::of(&results));
        }

        Commands::Playback {
            feed,
            timestamp,
            duration,
        } => {
            let params: Vec<_> = feed
                .params()?
                .into_iter()
                .map(|live_feed| match timestamp {
                    Some(ts) => PlaybackParams::new(live_feed, ts).with_duration(duration),
                    None => PlaybackParams::starting_now(live_feed, duration),
                })
                .collect();

            let results = client.playback_batch(&params).await;
            for (i, result) in results.iter().enumerate() {
                match result {
                    Ok(response) => print_rows(&project(response))?,
                    Err(e) => tracing::error!("Tile {} failed: {}", i, e),
                }
            }
            tracing::info!("Playback: {}", BatchSummary::of(&results));
        }

        Commands::Nearest {
            lat,
            lon,
            radius,
            limit,
        } => {
            let params = NearestFlightsParams {
                radius,
                limit,
                ..NearestFlightsParams::new(lat, lon)
            };
            let response = client.nearest_flights(&params).await?;
            print_rows(&project_nearest(&response))?;
        }

        Commands::Follow {
            flight_id,
            max_updates,
        } => {
            follow(&client, flight_id, max_updates).await?;
        }

        Commands::Decode { file, kind } => {
            decode_file(&file, kind)?;
        }
    }

    Ok(())
}

fn build_client(cli: &Cli) -> Result<FeedClient, Box<dyn std::error::Error>> {
    let policy = if cli.clip_fields {
        FieldMaskPolicy::Clip
    } else {
        FieldMaskPolicy::Reject
    };

    let mut config = ClientConfig::new(ServiceTarget::new(&cli.service_root))
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_max_concurrent(cli.max_concurrent)
        .with_field_mask_policy(policy);

    if let Some(token) = &cli.token {
        tracing::info!("Using authenticated access");
        config = config.with_credential(Credential::bearer(token)?);
    }

    Ok(FeedClient::new(config)?)
}

fn print_rows<R: Serialize>(rows: &[R]) -> Result<(), Box<dyn std::error::Error>> {
    for row in rows {
        println!("{}", serde_json::to_string(row)?);
    }
    Ok(())
}

async fn follow(
    client: &FeedClient,
    flight_id: FlightId,
    max_updates: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Following flight {}", flight_id);

    let mut stream = client
        .follow_flight(&FollowFlightParams::new(flight_id))
        .await?;

    let mut updates = 0;
    while let Some(update) = stream.next().await {
        match update {
            Ok(update) => {
                let info = update.flight_info.unwrap_or_default();
                let progress = update.flight_progress.unwrap_or_default();
                println!(
                    "{}",
                    serde_json::json!({
                        "flightid": FlightId(info.flightid).to_string(),
                        "timestamp_ms": info.timestamp_ms,
                        "latitude": info.lat,
                        "longitude": info.lon,
                        "altitude": info.alt,
                        "ground_speed": info.speed,
                        "callsign": info.callsign,
                        "progress_pct": progress.progress_pct,
                        "trail_points": update.flight_trail_list.len(),
                    })
                );
                updates += 1;
            }
            Err(e) => tracing::warn!("Bad update: {}", e),
        }

        if max_updates.is_some_and(|max| updates >= max) {
            break;
        }
    }
    stream.close();

    tracing::info!("Received {} update(s)", updates);
    Ok(())
}

fn decode_file(path: &PathBuf, kind: SavedKind) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read(path)?;

    tracing::info!("Decoding file: {} ({} bytes)", path.display(), raw.len());

    // Saved bodies are often base64 text; fall back to raw bytes.
    let data = base64::engine::general_purpose::STANDARD
        .decode(raw.trim_ascii())
        .unwrap_or(raw);

    match kind {
        SavedKind::LiveFeed => {
            let response: proto::LiveFeedResponse = fr24_feed::decode(&data)?;
            print_rows(&project(&response))?;
        }
        SavedKind::Playback => {
            let response: proto::PlaybackResponse = fr24_feed::decode(&data)?;
            print_rows(&project(&response))?;
        }
        SavedKind::Nearest => {
            let response: proto::NearestFlightsResponse = fr24_feed::decode(&data)?;
            print_rows(&project_nearest(&response))?;
        }
    }

    Ok(())
}

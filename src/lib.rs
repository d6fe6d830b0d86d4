//! Client for the Flightradar24 gRPC-web data feed.
//!
//! This library provides functionality to:
//! - Build typed requests for every RPC of `fr24.feed.api.v1.Feed`
//! - Frame and unframe gRPC-web bodies, including in-body status trailers
//! - Run unary calls, server streams and ordered batches over HTTP
//! - Flatten flight lists into tabular records
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │   Request   │───▶│   Client    │───▶│  Protocol   │
//! │  (Builders) │    │ (HTTP/slots)│    │  (Frames)   │
//! └─────────────┘    └─────────────┘    └─────────────┘
//!                           │                  │
//!                           ▼                  ▼
//!                    ┌─────────────┐    ┌─────────────┐
//!                    │    Batch    │    │    Types    │
//!                    │  (Fan-out)  │    │  (Records)  │
//!                    └─────────────┘    └─────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use fr24_feed::{
//!     client::{ClientConfig, FeedClient},
//!     request::{BoundingBox, LiveFeedParams},
//!     types::project,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FeedClient::new(ClientConfig::default())?;
//!
//!     let tiles: Vec<_> = BoundingBox::GLOBAL
//!         .tiles(2, 2)
//!         .into_iter()
//!         .map(LiveFeedParams::new)
//!         .collect();
//!
//!     for result in client.live_feed_batch(&tiles).await {
//!         match result {
//!             Ok(response) => println!("{} flights", project(&response).len()),
//!             Err(e) => eprintln!("tile failed: {}", e),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod client;
pub mod error;
pub mod proto;
pub mod protocol;
pub mod request;
pub mod types;

pub use batch::{call_unary_batch, BatchSummary};
pub use client::{ClientConfig, FeedClient, FrameStream, RawResponse, TransportError};
pub use error::{Error, ErrorKind, Result};
pub use protocol::{decode, encode, DecodeError, GrpcCode, GrpcError};
pub use request::{
    BoundingBox, BuildError, Credential, Envelope, FieldMaskPolicy, FlightId, LiveFeedField,
    LiveFeedParams, PlaybackParams, RequestParams, RpcMethod, RpcParams, ServiceTarget,
};
pub use types::{project, FlightRecord};

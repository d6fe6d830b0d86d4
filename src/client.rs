//! HTTP client for the feed service.

use crate::error::Result;
use crate::proto;
use crate::protocol::{self, DecodeError, Frame, FrameDecoder, GrpcError, Trailer};
use crate::request::{
    BuildContext, BuildError, Credential, Envelope, FieldMaskPolicy, FlightDetailsParams,
    FollowFlightParams, HistoricTrailParams, LiveFeedParams, LiveFlightsStatusParams,
    LiveTrailParams, NearestFlightsParams, PlaybackFlightParams, PlaybackParams, RpcParams,
    ServiceTarget, TopFlightsParams,
};
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use percent_encoding::percent_decode;
use prost::Message;
use reqwest::{header::HeaderMap, Client, Response, StatusCode};
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Server returned error status: {status}")]
    ServerError { status: StatusCode },
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },
    #[error("Authentication failed")]
    AuthError,
    #[error("Client is closed")]
    Closed,
}

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Where requests go.
    pub target: ServiceTarget,
    /// Sent as `authorization` when present.
    pub credential: Option<Credential>,
    /// Whole-request timeout for unary calls. Streams only use `connect_timeout`.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Number of requests allowed in flight at once.
    pub max_concurrent: usize,
    pub field_mask_policy: FieldMaskPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            target: ServiceTarget::default(),
            credential: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_concurrent: 8,
            field_mask_policy: FieldMaskPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults against `target`: anonymous, 30 s timeout, 8 slots.
    pub fn new(target: ServiceTarget) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    /// Authorize every call with `credential`.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Whole-request timeout for unary calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connect timeout, also the only timeout streams get.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Values below one are raised to one.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// How over-selected live feed fields are handled.
    pub fn with_field_mask_policy(mut self, policy: FieldMaskPolicy) -> Self {
        self.field_mask_policy = policy;
        self
    }
}

/// Status, headers and body of a completed unary exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    /// Decode the body as one `T`.
    ///
    /// An empty body with `grpc-status` in the HTTP headers is a trailers-only
    /// response and is judged by those headers.
    pub fn decode<T: Message + Default>(&self) -> Result<T> {
        if self.body.is_empty() {
            if let Some(trailer) = header_trailer(&self.headers)? {
                trailer.into_result()?;
                return Err(DecodeError::MissingMessage.into());
            }
        }
        protocol::decode(&self.body)
    }
}

/// Read `grpc-status`/`grpc-message` from HTTP headers, if present.
fn header_trailer(headers: &HeaderMap) -> std::result::Result<Option<Trailer>, DecodeError> {
    let Some(status) = headers.get("grpc-status") else {
        return Ok(None);
    };
    let mut payload = Vec::with_capacity(16);
    payload.extend_from_slice(b"grpc-status:");
    payload.extend_from_slice(status.as_bytes());
    let mut trailer = Trailer::parse(&payload)?;
    // Header values carry the message percent-encoded.
    trailer.message = headers
        .get("grpc-message")
        .map(|message| Bytes::from(percent_decode(message.as_bytes()).collect::<Vec<u8>>()));
    Ok(Some(trailer))
}

/// A non-zero status carried by a failed response, in headers or body.
fn service_error(raw: &RawResponse) -> Option<GrpcError> {
    let trailer = match header_trailer(&raw.headers) {
        Ok(Some(trailer)) => Some(trailer),
        _ => match protocol::decode_frame(&raw.body) {
            Ok(Some((Frame::Trailer(trailer), _))) => Some(trailer),
            _ => None,
        },
    };
    trailer.and_then(|t| t.into_result().err())
}

/// Map a non-success HTTP status to a transport error.
fn check_status(response: &Response) -> std::result::Result<(), TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    tracing::warn!("Server returned {} for {}", status, response.url());
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);

            Err(TransportError::RateLimited { retry_after })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TransportError::AuthError),
        status => Err(TransportError::ServerError { status }),
    }
}

/// Client for the feed service.
///
/// Cloning is cheap; clones share the HTTP connection pool and request slots.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: Client,
    config: ClientConfig,
    slots: Arc<Semaphore>,
}

impl FeedClient {
    /// Create a client with its own connection pool.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(TransportError::from)?;

        Ok(Self::with_http_client(http, config))
    }

    /// Create a client on an existing `reqwest::Client`.
    pub fn with_http_client(http: Client, config: ClientConfig) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            http,
            config,
            slots,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Request slots not currently held by a call or open stream.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn build_context(&self) -> BuildContext<'_> {
        BuildContext::new(self.config.credential.as_ref(), self.config.field_mask_policy)
    }

    /// Build an envelope against this client's target and credential.
    pub fn envelope<P: RpcParams>(&self, params: &P) -> std::result::Result<Envelope, BuildError> {
        params.build(&self.config.target, &self.build_context())
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Ok(self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TransportError::Closed)?)
    }

    /// Perform one unary exchange and return the undecoded response.
    ///
    /// A non-2xx status is a transport error unless the body is a parseable
    /// status frame or the headers carry `grpc-status`.
    pub async fn call_unary_raw(&self, envelope: Envelope) -> Result<RawResponse> {
        let _permit = self.acquire().await?;

        tracing::debug!("Calling {}: {}", envelope.rpc, envelope.url);

        let response = self
            .http
            .request(envelope.method, &envelope.url)
            .headers(envelope.headers)
            .timeout(self.config.timeout)
            .body(envelope.body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let transport = check_status(&response);
        let body = response.bytes().await?;

        tracing::debug!(
            "{} returned {} with {} bytes",
            envelope.rpc,
            status,
            body.len()
        );

        let raw = RawResponse {
            status,
            headers,
            body,
        };

        if let Err(e) = transport {
            // Prefer the service's own verdict when it sent one.
            return Err(match service_error(&raw) {
                Some(grpc) => grpc.into(),
                None => e.into(),
            });
        }

        Ok(raw)
    }

    /// Perform one unary exchange and decode a single `T`.
    pub async fn call_unary_typed<T: Message + Default>(&self, envelope: Envelope) -> Result<T> {
        self.call_unary_raw(envelope).await?.decode()
    }

    /// Open a server stream of `T`.
    ///
    /// The returned stream holds a request slot until it ends, is closed, or
    /// is dropped.
    pub async fn call_stream<T: Message + Default>(
        &self,
        envelope: Envelope,
    ) -> Result<FrameStream<T>> {
        let permit = self.acquire().await?;

        tracing::debug!("Opening stream {}: {}", envelope.rpc, envelope.url);

        let response = self
            .http
            .request(envelope.method, &envelope.url)
            .headers(envelope.headers)
            .body(envelope.body)
            .send()
            .await?;

        if let Err(e) = check_status(&response) {
            let status = response.status();
            let headers = response.headers().clone();
            let raw = RawResponse {
                status,
                headers,
                body: response.bytes().await?,
            };
            return Err(match service_error(&raw) {
                Some(grpc) => grpc.into(),
                None => e.into(),
            });
        }
        if let Some(trailer) = header_trailer(response.headers())? {
            trailer.into_result()?;
        }

        Ok(FrameStream::new(response.bytes_stream().boxed(), permit))
    }

    /// Build and run a unary RPC.
    pub async fn unary<P: RpcParams>(&self, params: &P) -> Result<P::Response> {
        let envelope = self.envelope(params)?;
        self.call_unary_typed(envelope).await
    }

    /// Build and open a streaming RPC.
    pub async fn stream<P: RpcParams>(&self, params: &P) -> Result<FrameStream<P::Response>> {
        let envelope = self.envelope(params)?;
        self.call_stream(envelope).await
    }

    pub async fn live_feed(&self, params: &LiveFeedParams) -> Result<proto::LiveFeedResponse> {
        self.unary(params).await
    }

    pub async fn playback(&self, params: &PlaybackParams) -> Result<proto::PlaybackResponse> {
        self.unary(params).await
    }

    pub async fn nearest_flights(
        &self,
        params: &NearestFlightsParams,
    ) -> Result<proto::NearestFlightsResponse> {
        self.unary(params).await
    }

    pub async fn live_flights_status(
        &self,
        params: &LiveFlightsStatusParams,
    ) -> Result<proto::LiveFlightsStatusResponse> {
        self.unary(params).await
    }

    pub async fn flight_details(
        &self,
        params: &FlightDetailsParams,
    ) -> Result<proto::FlightDetailsResponse> {
        self.unary(params).await
    }

    pub async fn playback_flight(
        &self,
        params: &PlaybackFlightParams,
    ) -> Result<proto::PlaybackFlightResponse> {
        self.unary(params).await
    }

    /// Follow a live flight; the service pushes an update per frame.
    pub async fn follow_flight(
        &self,
        params: &FollowFlightParams,
    ) -> Result<FrameStream<proto::FollowFlightResponse>> {
        self.stream(params).await
    }

    pub async fn top_flights(&self, params: &TopFlightsParams) -> Result<proto::TopFlightsResponse> {
        self.unary(params).await
    }

    pub async fn live_trail(&self, params: &LiveTrailParams) -> Result<proto::LiveTrailResponse> {
        self.unary(params).await
    }

    pub async fn historic_trail(
        &self,
        params: &HistoricTrailParams,
    ) -> Result<proto::HistoricTrailResponse> {
        self.unary(params).await
    }
}

/// Messages decoded from a streamed response body.
///
/// Yields one item per data frame in arrival order. A bad frame yields an
/// `Err` item and the stream carries on; the stream ends at the trailer or at
/// the end of the body. The request slot and the body are released exactly
/// once, on whichever of completion, [`close`](Self::close) or drop comes first.
pub struct FrameStream<T> {
    body: Option<BoxStream<'static, reqwest::Result<Bytes>>>,
    decoder: FrameDecoder,
    permit: Option<OwnedSemaphorePermit>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FrameStream<T> {
    fn new(body: BoxStream<'static, reqwest::Result<Bytes>>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            body: Some(body),
            decoder: FrameDecoder::new(),
            permit: Some(permit),
            _marker: PhantomData,
        }
    }

    /// Release the body and the request slot now. Idempotent.
    pub fn close(&mut self) {
        if self.permit.take().is_some() {
            tracing::debug!("Stream released");
        }
        self.body = None;
    }

    pub fn is_closed(&self) -> bool {
        self.permit.is_none()
    }
}

impl<T> std::fmt::Debug for FrameStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream")
            .field("closed", &self.is_closed())
            .field("buffered", &self.decoder.buffered())
            .finish()
    }
}

impl<T: Message + Default> Stream for FrameStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.is_closed() {
                return Poll::Ready(None);
            }

            match this.decoder.next_frame() {
                Ok(Some(Frame::Data(payload))) => {
                    let item: Result<T> = T::decode(payload).map_err(|e| DecodeError::from(e).into());
                    return Poll::Ready(Some(item));
                }
                Ok(Some(Frame::Trailer(trailer))) => {
                    this.close();
                    return match trailer.into_result() {
                        Ok(()) => Poll::Ready(None),
                        Err(e) => Poll::Ready(Some(Err(e.into()))),
                    };
                }
                Ok(None) => {}
                Err(e) => {
                    if this.decoder.is_poisoned() {
                        this.close();
                    }
                    return Poll::Ready(Some(Err(e.into())));
                }
            }

            let Some(body) = this.body.as_mut() else {
                return Poll::Ready(None);
            };

            match body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => this.decoder.push(&chunk),
                Poll::Ready(Some(Err(e))) => {
                    this.close();
                    return Poll::Ready(Some(Err(TransportError::Request(e).into())));
                }
                Poll::Ready(None) => {
                    let buffered = this.decoder.buffered();
                    this.close();
                    if buffered > 0 {
                        return Poll::Ready(Some(Err(DecodeError::Incomplete { buffered }.into())));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::protocol::{encode, encode_trailer, GrpcCode};
    use futures::stream;
    use reqwest::header::HeaderValue;

    fn permit() -> (Arc<Semaphore>, OwnedSemaphorePermit) {
        let slots = Arc::new(Semaphore::new(1));
        let permit = slots.clone().try_acquire_owned().unwrap();
        (slots, permit)
    }

    fn frames_stream(chunks: Vec<Bytes>) -> BoxStream<'static, reqwest::Result<Bytes>> {
        stream::iter(chunks.into_iter().map(Ok)).boxed()
    }

    fn flight(id: u32) -> proto::Flight {
        proto::Flight {
            flightid: id,
            ..Default::default()
        }
    }

    #[test]
    fn test_config_setters() {
        let config = ClientConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_max_concurrent(0)
            .with_field_mask_policy(FieldMaskPolicy::Clip);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.field_mask_policy, FieldMaskPolicy::Clip);
        assert!(config.credential.is_none());
    }

    #[test]
    fn test_trailers_only_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("grpc-status", HeaderValue::from_static("5"));
        headers.insert("grpc-message", HeaderValue::from_static("Flight not found!"));
        let raw = RawResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::new(),
        };

        let err = raw.decode::<proto::LiveFeedResponse>().unwrap_err();
        assert_eq!(err.code(), Some(GrpcCode::NotFound));
        assert_eq!(&err.grpc().unwrap().message[..], b"Flight not found!");
    }

    #[test]
    fn test_header_message_is_percent_decoded() {
        let mut headers = HeaderMap::new();
        headers.insert("grpc-status", HeaderValue::from_static("5"));
        headers.insert(
            "grpc-message",
            HeaderValue::from_static("Flight%20not%20found%21%0Aretry%20later"),
        );
        let raw = RawResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::new(),
        };

        let err = raw.decode::<proto::LiveFeedResponse>().unwrap_err();
        assert_eq!(err.code(), Some(GrpcCode::NotFound));
        assert_eq!(
            &err.grpc().unwrap().message[..],
            b"Flight not found!\nretry later"
        );
    }

    #[test]
    fn test_empty_body_without_status_is_decode_error() {
        let raw = RawResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };
        assert!(raw.decode::<proto::LiveFeedResponse>().unwrap_err().is_decode());
    }

    #[tokio::test]
    async fn test_stream_split_chunks_then_trailer() {
        let mut body = Vec::new();
        body.extend_from_slice(&encode(&flight(1)));
        body.extend_from_slice(&encode(&flight(2)));
        body.extend_from_slice(&encode_trailer(&Trailer::with_status(0)));
        let chunks = body.chunks(3).map(Bytes::copy_from_slice).collect();

        let (slots, permit) = permit();
        let stream = FrameStream::<proto::Flight>::new(frames_stream(chunks), permit);
        assert_eq!(slots.available_permits(), 0);

        let items: Vec<_> = stream.collect().await;
        let ids: Vec<_> = items.into_iter().map(|r| r.unwrap().flightid).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(slots.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_stream_error_trailer() {
        let chunks = vec![
            encode(&flight(7)),
            encode_trailer(&Trailer {
                status: 8,
                message: Some(Bytes::from_static(b"quota")),
                metadata: Vec::new(),
            }),
        ];
        let (slots, permit) = permit();
        let mut stream = FrameStream::<proto::Flight>::new(frames_stream(chunks), permit);

        assert_eq!(stream.next().await.unwrap().unwrap().flightid, 7);
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.code(), Some(GrpcCode::ResourceExhausted));
        assert!(stream.next().await.is_none());
        assert!(stream.is_closed());
        assert_eq!(slots.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_stream_continues_after_bad_frame() {
        let chunks = vec![
            protocol::encode_payload(protocol::FLAG_DATA, &[0xff, 0xff]),
            encode(&flight(3)),
        ];
        let (_slots, permit) = permit();
        let items: Vec<_> = FrameStream::<proto::Flight>::new(frames_stream(chunks), permit)
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert!(items[0].as_ref().unwrap_err().is_decode());
        assert_eq!(items[1].as_ref().unwrap().flightid, 3);
    }

    #[tokio::test]
    async fn test_stream_dangling_partial_frame() {
        let whole = encode(&flight(4));
        let chunks = vec![whole.clone(), whole.slice(..3)];
        let (_slots, permit) = permit();
        let items: Vec<_> = FrameStream::<proto::Flight>::new(frames_stream(chunks), permit)
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[1],
            Err(Error::Decode(DecodeError::Incomplete { buffered: 3 }))
        ));
    }

    #[tokio::test]
    async fn test_close_and_drop_release_once() {
        let (slots, permit) = permit();
        let mut stream =
            FrameStream::<proto::Flight>::new(frames_stream(vec![encode(&flight(1))]), permit);
        stream.close();
        stream.close();
        assert_eq!(slots.available_permits(), 1);
        assert!(stream.next().await.is_none());
        drop(stream);
        assert_eq!(slots.available_permits(), 1);

        let permit = slots.clone().try_acquire_owned().unwrap();
        let stream = FrameStream::<proto::Flight>::new(frames_stream(Vec::new()), permit);
        assert_eq!(slots.available_permits(), 0);
        drop(stream);
        assert_eq!(slots.available_permits(), 1);
    }
}

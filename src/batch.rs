//! Concurrent fan-out of unary calls.
//!
//! All calls of a batch are polled together on the current task and their
//! results come back in input order, one slot per input. A failing call only
//! fills its own slot; the others complete normally. Concurrency on the wire
//! is still bounded by the client's request slots.

use crate::client::FeedClient;
use crate::error::{ErrorKind, Result};
use crate::proto;
use crate::request::{Envelope, LiveFeedParams, PlaybackParams, RpcParams};
use futures::future::join_all;
use prost::Message;
use std::fmt;

/// Ok/error counts for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub ok: usize,
    pub transport_errors: usize,
    pub decode_errors: usize,
    pub grpc_errors: usize,
    pub build_errors: usize,
}

impl BatchSummary {
    pub fn of<T>(results: &[Result<T>]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result {
                Ok(_) => summary.ok += 1,
                Err(e) => match e.kind() {
                    ErrorKind::Transport => summary.transport_errors += 1,
                    ErrorKind::Decode => summary.decode_errors += 1,
                    ErrorKind::Grpc => summary.grpc_errors += 1,
                    ErrorKind::Build => summary.build_errors += 1,
                },
            }
        }
        summary
    }

    pub fn errors(&self) -> usize {
        self.transport_errors + self.decode_errors + self.grpc_errors + self.build_errors
    }

    pub fn total(&self) -> usize {
        self.ok + self.errors()
    }

    pub fn is_complete(&self) -> bool {
        self.errors() == 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ok", self.ok, self.total())?;
        if !self.is_complete() {
            write!(
                f,
                " (transport {}, decode {}, grpc {}, build {})",
                self.transport_errors, self.decode_errors, self.grpc_errors, self.build_errors
            )?;
        }
        Ok(())
    }
}

fn log_summary<T>(results: &[Result<T>]) {
    let summary = BatchSummary::of(results);
    if summary.is_complete() {
        tracing::debug!("Batch finished: {}", summary);
    } else {
        tracing::warn!("Batch finished: {}", summary);
    }
}

/// Send every envelope and decode one `T` from each response.
pub async fn call_unary_batch<T>(
    client: &FeedClient,
    envelopes: impl IntoIterator<Item = Envelope>,
) -> Vec<Result<T>>
where
    T: Message + Default,
{
    let calls = envelopes
        .into_iter()
        .map(|envelope| client.call_unary_typed::<T>(envelope));
    let results = join_all(calls).await;
    log_summary(&results);
    results
}

/// Build and run one RPC per parameter set.
///
/// A parameter set that fails to build takes its slot as a build error.
pub async fn unary_batch<P: RpcParams>(client: &FeedClient, params: &[P]) -> Vec<Result<P::Response>> {
    let results = join_all(params.iter().map(|p| client.unary(p))).await;
    log_summary(&results);
    results
}

impl FeedClient {
    pub async fn call_unary_batch<T: Message + Default>(
        &self,
        envelopes: impl IntoIterator<Item = Envelope>,
    ) -> Vec<Result<T>> {
        call_unary_batch(self, envelopes).await
    }

    pub async fn live_feed_batch(
        &self,
        params: &[LiveFeedParams],
    ) -> Vec<Result<proto::LiveFeedResponse>> {
        unary_batch(self, params).await
    }

    pub async fn playback_batch(
        &self,
        params: &[PlaybackParams],
    ) -> Vec<Result<proto::PlaybackResponse>> {
        unary_batch(self, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientConfig, TransportError};
    use crate::error::Error;
    use crate::protocol::{DecodeError, GrpcError};
    use crate::request::BuildError;

    #[test]
    fn test_summary_counts() {
        let results: Vec<Result<u32>> = vec![
            Ok(1),
            Err(GrpcError::new(5, "Flight not found!").into()),
            Ok(2),
            Err(DecodeError::MissingMessage.into()),
            Err(TransportError::AuthError.into()),
            Err(BuildError::InvalidFlightId("x".into()).into()),
        ];
        let summary = BatchSummary::of(&results);
        assert_eq!(summary.ok, 2);
        assert_eq!(summary.errors(), 4);
        assert_eq!(summary.total(), 6);
        assert!(!summary.is_complete());
        assert_eq!(
            summary.to_string(),
            "2/6 ok (transport 1, decode 1, grpc 1, build 1)"
        );
    }

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::of::<()>(&[]);
        assert!(summary.is_complete());
        assert_eq!(summary.to_string(), "0/0 ok");
    }

    #[tokio::test]
    async fn test_build_failures_fill_their_slots() {
        let client = FeedClient::new(ClientConfig::default()).unwrap();
        let mut bad = LiveFeedParams::default();
        bad.bounding_box.north = -10.0;

        let results = client.live_feed_batch(&[bad.clone(), bad]).await;
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(Error::Build(BuildError::InvalidBounds { .. })))));
        assert_eq!(client.available_slots(), 8);
    }
}

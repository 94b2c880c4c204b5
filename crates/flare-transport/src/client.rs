//! Event transmission with bounded timeouts and contained failures.
//!
//! `Transmitter::send` runs the full lifecycle of one event: preparation,
//! authentication, serialization, scrubbing, optional compression, a single
//! POST and decoding of the acknowledgement. Whatever goes wrong along the
//! way is reported to the fault handler and collapses into `None`.

use std::{fmt, sync::Arc, time::Duration};

use flare_core::{
    packet::{SDK_NAME, SDK_VERSION},
    Clock, Dsn, EnvironmentPreparer, Packet, PacketPreparer, RealClock, Scrubber,
};
use http::{header::ACCEPT, HeaderName, HeaderValue};
use reqwest::Response;
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};

use crate::{
    auth::{AuthHeader, AUTH_HEADER_NAME},
    compression::{CompressedBody, ContentEncoding, RequestBody},
    error::{Result, TransportError},
    fault::{FaultHandler, LoggingFaultHandler, SendFault},
    response::decode_event_id,
};

/// Header carrying the endpoint's reason for rejecting an event.
const REJECTION_REASON_HEADER: &str = "x-sentry-error";

/// Default timeout for one send, covering connect through response body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Returns the `User-Agent` and client name announced by this crate.
pub fn default_user_agent() -> String {
    format!("{SDK_NAME}/{SDK_VERSION}")
}

/// Configuration for the transmitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Upper bound for one send, from connect until the response body is read.
    pub timeout: Duration,
    /// Whether request bodies are gzip compressed.
    pub compression: bool,
    /// User agent and client name sent with every request.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, compression: true, user_agent: default_user_agent() }
    }
}

/// Sends event packets to an ingestion endpoint.
///
/// Cheap to clone; clones share the HTTP connection pool and the injected
/// collaborators. Concurrent sends share only read-only state.
#[derive(Clone)]
pub struct Transmitter {
    http: reqwest::Client,
    config: TransportConfig,
    clock: Arc<dyn Clock>,
    preparer: Arc<dyn PacketPreparer>,
    scrubber: Option<Arc<dyn Scrubber>>,
    fault_handler: Arc<dyn FaultHandler>,
}

impl fmt::Debug for Transmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transmitter")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("scrubber", &self.scrubber.is_some())
            .finish_non_exhaustive()
    }
}

impl Transmitter {
    /// Creates a transmitter with default collaborators.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Configuration` if the HTTP client cannot be
    /// configured with the provided settings.
    pub fn new(config: TransportConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Starts building a transmitter with injected collaborators.
    pub fn builder(config: TransportConfig) -> TransmitterBuilder {
        TransmitterBuilder::new(config)
    }

    /// Configuration in effect.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Sends one packet to `endpoint`.
    ///
    /// Returns the identifier assigned by the endpoint, or `None` if the
    /// endpoint acknowledged without content or the send failed. Failures are
    /// passed to the fault handler exactly once and never propagate. There
    /// is a single delivery attempt and no retry.
    pub async fn send(&self, packet: Packet, endpoint: &Dsn) -> Option<String> {
        let span = info_span!(
            "event_send",
            event_id = %packet.event_id,
            project = %endpoint.project_id(),
            compressed = self.config.compression
        );

        async move {
            match self.try_send(packet, endpoint).await {
                Ok(Some(id)) => {
                    tracing::info!(id = %id, "Event accepted");
                    Some(id)
                },
                Ok(None) => {
                    tracing::debug!("Endpoint acknowledged without content");
                    None
                },
                Err(fault) => {
                    self.fault_handler.on_fault(&fault);
                    None
                },
            }
        }
        .instrument(span)
        .await
    }

    async fn try_send(
        &self,
        packet: Packet,
        endpoint: &Dsn,
    ) -> std::result::Result<Option<String>, SendFault> {
        let packet =
            self.preparer.prepare(packet).map_err(|e| SendFault::preparation(e.to_string()))?;

        let auth = AuthHeader::new(endpoint, &self.config.user_agent, self.clock.now_utc())
            .to_header_value()
            .map_err(|e| SendFault::preparation(e.to_string()))?;

        let mut payload =
            serde_json::to_string(&packet).map_err(|e| SendFault::serialization(e.to_string()))?;
        if let Some(scrubber) = &self.scrubber {
            payload = scrubber.scrub(payload);
        }

        let body = RequestBody::json(payload);
        let request = self
            .http
            .post(endpoint.store_url().clone())
            .timeout(self.config.timeout)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(HeaderName::from_static(AUTH_HEADER_NAME), auth);

        let request = if self.config.compression {
            let body = CompressedBody::with_encoding(body, ContentEncoding::Gzip);
            request.headers(body.headers().clone()).body(body.into_body())
        } else {
            request.headers(body.headers().clone()).body(body.into_body())
        };

        tracing::debug!(url = %endpoint.store_url(), "Sending event");

        let response = request
            .send()
            .await
            .map_err(|e| SendFault::from_http(&e, self.config.timeout))?;

        self.read_acknowledgement(response).await
    }

    async fn read_acknowledgement(
        &self,
        response: Response,
    ) -> std::result::Result<Option<String>, SendFault> {
        let status = response.status();
        tracing::debug!(status = status.as_u16(), "Received response");

        if !status.is_success() {
            let reason = response
                .headers()
                .get(REJECTION_REASON_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            return Err(SendFault::rejected(status.as_u16(), reason));
        }

        let body =
            response.text().await.map_err(|e| SendFault::from_http(&e, self.config.timeout))?;

        decode_event_id(&body)
    }
}

/// Builder for `Transmitter`.
pub struct TransmitterBuilder {
    config: TransportConfig,
    clock: Arc<dyn Clock>,
    preparer: Arc<dyn PacketPreparer>,
    scrubber: Option<Arc<dyn Scrubber>>,
    fault_handler: Arc<dyn FaultHandler>,
}

impl TransmitterBuilder {
    /// Starts from defaults: system clock, metadata-free preparer, no
    /// scrubber and a logging fault handler.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            clock: Arc::new(RealClock::new()),
            preparer: Arc::new(EnvironmentPreparer::default()),
            scrubber: None,
            fault_handler: Arc::new(LoggingFaultHandler),
        }
    }

    /// Clock used for authentication timestamps.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Hook applied to every packet before serialization.
    #[must_use]
    pub fn preparer(mut self, preparer: Arc<dyn PacketPreparer>) -> Self {
        self.preparer = preparer;
        self
    }

    /// Scrubber applied to the serialized payload before it is sent.
    #[must_use]
    pub fn scrubber(mut self, scrubber: Arc<dyn Scrubber>) -> Self {
        self.scrubber = Some(scrubber);
        self
    }

    /// Handler invoked once for every failed send.
    #[must_use]
    pub fn fault_handler(mut self, handler: Arc<dyn FaultHandler>) -> Self {
        self.fault_handler = handler;
        self
    }

    /// Builds the transmitter.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Configuration` for a zero timeout or if the
    /// HTTP client cannot be built.
    pub fn build(self) -> Result<Transmitter> {
        if self.config.timeout.is_zero() {
            return Err(TransportError::configuration("timeout must be greater than zero"));
        }

        let http = reqwest::Client::builder()
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                TransportError::configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Transmitter {
            http,
            config: self.config,
            clock: self.clock,
            preparer: self.preparer,
            scrubber: self.scrubber,
            fault_handler: self.fault_handler,
        })
    }
}

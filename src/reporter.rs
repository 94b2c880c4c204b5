//! High-level capture API.

use std::{error::Error as StdError, future::Future, sync::Arc};

use anyhow::{Context, Result};
use flare_core::{
    Capture, CaptureContext, Dsn, JsonPacketFactory, Level, PacketFactory, PatternScrubber,
};
use flare_transport::Transmitter;

use crate::config::Config;

/// Turns messages and errors into packets and sends them.
///
/// Every capture method returns the identifier assigned by the endpoint, or
/// `None` if the event was not accepted. Reporting never fails the caller.
#[derive(Debug, Clone)]
pub struct Reporter {
    dsn: Dsn,
    factory: Arc<dyn PacketFactory>,
    transmitter: Transmitter,
    logger: Option<String>,
}

impl Reporter {
    /// Creates a reporter sending to `dsn` through `transmitter`.
    pub fn new(dsn: Dsn, transmitter: Transmitter) -> Self {
        Self { dsn, factory: Arc::new(JsonPacketFactory::new()), transmitter, logger: None }
    }

    /// Builds a reporter from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the DSN is invalid, the scrubber cannot be built,
    /// or the transmitter rejects the transport settings.
    pub fn from_config(config: &Config) -> Result<Self> {
        let dsn = config.dsn()?;

        let mut builder = Transmitter::builder(config.to_transport_config())
            .preparer(Arc::new(config.to_preparer()));
        if config.scrub_payloads {
            let scrubber = PatternScrubber::standard().context("Failed to build scrubber")?;
            builder = builder.scrubber(Arc::new(scrubber));
        }
        let transmitter = builder.build().context("Failed to build transmitter")?;

        tracing::debug!(dsn = %dsn, compression = config.compression, "Reporter configured");

        Ok(Self::new(dsn, transmitter).with_logger(config.logger.clone()))
    }

    /// Replaces the packet factory.
    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn PacketFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Logger used for captures that do not name one.
    #[must_use]
    pub fn with_logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    /// Endpoint events are sent to.
    pub fn dsn(&self) -> &Dsn {
        &self.dsn
    }

    /// Reports a plain message at `level`.
    pub fn capture_message(
        &self,
        message: &str,
        level: Level,
    ) -> impl Future<Output = Option<String>> + Send + '_ {
        self.capture(Capture::message(message), CaptureContext::with_level(level))
    }

    /// Reports `error` and its cause chain at error level.
    pub fn capture_error<E: StdError + ?Sized>(
        &self,
        error: &E,
    ) -> impl Future<Output = Option<String>> + Send + '_ {
        self.capture(Capture::error(error), CaptureContext::with_level(Level::Error))
    }

    /// Reports an arbitrary capture.
    pub async fn capture(&self, capture: Capture, mut context: CaptureContext) -> Option<String> {
        if context.logger.is_none() {
            context.logger.clone_from(&self.logger);
        }

        let packet = self.factory.create(self.dsn.project_id(), capture, context);
        self.transmitter.send(packet, &self.dsn).await
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use flare_transport::TransportConfig;

    use super::*;

    #[derive(Debug)]
    struct QueryFailed;

    impl fmt::Display for QueryFailed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "query failed")
        }
    }

    impl StdError for QueryFailed {}

    fn reporter() -> Reporter {
        let dsn = "http://public@127.0.0.1:9/1".parse().unwrap();
        Reporter::new(dsn, Transmitter::new(TransportConfig::default()).unwrap())
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn capture_futures_are_send() {
        let reporter = reporter();

        assert_send(&reporter.capture_message("hello", Level::Info));
        assert_send(&reporter.capture_error(&QueryFailed));
    }

    #[test]
    fn from_config_applies_logger() {
        let config = Config {
            dsn: "https://public@ingest.example.com/5".to_string(),
            logger: "billing".to_string(),
            scrub_payloads: true,
            ..Config::default()
        };

        let reporter = Reporter::from_config(&config).unwrap();

        assert_eq!(reporter.dsn().project_id(), "5");
        assert_eq!(reporter.logger.as_deref(), Some("billing"));
    }

    #[test]
    fn from_config_rejects_bad_dsn() {
        let config = Config { dsn: "nope".to_string(), ..Config::default() };

        assert!(Reporter::from_config(&config).is_err());
    }
}

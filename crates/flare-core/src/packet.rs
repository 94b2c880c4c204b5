//! Event packets and the factory that builds them.
//!
//! A `Packet` is one serializable error or message occurrence. It is built
//! by a `PacketFactory` from a `Capture` (what happened) and a
//! `CaptureContext` (level, tags, fingerprint and extra data), then handed to
//! the transport which treats it as opaque JSON.

use std::{collections::BTreeMap, error::Error as StdError, fmt, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::CoreError,
    time::{Clock, RealClock},
};

/// Name reported in the `sdk` block of every packet.
pub const SDK_NAME: &str = "flare";

/// Version reported in the `sdk` block of every packet.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Logger name used when a capture does not specify one.
pub const DEFAULT_LOGGER: &str = "root";

/// Strongly-typed event identifier.
///
/// Serialized as 32 lowercase hex characters without dashes, which is the
/// form ingestion endpoints echo back on acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Serialize for EventId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Uuid::parse_str(&raw).map(Self).map_err(serde::de::Error::custom)
    }
}

/// Severity of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Diagnostic detail.
    Debug,
    /// Informational message.
    Info,
    /// Something unexpected that did not fail.
    Warning,
    /// A failure.
    #[default]
    Error,
    /// A failure the process cannot recover from.
    Fatal,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

impl FromStr for Level {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "fatal" | "critical" => Ok(Self::Fatal),
            other => Err(CoreError::invalid_input(format!("unknown level '{other}'"))),
        }
    }
}

/// One entry of an exception chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionValue {
    /// Short type name of the error.
    #[serde(rename = "type")]
    pub ty: String,
    /// Display output of the error.
    pub value: String,
    /// Module path the error type lives in, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

impl ExceptionValue {
    /// Builds the exception chain for `error` and its `source()` ancestry.
    ///
    /// Entries are ordered innermost cause first, outermost error last.
    /// Only the outermost error has a statically known type; its causes are
    /// reported with the generic type `Error`.
    pub fn chain<E: StdError + ?Sized>(error: &E) -> Vec<Self> {
        let (module, ty) = split_type_name(std::any::type_name::<E>());
        let mut chain = vec![Self { ty, value: error.to_string(), module }];

        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(Self { ty: "Error".to_string(), value: cause.to_string(), module: None });
            source = cause.source();
        }

        chain.reverse();
        chain
    }
}

fn split_type_name(full: &str) -> (Option<String>, String) {
    // Generic arguments may themselves contain `::`; only split the outer path.
    let outer = full.split('<').next().unwrap_or(full);
    match outer.rsplit_once("::") {
        Some((module, _)) => (Some(module.to_string()), full[module.len() + 2..].to_string()),
        None => (None, full.to_string()),
    }
}

/// Exception interface wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionList {
    /// Chain entries, innermost cause first.
    pub values: Vec<ExceptionValue>,
}

/// Client identification embedded in each packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkInfo {
    /// SDK name.
    pub name: String,
    /// SDK version.
    pub version: String,
}

impl Default for SdkInfo {
    fn default() -> Self {
        Self { name: SDK_NAME.to_string(), version: SDK_VERSION.to_string() }
    }
}

/// Serializable event record submitted to the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Client-assigned event identifier.
    pub event_id: EventId,
    /// Project the event belongs to.
    pub project: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: Level,
    /// Logger that produced the event.
    pub logger: String,
    /// Platform tag understood by the ingestion service.
    pub platform: String,
    /// Human readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Exception chain for error captures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionList>,
    /// Indexed key/value tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Grouping fingerprint override.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fingerprint: Vec<String>,
    /// Arbitrary additional data.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
    /// Release of the reporting application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// Deployment environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Host the event originated on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    /// Reporting client.
    #[serde(default)]
    pub sdk: SdkInfo,
}

/// What is being reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    /// A plain message.
    Message(String),
    /// An error and its cause chain.
    Exception {
        /// Display output of the outermost error.
        message: String,
        /// Chain entries, innermost cause first.
        chain: Vec<ExceptionValue>,
    },
}

impl Capture {
    /// Captures a plain message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Captures an error together with its `source()` chain.
    pub fn error<E: StdError + ?Sized>(error: &E) -> Self {
        Self::Exception { message: error.to_string(), chain: ExceptionValue::chain(error) }
    }
}

/// Per-capture metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureContext {
    /// Severity of the event.
    pub level: Level,
    /// Logger name; falls back to `DEFAULT_LOGGER`.
    pub logger: Option<String>,
    /// Tags attached to the event.
    pub tags: BTreeMap<String, String>,
    /// Grouping fingerprint.
    pub fingerprint: Vec<String>,
    /// Additional data.
    pub extra: BTreeMap<String, Value>,
}

impl CaptureContext {
    /// Creates a context with the given level.
    pub fn with_level(level: Level) -> Self {
        Self { level, ..Self::default() }
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Adds an extra data entry.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Sets the grouping fingerprint.
    #[must_use]
    pub fn fingerprint<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fingerprint = parts.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the logger name.
    #[must_use]
    pub fn logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self
    }
}

/// Builds packets from captures.
pub trait PacketFactory: Send + Sync + fmt::Debug {
    /// Creates a packet for `project_id`.
    fn create(&self, project_id: &str, capture: Capture, context: CaptureContext) -> Packet;
}

/// Default factory producing JSON-ready packets.
#[derive(Debug, Clone)]
pub struct JsonPacketFactory {
    clock: Arc<dyn Clock>,
}

impl JsonPacketFactory {
    /// Creates a factory stamping packets with system time.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(RealClock::new()))
    }

    /// Creates a factory stamping packets from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for JsonPacketFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketFactory for JsonPacketFactory {
    fn create(&self, project_id: &str, capture: Capture, context: CaptureContext) -> Packet {
        let (message, exception) = match capture {
            Capture::Message(message) => (Some(message), None),
            Capture::Exception { message, chain } => {
                (Some(message), Some(ExceptionList { values: chain }))
            },
        };

        Packet {
            event_id: EventId::new(),
            project: project_id.to_string(),
            timestamp: self.clock.now_utc(),
            level: context.level,
            logger: context.logger.unwrap_or_else(|| DEFAULT_LOGGER.to_string()),
            platform: "other".to_string(),
            message,
            exception,
            tags: context.tags,
            fingerprint: context.fingerprint,
            extra: context.extra,
            release: None,
            environment: None,
            server_name: None,
            sdk: SdkInfo::default(),
        }
    }
}

//! Fetch outcome classification.
//!
//! Pure mapping from what happened on the wire to one of three labels. The
//! health state machine only ever sees the label.

use serde_json::Value;

/// Why a request produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The whole request exceeded its deadline.
    Timeout,
    /// Establishing the connection timed out.
    ConnectTimeout,
    /// TLS / SSL handshake failed.
    Tls,
    /// Name resolution failed with a retryable error (e.g. EAI_AGAIN).
    DnsTransient,
    /// Name resolution failed definitively (e.g. NXDOMAIN).
    DnsPersistent,
    NetworkUnreachable,
    ConnectionRefused,
    /// Anything not recognised above.
    Other(String),
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchErrorKind::Timeout => write!(f, "request timed out"),
            FetchErrorKind::ConnectTimeout => write!(f, "connection timed out"),
            FetchErrorKind::Tls => write!(f, "TLS handshake failed"),
            FetchErrorKind::DnsTransient => write!(f, "temporary DNS failure"),
            FetchErrorKind::DnsPersistent => write!(f, "DNS resolution failed"),
            FetchErrorKind::NetworkUnreachable => write!(f, "network unreachable"),
            FetchErrorKind::ConnectionRefused => write!(f, "connection refused"),
            FetchErrorKind::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Unclassified result of one upstream attempt.
#[derive(Debug, Clone)]
pub enum RawOutcome {
    Http { status: u16, body: Vec<u8> },
    Error(FetchErrorKind),
}

/// Classified result of one upstream attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success { payload: Value, status_code: u16 },
    TransientFailure { reason: String },
    PersistentFailure { reason: String },
}

impl FetchOutcome {
    /// Metric / log label.
    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Success { .. } => "success",
            FetchOutcome::TransientFailure { .. } => "transient_failure",
            FetchOutcome::PersistentFailure { .. } => "persistent_failure",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}

/// Label a raw outcome. Unrecognised outcomes are persistent failures.
pub fn classify(raw: RawOutcome) -> FetchOutcome {
    match raw {
        RawOutcome::Http { status: 200, body } => match serde_json::from_slice(&body) {
            Ok(payload) => FetchOutcome::Success {
                payload,
                status_code: 200,
            },
            Err(e) => FetchOutcome::PersistentFailure {
                reason: format!("HTTP 200 with invalid JSON body: {}", e),
            },
        },
        RawOutcome::Http { status, .. } => classify_status(status),
        RawOutcome::Error(kind) => classify_error(kind),
    }
}

fn classify_status(status: u16) -> FetchOutcome {
    let reason = format!("HTTP {}", status);
    match status {
        429 | 502 | 503 | 504 => FetchOutcome::TransientFailure { reason },
        _ => FetchOutcome::PersistentFailure { reason },
    }
}

fn classify_error(kind: FetchErrorKind) -> FetchOutcome {
    let reason = kind.to_string();
    match kind {
        FetchErrorKind::Timeout
        | FetchErrorKind::ConnectTimeout
        | FetchErrorKind::Tls
        | FetchErrorKind::DnsTransient
        | FetchErrorKind::NetworkUnreachable => FetchOutcome::TransientFailure { reason },
        FetchErrorKind::ConnectionRefused
        | FetchErrorKind::DnsPersistent
        | FetchErrorKind::Other(_) => FetchOutcome::PersistentFailure { reason },
    }
}

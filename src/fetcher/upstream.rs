//! Upstream HTTP client.
//!
//! # Responsibilities
//! - Build the outgoing request (URL, auth header)
//! - Enforce the request deadline (reqwest timeout plus an outer tokio timeout)
//! - Reduce whatever happened to a `RawOutcome` for the classifier

use reqwest::header::InvalidHeaderName;
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use crate::config::UpstreamConfig;
use crate::fetcher::auth::HeaderStyle;
use crate::fetcher::classifier::{FetchErrorKind, RawOutcome};
use crate::fetcher::sample::generate_sample;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid api_header_type: {0}")]
    HeaderType(#[from] InvalidHeaderName),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Client for the single upstream endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    header_style: HeaderStyle,
    timeout: Duration,
    test_mode: bool,
}

impl UpstreamClient {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let header_style = HeaderStyle::parse(&config.api_header_type)?;
        let request_timeout = config.request_timeout();

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .user_agent(concat!("api-cacher/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint_url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            header_style,
            timeout: request_timeout,
            test_mode: config.test_mode,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Source label recorded alongside cached payloads.
    pub fn source_label(&self) -> &str {
        if self.test_mode {
            "TEST_MODE"
        } else {
            &self.endpoint
        }
    }

    /// Perform one attempt. Never runs longer than the configured timeout.
    pub async fn fetch(&self) -> RawOutcome {
        if self.test_mode {
            let body = generate_sample(chrono::Utc::now()).to_string().into_bytes();
            return RawOutcome::Http { status: 200, body };
        }

        let mut request = self.client.get(&self.endpoint);
        match &self.api_key {
            Some(key) => request = self.header_style.apply(request, key),
            None => tracing::debug!("No API key configured, sending unauthenticated request"),
        }

        let attempt = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(RawOutcome::Http {
                status,
                body: body.to_vec(),
            })
        };

        match timeout(self.timeout, attempt).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => RawOutcome::Error(error_kind(&e)),
            Err(_) => RawOutcome::Error(FetchErrorKind::Timeout),
        }
    }
}

/// Map a reqwest error onto a transport error kind.
pub fn error_kind(err: &reqwest::Error) -> FetchErrorKind {
    if err.is_timeout() {
        return if err.is_connect() {
            FetchErrorKind::ConnectTimeout
        } else {
            FetchErrorKind::Timeout
        };
    }

    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => return FetchErrorKind::ConnectionRefused,
                std::io::ErrorKind::TimedOut => return FetchErrorKind::ConnectTimeout,
                _ => {}
            }
        }
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }

    kind_from_message(&chain)
}

fn kind_from_message(message: &str) -> FetchErrorKind {
    let lower = message.to_lowercase();

    if lower.contains("dns error") || lower.contains("failed to lookup address") {
        if lower.contains("temporary failure") || lower.contains("try again") || lower.contains("timed out") {
            return FetchErrorKind::DnsTransient;
        }
        return FetchErrorKind::DnsPersistent;
    }
    if lower.contains("network is unreachable") || lower.contains("network unreachable") {
        return FetchErrorKind::NetworkUnreachable;
    }
    if lower.contains("connection refused") {
        return FetchErrorKind::ConnectionRefused;
    }
    if lower.contains("certificate") || lower.contains("handshake") || lower.contains("tls") || lower.contains("ssl") {
        return FetchErrorKind::Tls;
    }
    if lower.contains("timed out") {
        return FetchErrorKind::Timeout;
    }

    FetchErrorKind::Other(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_mapping() {
        assert_eq!(
            kind_from_message("error sending request: dns error: failed to lookup address information: Temporary failure in name resolution"),
            FetchErrorKind::DnsTransient
        );
        assert_eq!(
            kind_from_message("dns error: failed to lookup address information: Name or service not known"),
            FetchErrorKind::DnsPersistent
        );
        assert_eq!(
            kind_from_message("tcp connect error: Network is unreachable (os error 101)"),
            FetchErrorKind::NetworkUnreachable
        );
        assert_eq!(
            kind_from_message("tcp connect error: Connection refused (os error 111)"),
            FetchErrorKind::ConnectionRefused
        );
        assert_eq!(
            kind_from_message("invalid peer certificate: UnknownIssuer"),
            FetchErrorKind::Tls
        );
        assert!(matches!(
            kind_from_message("connection closed before message completed"),
            FetchErrorKind::Other(_)
        ));
    }

    #[test]
    fn test_invalid_header_type_rejected() {
        let config = UpstreamConfig {
            api_header_type: "bad header".into(),
            ..UpstreamConfig::default()
        };
        assert!(matches!(
            UpstreamClient::from_config(&config),
            Err(UpstreamError::HeaderType(_))
        ));
    }

    #[tokio::test]
    async fn test_mode_returns_json() {
        let config = UpstreamConfig {
            test_mode: true,
            ..UpstreamConfig::default()
        };
        let client = UpstreamClient::from_config(&config).unwrap();
        assert_eq!(client.source_label(), "TEST_MODE");

        match client.fetch().await {
            RawOutcome::Http { status, body } => {
                assert_eq!(status, 200);
                let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
                assert_eq!(value["status"], "success");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refused_connection() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = UpstreamConfig {
            endpoint_url: format!("http://{}/data", addr),
            request_timeout_seconds: 2,
            ..UpstreamConfig::default()
        };
        let client = UpstreamClient::from_config(&config).unwrap();
        match client.fetch().await {
            RawOutcome::Error(kind) => assert_eq!(kind, FetchErrorKind::ConnectionRefused),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}

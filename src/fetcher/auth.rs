//! Upstream authentication header policy.

use reqwest::header::{HeaderName, InvalidHeaderName};
use reqwest::RequestBuilder;

/// How the API key is attached to outgoing requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `Authorization: Basic base64(user:password)`, key given as `user:password` or `user`.
    Basic,
    /// `x-access-token: <key>`
    XAccessToken,
    /// `<name>: <key>`
    Custom(HeaderName),
}

impl HeaderStyle {
    /// Resolve the configured `api_header_type`.
    pub fn parse(raw: &str) -> Result<Self, InvalidHeaderName> {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "bearer" => Ok(HeaderStyle::Bearer),
            "basic" => Ok(HeaderStyle::Basic),
            "x-access-token" => Ok(HeaderStyle::XAccessToken),
            _ => HeaderName::from_bytes(trimmed.as_bytes()).map(HeaderStyle::Custom),
        }
    }

    /// Attach `key` to the request.
    pub fn apply(&self, request: RequestBuilder, key: &str) -> RequestBuilder {
        match self {
            HeaderStyle::Bearer => request.bearer_auth(key),
            HeaderStyle::Basic => match key.split_once(':') {
                Some((user, password)) => request.basic_auth(user, Some(password)),
                None => request.basic_auth(key, None::<&str>),
            },
            HeaderStyle::XAccessToken => request.header("x-access-token", key),
            HeaderStyle::Custom(name) => request.header(name.clone(), key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    fn built_headers(style: &HeaderStyle, key: &str) -> reqwest::header::HeaderMap {
        let client = reqwest::Client::new();
        let request = style
            .apply(client.get("http://localhost/data"), key)
            .build()
            .unwrap();
        request.headers().clone()
    }

    #[test]
    fn test_parse_known_styles() {
        assert_eq!(HeaderStyle::parse("bearer").unwrap(), HeaderStyle::Bearer);
        assert_eq!(HeaderStyle::parse("Basic").unwrap(), HeaderStyle::Basic);
        assert_eq!(HeaderStyle::parse(" X-Access-Token ").unwrap(), HeaderStyle::XAccessToken);
        assert_eq!(
            HeaderStyle::parse("X-Api-Key").unwrap(),
            HeaderStyle::Custom(HeaderName::from_static("x-api-key"))
        );
        assert!(HeaderStyle::parse("bad header").is_err());
    }

    #[test]
    fn test_bearer() {
        let headers = built_headers(&HeaderStyle::Bearer, "abc");
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
    }

    #[test]
    fn test_basic_with_password() {
        let headers = built_headers(&HeaderStyle::Basic, "user:pass");
        // base64("user:pass")
        assert_eq!(headers[AUTHORIZATION], "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_token_and_custom_headers() {
        let headers = built_headers(&HeaderStyle::XAccessToken, "t0k");
        assert_eq!(headers["x-access-token"], "t0k");

        let custom = HeaderStyle::parse("X-Api-Key").unwrap();
        let headers = built_headers(&custom, "k3y");
        assert_eq!(headers["x-api-key"], "k3y");
        assert!(headers.get(AUTHORIZATION).is_none());
    }
}

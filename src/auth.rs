use crate::Error;
use base64::{prelude::BASE64_STANDARD, Engine};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use std::fmt;

/// Attaches credentials to outgoing datasource requests.
///
/// Implementations are shared by every clone of an adapter and must be
/// safe for concurrent read-only use.
pub trait AuthProvider: Send + Sync + fmt::Debug {
    /// `set_auth_header` is false for requests that must carry only the
    /// static headers.
    fn set_headers(&self, headers: &mut HeaderMap, set_auth_header: bool) -> Result<(), Error>;
}

#[derive(Clone, Default)]
pub struct AuthConfig {
    authorization: Option<HeaderValue>,
    headers: HeaderMap,
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn basic(username: &str, password: &str) -> Result<Self, Error> {
        let encoded = BASE64_STANDARD.encode(format!("{username}:{password}"));
        Self::new().with_authorization(&format!("Basic {encoded}"))
    }

    pub fn bearer(token: &str) -> Result<Self, Error> {
        Self::new().with_authorization(&format!("Bearer {token}"))
    }

    fn with_authorization(mut self, value: &str) -> Result<Self, Error> {
        let mut value = HeaderValue::from_str(value)
            .map_err(|_| Error::RequestBuild("invalid authorization header value".to_string()))?;
        value.set_sensitive(true);
        self.authorization = Some(value);
        Ok(self)
    }

    /// Adds a static header sent with every request.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| Error::RequestBuild(format!("invalid header name {name:?}: {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| Error::RequestBuild(format!("invalid value for header {name}: {err}")))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Parses a `Name: value` header line.
    pub fn with_header_line(self, line: &str) -> Result<Self, Error> {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::RequestBuild(format!("missing ':' in header {line:?}")))?;
        self.with_header(name.trim(), value.trim())
    }

    pub fn is_empty(&self) -> bool {
        self.authorization.is_none() && self.headers.is_empty()
    }
}

impl AuthProvider for AuthConfig {
    fn set_headers(&self, headers: &mut HeaderMap, set_auth_header: bool) -> Result<(), Error> {
        for (name, value) in self.headers.iter() {
            headers.append(name.clone(), value.clone());
        }
        if set_auth_header {
            if let Some(authorization) = &self.authorization {
                headers.insert(AUTHORIZATION, authorization.clone());
            }
        }
        Ok(())
    }
}

// Credentials must not end up in logs, so only header names are printed.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("authorization", &self.authorization.as_ref().map(|_| "<redacted>"))
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn basic_auth_header() {
        let auth = AuthConfig::basic("foo", "bar").unwrap();
        let mut headers = HeaderMap::new();
        auth.set_headers(&mut headers, true).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic Zm9vOmJhcg==");
    }

    #[test]
    fn auth_header_is_skipped_when_not_requested() {
        let auth = AuthConfig::bearer("secret-token")
            .unwrap()
            .with_header_line("X-Scope-OrgID: tenant-1")
            .unwrap();
        let mut headers = HeaderMap::new();
        auth.set_headers(&mut headers, false).unwrap();
        assert_eq!(headers.get(AUTHORIZATION), None);
        assert_eq!(headers.get("x-scope-orgid").unwrap(), "tenant-1");
    }

    #[test]
    fn debug_hides_credentials() {
        let auth = AuthConfig::bearer("secret-token").unwrap();
        let debug = format!("{auth:?}");
        assert!(!debug.contains("secret-token"), "{debug}");
    }

    #[test]
    fn malformed_header_line() {
        let err = AuthConfig::new().with_header_line("no-colon").unwrap_err();
        assert!(matches!(err, Error::RequestBuild(_)));
    }
}

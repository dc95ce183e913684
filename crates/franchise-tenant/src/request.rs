//! Inbound request metadata
//!
//! The slice of an HTTP request the tenancy layer looks at. Built once per
//! request and passed explicitly to every component.

use http::header::{AUTHORIZATION, COOKIE, HOST};
use http::{HeaderMap, Uri};

/// Forwarded host header, consulted only when configured
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Request metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// Raw `Host` header, else the URI authority (HTTP/2 or absolute-form)
    pub host_header: Option<String>,
    /// Raw first `X-Forwarded-Host` entry
    pub forwarded_host: Option<String>,
    /// Decoded query pairs, in order
    pub query: Vec<(String, String)>,
    /// Opaque session credential
    pub session_token: Option<String>,
    /// Route label for audit entries
    pub route: String,
}

impl RequestMeta {
    /// Build from headers and URI
    pub fn from_http(headers: &HeaderMap, uri: &Uri, session_cookie: &str) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let forwarded_host = header_str(X_FORWARDED_HOST)
            .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
            .filter(|v| !v.is_empty());

        let query = uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            host_header: header_str(HOST.as_str()).or_else(|| authority(uri)),
            forwarded_host,
            query,
            session_token: session_token(headers, session_cookie),
            route: uri.path().to_string(),
        }
    }

    /// Hostname to resolve against
    pub fn host(&self, trust_forwarded: bool) -> Option<&str> {
        if trust_forwarded {
            if let Some(forwarded) = self.forwarded_host.as_deref() {
                return Some(forwarded);
            }
        }
        self.host_header.as_deref()
    }

    /// All values given for a query parameter
    pub fn query_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace the route label
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }
}

/// `host[:port]` from the URI, without any userinfo
fn authority(uri: &Uri) -> Option<String> {
    let authority = uri.authority()?;
    let host = authority.host();
    if host.is_empty() {
        return None;
    }
    Some(match authority.port_u16() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Session credential: named cookie first, then a bearer token
fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|v| !v.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_extracts_host_query_and_route() {
        let uri: Uri = "/api/context?tenant=River%20side&x=1&tenant=b".parse().unwrap();
        let meta = RequestMeta::from_http(&headers(&[("host", "riverside.example.com")]), &uri, "fr_session");

        assert_eq!(meta.host(false), Some("riverside.example.com"));
        assert_eq!(meta.route, "/api/context");
        assert_eq!(meta.query_values("tenant").collect::<Vec<_>>(), vec!["River side", "b"]);
        assert_eq!(meta.session_token, None);
    }

    #[test]
    fn test_forwarded_host_only_when_trusted() {
        let uri: Uri = "/".parse().unwrap();
        let meta = RequestMeta::from_http(
            &headers(&[("host", "internal:8080"), ("x-forwarded-host", "riverside.example.com, proxy")]),
            &uri,
            "fr_session",
        );

        assert_eq!(meta.host(false), Some("internal:8080"));
        assert_eq!(meta.host(true), Some("riverside.example.com"));
    }

    #[test]
    fn test_host_falls_back_to_uri_authority() {
        let uri: Uri = "http://user@riverside.example.com:8443/api/context".parse().unwrap();
        let meta = RequestMeta::from_http(&HeaderMap::new(), &uri, "fr_session");
        assert_eq!(meta.host(false), Some("riverside.example.com:8443"));
        assert_eq!(meta.route, "/api/context");

        // the header wins when both are present
        let meta = RequestMeta::from_http(&headers(&[("host", "lakeside.example.com")]), &uri, "fr_session");
        assert_eq!(meta.host(false), Some("lakeside.example.com"));

        let meta = RequestMeta::from_http(&HeaderMap::new(), &"/api/context".parse().unwrap(), "fr_session");
        assert_eq!(meta.host(false), None);
    }

    #[test]
    fn test_session_from_cookie_then_bearer() {
        let uri: Uri = "/".parse().unwrap();

        let meta = RequestMeta::from_http(
            &headers(&[("cookie", "theme=dark; fr_session=abc123"), ("authorization", "Bearer zzz")]),
            &uri,
            "fr_session",
        );
        assert_eq!(meta.session_token.as_deref(), Some("abc123"));

        let meta = RequestMeta::from_http(&headers(&[("authorization", "Bearer zzz")]), &uri, "fr_session");
        assert_eq!(meta.session_token.as_deref(), Some("zzz"));

        let meta = RequestMeta::from_http(&headers(&[("cookie", "fr_session=")]), &uri, "fr_session");
        assert_eq!(meta.session_token, None);
    }
}

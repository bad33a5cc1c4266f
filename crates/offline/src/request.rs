use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};

/// How the browser issued a request. Only `Navigate` changes strategy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    SameOrigin,
    NoCors,
    Cors,
}

/// An outbound request as seen by the cache manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub mode: RequestMode,
    /// Forwarded to the network untouched; never part of the cache key.
    pub headers: HeaderMap,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>, mode: RequestMode) -> Self {
        Self {
            method,
            url: url.into(),
            mode,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// A subresource fetch (script, style, image, data).
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url, RequestMode::NoCors)
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.url)
    }
}

/// Request identity inside a cache generation: the URL without its fragment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(url: &str) -> Self {
        let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
        Self(without_fragment.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

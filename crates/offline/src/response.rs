use bytes::Bytes;
use http::StatusCode;

/// Response category as reported by the fetch layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Basic,
    Cors,
    Default,
    Error,
    Opaque,
    OpaqueRedirect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub kind: ResponseKind,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, kind: ResponseKind, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            kind,
            content_type: None,
            body: body.into(),
        }
    }

    /// A same-origin `200 OK`.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, ResponseKind::Basic, body)
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Whether a network response may overwrite a cache entry: exactly `200`
    /// and an acceptable category.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK
            && matches!(
                self.kind,
                ResponseKind::Basic | ResponseKind::Cors | ResponseKind::Opaque
            )
    }
}

#[cfg(test)]
mod tests {
    use super::{Response, ResponseKind};
    use http::StatusCode;

    #[test]
    fn cacheability_requires_ok_and_acceptable_kind() {
        assert!(Response::ok("x").is_cacheable());
        assert!(Response::new(StatusCode::OK, ResponseKind::Cors, "x").is_cacheable());
        assert!(!Response::new(StatusCode::NOT_FOUND, ResponseKind::Basic, "x").is_cacheable());
        assert!(!Response::new(StatusCode::OK, ResponseKind::Error, "").is_cacheable());
        assert!(!Response::new(StatusCode::OK, ResponseKind::OpaqueRedirect, "").is_cacheable());
    }
}

use serde::{Deserialize, Serialize};

/// How a probe ended: an HTTP response arrived, or the request never
/// completed. Exactly one of the two holds for every checked link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// A response was received with this status code.
    Http { code: u16 },
    /// The request failed below the HTTP layer.
    Failed { error: TransportError },
}

/// Coarse classification of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// DNS could not resolve the host.
    ServerNotFound,
    Timeout,
    Tls,
    /// Connection refused, reset, or unreachable.
    Connection,
    /// The redirect hop limit was exhausted while still being redirected.
    TooManyRedirects,
    Other,
}

/// A transport-level failure with its flattened error chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportError {
    pub kind: TransportKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure recorded when a redirect chain exceeds the hop limit.
    pub fn too_many_redirects(limit: usize) -> Self {
        Self::new(
            TransportKind::TooManyRedirects,
            format!("stopped after {limit} redirects"),
        )
    }
}

/// Everything learned about one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatus {
    /// The URL exactly as it appeared in the document.
    pub url: String,
    /// The URL that ultimately answered, after any redirects.
    pub actual_url: String,
    /// First `<title>` of the final response body, entity-decoded and
    /// trimmed. `None` when absent, empty, or the probe failed.
    pub title: Option<String>,
    /// How the probe ended.
    pub outcome: ProbeOutcome,
}

impl LinkStatus {
    /// Status for a probe that received an HTTP response.
    pub fn http(
        url: impl Into<String>,
        actual_url: impl Into<String>,
        code: u16,
        title: Option<String>,
    ) -> Self {
        Self {
            url: url.into(),
            actual_url: actual_url.into(),
            title,
            outcome: ProbeOutcome::Http { code },
        }
    }

    /// Status for a probe that failed before any HTTP response.
    pub fn failed(url: impl Into<String>, error: TransportError) -> Self {
        let url = url.into();
        Self {
            actual_url: url.clone(),
            url,
            title: None,
            outcome: ProbeOutcome::Failed { error },
        }
    }

    /// HTTP status code, or 0 when the request never completed.
    pub fn http_code(&self) -> u16 {
        match self.outcome {
            ProbeOutcome::Http { code } => code,
            ProbeOutcome::Failed { .. } => 0,
        }
    }

    /// The transport failure, populated exactly when `http_code() == 0`.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match &self.outcome {
            ProbeOutcome::Http { .. } => None,
            ProbeOutcome::Failed { error } => Some(error),
        }
    }

    /// True iff a response arrived with a non-error code.
    pub fn good(&self) -> bool {
        let code = self.http_code();
        code > 0 && code < 400
    }

    /// True when at least one redirect was followed.
    pub fn redirected(&self) -> bool {
        self.actual_url != self.url
    }

    /// One-line human-readable summary of the outcome.
    pub fn describe(&self) -> String {
        match &self.outcome {
            ProbeOutcome::Failed { error } => match error.kind {
                TransportKind::ServerNotFound => "Server not found.".to_string(),
                _ => format!("Error: {}", error.message),
            },
            ProbeOutcome::Http { code: 200 } => {
                let mut message = String::from("OK");
                if let Some(title) = &self.title {
                    message.push_str(&format!(" ({title})"));
                }
                if self.redirected() {
                    message.push_str(&format!(" (redirected to {})", self.actual_url));
                }
                message
            }
            ProbeOutcome::Http { code: 404 } => "No page under this URL.".to_string(),
            ProbeOutcome::Http { code: 403 } => "Permission denied.".to_string(),
            ProbeOutcome::Http { code } if *code >= 400 => match reason_phrase(*code) {
                Some(reason) => format!("Error {code} {reason}"),
                None => "Unknown status.".to_string(),
            },
            ProbeOutcome::Http { .. } => "Unknown status.".to_string(),
        }
    }

    /// Flat per-link record for reports and transport to a UI.
    pub fn to_record(&self) -> LinkRecord {
        LinkRecord {
            url: self.url.clone(),
            good: self.good(),
            description: self.describe(),
            http_code: self.http_code(),
            actual_url: self.redirected().then(|| self.actual_url.clone()),
            title: self.title.clone(),
        }
    }
}

/// Flat per-link report record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub url: String,
    pub good: bool,
    pub description: String,
    pub http_code: u16,
    /// Present only when the link was redirected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Standard reason phrase for an HTTP status code, covering 100 through
/// 509 including the non-standard 509. Codes without an assigned phrase
/// return `None`.
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    let phrase = match code {
        // 1xx
        100 => "Continue",
        101 => "Switching Protocols",
        // 2xx
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        // 3xx
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        // 4xx
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        // 5xx
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        509 => "Bandwidth Limit Exceeded",
        _ => return None,
    };
    Some(phrase)
}

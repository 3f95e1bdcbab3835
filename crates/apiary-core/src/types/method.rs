//! HTTP methods and request-target parsing.
//!
//! A request target is an endpoint optionally prefixed with `"<METHOD>:"`,
//! e.g. `"post:users"`. A colon that does not follow a known method name is
//! part of the endpoint, so absolute URLs with schemes or ports survive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ApiaryError;

/// HTTP method for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// All recognized methods
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Whether parameters travel in the query string rather than the body
    pub fn uses_query(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ApiaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| ApiaryError::UnsupportedMethod {
                method: s.to_string(),
            })
    }
}

/// A parsed request target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub method: HttpMethod,
    pub endpoint: String,
}

/// Split an optional `"<METHOD>:"` prefix off a request target.
///
/// Without a recognized prefix the whole string is the endpoint and the
/// method is `default` (or GET).
pub fn parse_target(target: &str, default: Option<HttpMethod>) -> RequestTarget {
    let fallback = default.unwrap_or_default();

    if let Some((prefix, rest)) = target.split_once(':') {
        if let Ok(method) = prefix.parse::<HttpMethod>() {
            return RequestTarget {
                method,
                endpoint: rest.to_string(),
            };
        }
    }

    RequestTarget {
        method: fallback,
        endpoint: target.to_string(),
    }
}

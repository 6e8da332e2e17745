//! The internal request/response protocol of the app stores.
//!
//! The service façade forwards every call as a [`Request`] keyed by a
//! logical method and path. [`Operation::parse`] turns a request into a
//! typed operation (or a NOT_FOUND / BAD_REQUEST class error), and every
//! outcome crosses the boundary as a tagged success/error [`Envelope`],
//! never as a raised fault.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::entries::{EntryInput, EntryQuery};
use crate::error::{Error, Result};
use crate::health::{HealthResultInput, HistoryQuery};
use crate::stats::StatIncrement;

/// Number of days returned by `GET /stats` when `days` is absent.
pub const DEFAULT_STATS_DAYS: u32 = 7;

/// Logical request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A request against one app's store.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Parsed JSON body; `None` for bodyless requests.
    pub body: Option<serde_json::Value>,
}

impl Request {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.to_string(),
            query: HashMap::new(),
            body: None,
        }
    }

    pub fn post(path: &str, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.to_string(),
            query: HashMap::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.insert(key.to_string(), value.into());
        self
    }
}

/// A typed store operation.
#[derive(Debug, Clone)]
pub enum Operation {
    AppendOne(EntryInput),
    AppendBatch(Vec<EntryInput>),
    Query(EntryQuery),
    Increment(Vec<StatIncrement>),
    StatsRange { days: u32 },
    Prune { before: DateTime<Utc> },
    SetHealthUrls { urls: Vec<String> },
    GetHealthUrls,
    RecordHealth(HealthResultInput),
    HealthHistory(HistoryQuery),
}

impl Operation {
    /// Parses a request into a typed operation.
    ///
    /// Unknown method/path combinations are a not-found error; structurally
    /// malformed bodies and query values are bad-request class errors.
    /// Semantic field validation (levels, counts, day ranges) stays with
    /// the stores.
    pub fn parse(request: Request) -> Result<Operation> {
        match (request.method, request.path.as_str()) {
            (Method::Post, "/log") => Ok(Operation::AppendOne(parse_body(request.body)?)),
            (Method::Post, "/logs") => {
                #[derive(Deserialize)]
                struct Body {
                    logs: Vec<EntryInput>,
                }
                let body: Body = parse_body(request.body)?;
                Ok(Operation::AppendBatch(body.logs))
            }
            (Method::Get, "/logs") => {
                let query = &request.query;
                Ok(Operation::Query(EntryQuery {
                    level: query.get("level").cloned(),
                    since: parse_query_timestamp(query, "since")?,
                    until: parse_query_timestamp(query, "until")?,
                    request_id: query.get("request_id").cloned(),
                    limit: parse_query_number::<usize>(query, "limit")?,
                    offset: parse_query_number::<usize>(query, "offset")?,
                }))
            }
            (Method::Post, "/stats") => {
                let body = request
                    .body
                    .ok_or_else(|| Error::InvalidInput("request body required".to_string()))?;
                // One endpoint, two shapes: a batch carries `counts`, a
                // single increment carries `level`.
                if body.get("counts").is_some() {
                    #[derive(Deserialize)]
                    struct Body {
                        counts: Vec<StatIncrement>,
                    }
                    let body: Body = parse_body(Some(body))?;
                    Ok(Operation::Increment(body.counts))
                } else {
                    #[derive(Deserialize)]
                    struct Body {
                        level: String,
                        #[serde(default = "default_count")]
                        count: u64,
                    }
                    fn default_count() -> u64 {
                        1
                    }
                    let body: Body = parse_body(Some(body))?;
                    Ok(Operation::Increment(vec![StatIncrement {
                        level: body.level,
                        count: body.count,
                    }]))
                }
            }
            (Method::Get, "/stats") => {
                let days =
                    parse_query_number::<u32>(&request.query, "days")?.unwrap_or(DEFAULT_STATS_DAYS);
                Ok(Operation::StatsRange { days })
            }
            (Method::Post, "/prune") => {
                #[derive(Deserialize)]
                struct Body {
                    before: DateTime<Utc>,
                }
                let body: Body = parse_body(request.body)?;
                Ok(Operation::Prune {
                    before: body.before,
                })
            }
            (Method::Post, "/health-urls") => {
                #[derive(Deserialize)]
                struct Body {
                    urls: Vec<String>,
                }
                let body: Body = parse_body(request.body)?;
                Ok(Operation::SetHealthUrls { urls: body.urls })
            }
            (Method::Get, "/health-urls") => Ok(Operation::GetHealthUrls),
            (Method::Post, "/health") => Ok(Operation::RecordHealth(parse_body(request.body)?)),
            (Method::Get, "/health") => {
                let query = &request.query;
                Ok(Operation::HealthHistory(HistoryQuery {
                    since: parse_query_timestamp(query, "since")?,
                    until: parse_query_timestamp(query, "until")?,
                    limit: parse_query_number::<usize>(query, "limit")?,
                }))
            }
            (method, path) => Err(Error::NotFound(format!(
                "no operation for {} {}",
                method, path
            ))),
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: Option<serde_json::Value>) -> Result<T> {
    let body = body.ok_or_else(|| Error::InvalidInput("request body required".to_string()))?;
    serde_json::from_value(body).map_err(|e| Error::InvalidInput(format!("invalid request body: {}", e)))
}

fn parse_query_timestamp(
    query: &HashMap<String, String>,
    name: &str,
) -> Result<Option<DateTime<Utc>>> {
    match query.get(name) {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| Error::Validation(format!("invalid {} timestamp: {}", name, e))),
    }
}

fn parse_query_number<T: std::str::FromStr>(
    query: &HashMap<String, String>,
    name: &str,
) -> Result<Option<T>> {
    match query.get(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Validation(format!("invalid {} value: {:?}", name, raw))),
    }
}

/// Closed set of error codes crossing the store boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    ValidationError,
    InternalError,
    NotImplemented,
    ServiceUnavailable,
}

impl ErrorCode {
    /// The fixed HTTP status the façade maps this code to.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::BadRequest => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::ValidationError => 422,
            ErrorCode::InternalError => 500,
            ErrorCode::NotImplemented => 501,
            ErrorCode::ServiceUnavailable => 503,
        }
    }
}

/// The tagged success/error wrapper around every operation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    Success {
        data: serde_json::Value,
    },
    Error {
        code: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}

impl Envelope {
    /// Wraps a payload in a success envelope.
    pub fn success<T: Serialize>(data: &T) -> Envelope {
        match serde_json::to_value(data) {
            Ok(value) => Envelope::Success { data: value },
            Err(e) => Envelope::error(
                ErrorCode::InternalError,
                format!("failed to encode response: {}", e),
            ),
        }
    }

    /// Builds an error envelope.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Envelope {
        Envelope::Error {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Maps a store error onto the error code set.
    pub fn from_error(err: &Error) -> Envelope {
        let code = match err {
            Error::Validation(_) => ErrorCode::ValidationError,
            Error::InvalidInput(_) => ErrorCode::BadRequest,
            Error::NotFound(_) => ErrorCode::NotFound,
            Error::Storage(_) | Error::Encoding(_) => ErrorCode::InternalError,
        };
        Envelope::error(code, err.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    /// HTTP status the façade answers with for this envelope.
    pub fn http_status(&self) -> u16 {
        match self {
            Envelope::Success { .. } => 200,
            Envelope::Error { code, .. } => code.http_status(),
        }
    }

    /// The success payload, when present.
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            Envelope::Success { data } => Some(data),
            Envelope::Error { .. } => None,
        }
    }
}

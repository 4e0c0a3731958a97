//! HTTP routes
//!
//! Everything is served on `/`:
//! - `GET` returns the score badge
//! - `POST` returns the document projected for the calling agent
//! - `PUT` applies a mutation
//!
//! Broker failures are rendered as their structured payload with the
//! matching status code.

use faf_core::{BrokerError, DocumentRequest, FafBroker, MutationRequest};
use faf_dialect::{resolve_agent, AgentSignals, BADGE_CONTENT_TYPE};
use faf_dna::UpdateSet;
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use warp::http::{HeaderValue, StatusCode};
use warp::hyper::body::Bytes;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

/// Explicit agent identity header
pub const AGENT_HEADER: &str = "x-faf-agent";

/// Response header carrying the resolved agent
pub const DETECTED_HEADER: &str = "x-faf-agent-detected";

const MAX_BODY_BYTES: u64 = 256 * 1024;

#[derive(Debug, Default, Deserialize)]
struct DocumentBody {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MutationBody {
    updates: Option<Value>,
    message: Option<String>,
    path: Option<String>,
}

/// Request headers the handlers care about
#[derive(Debug, Clone, Default)]
struct CallerHeaders {
    agent: Option<String>,
    user_agent: Option<String>,
}

fn caller_headers() -> impl Filter<Extract = (CallerHeaders,), Error = Rejection> + Clone {
    warp::header::optional::<String>(AGENT_HEADER)
        .and(warp::header::optional::<String>("user-agent"))
        .map(|agent, user_agent| CallerHeaders { agent, user_agent })
}

/// Request body, read only when its declared length is within [`MAX_BODY_BYTES`]
#[derive(Debug)]
enum BoundedBody {
    Read(Bytes),
    TooLarge(u64),
}

fn bounded_body() -> impl Filter<Extract = (BoundedBody,), Error = Rejection> + Clone {
    let within_limit = warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::bytes())
        .map(BoundedBody::Read);
    // Reached when the length is over the limit or undeclared; an undeclared
    // body is never buffered
    let refused = warp::header::optional::<u64>("content-length").map(|declared: Option<u64>| {
        match declared {
            Some(len) if len > MAX_BODY_BYTES => BoundedBody::TooLarge(len),
            _ => BoundedBody::Read(Bytes::new()),
        }
    });
    within_limit.or(refused).unify()
}

fn with_broker(
    broker: Arc<FafBroker>,
) -> impl Filter<Extract = (Arc<FafBroker>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&broker))
}

/// All broker routes
pub fn routes(
    broker: Arc<FafBroker>,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let badge = warp::path::end()
        .and(warp::get())
        .and(with_broker(Arc::clone(&broker)))
        .then(serve_badge);

    let document = warp::path::end()
        .and(warp::post())
        .and(caller_headers())
        .and(bounded_body())
        .and(with_broker(Arc::clone(&broker)))
        .then(serve_document);

    let mutation = warp::path::end()
        .and(warp::put())
        .and(caller_headers())
        .and(bounded_body())
        .and(with_broker(broker))
        .then(apply_mutation);

    badge
        .or(document)
        .unify()
        .or(mutation)
        .unify()
}

async fn serve_badge(broker: Arc<FafBroker>) -> Response {
    let badge = broker.badge(None).await;
    let mut response = badge.svg.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(BADGE_CONTENT_TYPE));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

async fn serve_document(
    caller: CallerHeaders,
    body: BoundedBody,
    broker: Arc<FafBroker>,
) -> Response {
    // A missing, oversized or unreadable body means "default document"
    let parsed: DocumentBody = match body {
        BoundedBody::Read(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
        BoundedBody::TooLarge(_) => DocumentBody::default(),
    };
    let request = DocumentRequest {
        path: parsed.path,
        agent_header: caller.agent.clone(),
        user_agent: caller.user_agent.clone(),
    };

    let (mut response, agent) = match broker.document(&request).await {
        Ok(document) => {
            let mut response = document.body.into_response();
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(document.content_type));
            (response, document.agent.to_string())
        }
        Err(err) => {
            let agent = resolve_agent(&AgentSignals::new(
                caller.agent.as_deref(),
                caller.user_agent.as_deref(),
            ));
            (error_response(&err), agent.to_string())
        }
    };

    if let Ok(value) = HeaderValue::from_str(&agent) {
        response.headers_mut().insert(DETECTED_HEADER, value);
    }
    response
}

async fn apply_mutation(
    caller: CallerHeaders,
    body: BoundedBody,
    broker: Arc<FafBroker>,
) -> Response {
    let parsed = match body {
        BoundedBody::Read(bytes) => parse_mutation_body(&bytes),
        BoundedBody::TooLarge(len) => Err(BrokerError::BadRequest(format!(
            "request body of {len} bytes exceeds the {MAX_BODY_BYTES} byte limit"
        ))),
    };
    let parsed = match parsed {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(error = %err, "mutation body rejected");
            return error_response(&err);
        }
    };

    let request = MutationRequest {
        updates: parsed.updates,
        message: parsed.message,
        agent_header: caller.agent,
        user_agent: caller.user_agent,
        path: parsed.path,
    };

    match broker.mutate(&request).await {
        Ok(done) => warp::reply::json(&done).into_response(),
        Err(err) => error_response(&err),
    }
}

struct ParsedMutation {
    updates: Option<UpdateSet>,
    message: Option<String>,
    path: Option<String>,
}

fn parse_mutation_body(body: &[u8]) -> Result<ParsedMutation, BrokerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ParsedMutation {
            updates: None,
            message: None,
            path: None,
        });
    }

    let raw: MutationBody = serde_json::from_slice(body)
        .map_err(|e| BrokerError::BadRequest(format!("malformed request body: {e}")))?;
    let updates = match raw.updates {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            UpdateSet::from_value(value)
                .map_err(|e| BrokerError::BadRequest(format!("updates must be a mapping: {e}")))?,
        ),
    };
    Ok(ParsedMutation {
        updates,
        message: raw.message,
        path: raw.path,
    })
}

fn error_response(err: &BrokerError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    warp::reply::with_status(warp::reply::json(&err.to_payload()), status).into_response()
}

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Query, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    app_state::AppState, error::RelayError, registry::RegistryStats, signal::SignalMessage,
};

pub type RelayResult<T> = Result<Json<T>, RelayError>;

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub ip: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaveRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
}

/// Query pairs in arrival order; repeated keys are kept.
pub type QueryPairs = Vec<(String, String)>;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    fn ok() -> Self {
        StatusResponse { status: "ok" }
    }
}

#[derive(Debug, Serialize)]
pub struct PeersResponse {
    pub status: &'static str,
    pub peers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    status: &'static str,
    #[serde(flatten)]
    stats: RegistryStats,
}

/// The relay endpoints, mounted under `prefix`.
pub fn relay_routes(prefix: &str) -> Router<AppState> {
    let routes = Router::new()
        .route("/join", post(join))
        .route("/signal", post(signal))
        .route("/poll", get(poll))
        .route("/leave", post(leave))
        .route("/peers", get(peers));
    if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(prefix, routes)
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        stats: state.registry.stats().await,
    })
}

pub async fn join(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> RelayResult<PeersResponse> {
    let req: JoinRequest = decode(&body)?;
    if req.code.is_empty() || req.name.is_empty() {
        return Err(RelayError::MissingFields("name or code"));
    }
    let ip = req
        .ip
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr)));

    let peers = state.registry.join(&req.code, &req.name, &ip).await;
    info!(room = %req.code, peer = %req.name, %ip, others = peers.len(), "peer joined");
    Ok(Json(PeersResponse {
        status: "ok",
        peers,
    }))
}

pub async fn signal(State(state): State<AppState>, body: Bytes) -> RelayResult<StatusResponse> {
    let message = decode::<SignalMessage>(&body)?.normalized();
    if let Some(field) = message.missing_field() {
        return Err(RelayError::MissingFields(field));
    }
    let (code, from, kind) = (message.code.clone(), message.from.clone(), message.kind.clone());
    let to = message.to.clone();

    let delivered = state.registry.send(message).await?;
    debug!(room = %code, %from, to = ?to, %kind, delivered, "signal queued");
    Ok(Json(StatusResponse::ok()))
}

pub async fn poll(
    State(state): State<AppState>,
    Query(query): Query<QueryPairs>,
) -> RelayResult<Vec<SignalMessage>> {
    let (code, name) = (first_value(&query, "code"), first_value(&query, "name"));
    if code.is_empty() || name.is_empty() {
        return Err(RelayError::MissingFields("code or name"));
    }
    let messages = state.registry.poll(code, name).await;
    if !messages.is_empty() {
        debug!(room = %code, peer = %name, count = messages.len(), "mailbox drained");
    }
    Ok(Json(messages))
}

pub async fn leave(State(state): State<AppState>, body: Bytes) -> RelayResult<StatusResponse> {
    let req: LeaveRequest = decode(&body)?;
    if state.registry.leave(&req.code, &req.name).await {
        info!(room = %req.code, peer = %req.name, "peer left");
    }
    Ok(Json(StatusResponse::ok()))
}

pub async fn peers(
    State(state): State<AppState>,
    Query(query): Query<QueryPairs>,
) -> RelayResult<PeersResponse> {
    let code = first_value(&query, "code");
    if code.is_empty() {
        return Err(RelayError::MissingFields("code"));
    }
    let peers = state
        .registry
        .lookup(code)
        .await
        .ok_or(RelayError::RoomNotFound)?;
    Ok(Json(PeersResponse {
        status: "ok",
        peers,
    }))
}

/// First value given for `key`, or empty. Later repeats are ignored.
fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> &'a str {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, value)| value.as_str())
        .unwrap_or_default()
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, RelayError> {
    Ok(serde_json::from_slice(body)?)
}

/// First `X-Forwarded-For` hop, else the socket address, else empty.
fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_default()
}

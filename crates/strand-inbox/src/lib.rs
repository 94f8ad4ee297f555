//! Inbound HTTP adapter for Strand.
//!
//! Exposes an axum [`Router`] that hands each delivered document to
//! [`Dispatcher::receive`] for the configured local user, backed by any
//! [`FederationStore`].

pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  body::Body,
  extract::{Path, Request, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use strand_core::{person::normalize_handle, store::FederationStore};
use strand_federation::{
  Applied, ContactRetraction, DispatchConfig, Dispatcher, Outcome,
  dispatch::DEFAULT_MAX_MESSAGE_BYTES,
};
use tower_http::trace::TraceLayer;

/// Header carrying the handle of the person the sending node delivers for.
pub const SENDER_HEADER: &str = "x-strand-sender";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                       String,
  pub port:                       u16,
  pub store_path:                 PathBuf,
  /// The user whose inbox this server exposes.
  pub local_handle:               String,
  #[serde(default = "default_max_message_bytes")]
  pub max_message_bytes:          usize,
  /// Retracting a person also hides and prunes their posts.
  #[serde(default)]
  pub cascade_contact_retraction: bool,
}

fn default_max_message_bytes() -> usize { DEFAULT_MAX_MESSAGE_BYTES }

impl ServerConfig {
  pub fn dispatch_config(&self) -> DispatchConfig {
    DispatchConfig {
      max_message_bytes:  self.max_message_bytes,
      contact_retraction: if self.cascade_contact_retraction {
        ContactRetraction::CascadeContent
      } else {
        ContactRetraction::ContactOnly
      },
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S: FederationStore> {
  pub dispatcher: Arc<Dispatcher<S>>,
  pub config:     Arc<ServerConfig>,
}

impl<S: FederationStore> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      dispatcher: self.dispatcher.clone(),
      config:     self.config.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the inbox [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: FederationStore + 'static,
{
  Router::new()
    .route("/receive/users/{handle}", post(receive_handler::<S>))
    .route("/healthz",                get(healthz))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn healthz() -> StatusCode { StatusCode::NO_CONTENT }

async fn receive_handler<S>(
  State(state): State<AppState<S>>,
  Path(handle): Path<String>,
  req: Request<Body>,
) -> Response
where
  S: FederationStore + 'static,
{
  match receive(&state, &handle, req).await {
    Ok(r) => r,
    Err(e) => e.into_response(),
  }
}

async fn receive<S>(
  state: &AppState<S>,
  handle: &str,
  req: Request<Body>,
) -> Result<Response, Error>
where
  S: FederationStore + 'static,
{
  let handle = normalize_handle(handle).map_err(|_| Error::NotFound)?;
  if !handle.eq_ignore_ascii_case(state.config.local_handle.trim()) {
    return Err(Error::NotFound);
  }
  let recipient = state
    .dispatcher
    .resolver()
    .find(&handle)
    .await?
    .ok_or(Error::NotFound)?;

  let sender = req
    .headers()
    .get(SENDER_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(str::to_owned)
    .ok_or_else(|| Error::BadRequest("missing X-Strand-Sender header".into()))?;

  let body = collect_body(req, state.config.max_message_bytes).await?;
  let outcome = state.dispatcher.receive(&recipient, &body, &sender).await?;

  let body = match outcome {
    Outcome::Applied(applied) => {
      json!({ "status": "applied", "entity": entity_name(&applied) })
    }
    Outcome::AlreadyApplied => json!({ "status": "already_applied" }),
  };
  Ok((StatusCode::OK, Json(body)).into_response())
}

async fn collect_body(req: Request<Body>, limit: usize) -> Result<Bytes, Error> {
  axum::body::to_bytes(req.into_body(), limit)
    .await
    .map_err(|_| Error::PayloadTooLarge)
}

fn entity_name(applied: &Applied) -> &'static str {
  match applied {
    Applied::StatusMessage(_) => "status_message",
    Applied::Comment(_) => "comment",
    Applied::Request(_) => "request",
    Applied::Contact(_) => "contact",
    Applied::Profile(_) => "profile",
    Applied::Retracted { .. } => "retraction",
  }
}

// ─── Integration tests ────────────────────────────────────────────────────────

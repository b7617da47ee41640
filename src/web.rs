//! HTTP boundary over the Consent Manager.
//!
//! Exactly four entry points, one per manager operation. This layer only
//! translates manager results into status codes; sessions, templates, and
//! locale negotiation belong to whatever front end sits above it.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use miette::IntoDiagnostic;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::errors::CmError;
use crate::manager::{ConsentManager, GrantedAttributes};
use crate::settings::Settings;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ConsentManager>,
}

pub async fn serve(settings: Settings, manager: ConsentManager) -> miette::Result<()> {
    let state = AppState {
        manager: Arc::new(manager),
    };

    let router = Router::new()
        .route("/verify/{subject_id}", get(verify))
        .route("/creq/{token}", get(creq))
        .route("/consent/{ticket}", get(consent))
        .route("/save_consent", post(save_consent))
        .with_state(state);

    let addr: SocketAddr = settings
        .listen_addr()
        .parse()
        .map_err(|e| miette::miette!("bad listen addr: {e}"))?;

    tracing::info!(%addr, "Consent API listening");
    let listener = tokio::net::TcpListener::bind(addr).await.into_diagnostic()?;
    axum::serve(listener, router).await.into_diagnostic()?;
    Ok(())
}

/// GET /verify/{subject_id} - does the subject have standing consent?
///
/// 200 with the granted attribute list (JSON `null` means every requested
/// attribute) when unexpired consent exists, 401 otherwise.
async fn verify(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> impl IntoResponse {
    match state.manager.query_consent(&subject_id).await {
        Ok(Some(attributes)) => (StatusCode::OK, Json(attributes)).into_response(),
        Ok(None) => {
            tracing::debug!(subject_id, "no consent found");
            StatusCode::UNAUTHORIZED.into_response()
        }
        Err(err) => internal_error(err),
    }
}

/// GET /creq/{token} - submit a signed consent request.
///
/// 200 with the minted ticket, 400 when the token is rejected.
async fn creq(State(state): State<AppState>, Path(token): Path<String>) -> impl IntoResponse {
    match state.manager.submit_consent_request(&token).await {
        Ok(ticket) => (StatusCode::OK, ticket).into_response(),
        Err(err @ (CmError::InvalidSignature | CmError::InvalidConsentRequest(_))) => {
            tracing::debug!(%err, "rejected consent request");
            StatusCode::BAD_REQUEST.into_response()
        }
        Err(err) => internal_error(err),
    }
}

/// GET /consent/{ticket} - redeem a ticket for its pending request.
///
/// 200 with the payload (attributes pre-split into released and locked),
/// 403 for unknown, already consumed, or stale tickets.
async fn consent(State(state): State<AppState>, Path(ticket): Path<String>) -> impl IntoResponse {
    match state.manager.retrieve_consent_request(&ticket).await {
        Ok(Some(request)) => {
            let (released, locked) = split_attributes(&request.attributes, &request.locked_attrs);
            let body = json!({
                "id": request.subject_id,
                "redirect_endpoint": request.redirect_endpoint,
                "requester_name": request.requester_name,
                "released_claims": released,
                "locked_claims": locked,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(None) => {
            tracing::debug!(ticket, "received invalid ticket");
            StatusCode::FORBIDDEN.into_response()
        }
        Err(err) => internal_error(err),
    }
}

#[derive(Debug, Deserialize)]
struct SaveConsentBody {
    subject_id: String,
    /// Omitted or `null` grants every requested attribute.
    #[serde(default)]
    attributes: GrantedAttributes,
    months_valid: u32,
}

/// POST /save_consent - record a subject's granted decision. 204 on success.
async fn save_consent(
    State(state): State<AppState>,
    Json(body): Json<SaveConsentBody>,
) -> impl IntoResponse {
    match state
        .manager
        .record_consent(&body.subject_id, body.attributes, body.months_valid)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => internal_error(err),
    }
}

fn internal_error(err: CmError) -> axum::response::Response {
    tracing::error!(%err, "consent operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal_error"})),
    )
        .into_response()
}

/// Partition a consent request's attribute map into the entries the subject
/// may deselect and the locked ones that are always released. Locked names
/// with no matching attribute are ignored; the input is left untouched.
pub fn split_attributes(
    attributes: &BTreeMap<String, Vec<String>>,
    locked_attrs: &[String],
) -> (BTreeMap<String, Vec<String>>, BTreeMap<String, Vec<String>>) {
    let mut released = attributes.clone();
    let mut locked = BTreeMap::new();
    for name in locked_attrs {
        if let Some(values) = released.remove(name) {
            locked.insert(name.clone(), values);
        }
    }
    (released, locked)
}

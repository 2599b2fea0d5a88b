use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use will_lib::claim::{prepare_creation, produce_claim, ClaimConfig, ClaimPreimage, CreationBundle};
use will_lib::eligibility::Timestamp;
use will_lib::ledger::Ledger;
use will_lib::prover::ProvingBackend;
use will_lib::WillError;

/// Shared state for the route handlers.
pub struct AppState<L, P> {
    pub config: Arc<ClaimConfig>,
    pub ledger: Arc<L>,
    pub prover: Arc<P>,
}

impl<L, P> AppState<L, P> {
    pub fn new(config: ClaimConfig, ledger: L, prover: P) -> Self {
        Self {
            config: Arc::new(config),
            ledger: Arc::new(ledger),
            prover: Arc::new(prover),
        }
    }
}

impl<L, P> Clone for AppState<L, P> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            ledger: self.ledger.clone(),
            prover: self.prover.clone(),
        }
    }
}

pub fn router<L, P>(state: AppState<L, P>) -> Router
where
    L: Ledger + 'static,
    P: ProvingBackend + 'static,
{
    Router::new()
        .route("/generateAndInsertCommitment", post(create_will::<L, P>))
        .route("/generateProof", post(generate_proof::<L, P>))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

// ── Requests ──

/// Accepts the timestamp either as a JSON number or a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimestampInput {
    Number(u64),
    Text(String),
}

impl TimestampInput {
    fn value(&self) -> Result<u64, WillError> {
        match self {
            TimestampInput::Number(n) => Ok(*n),
            TimestampInput::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| WillError::Validation(format!("invalid timestamp \"{s}\""))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWillRequest {
    reddit_user: Option<String>,
    timestamp: Option<TimestampInput>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateProofRequest {
    preimage: Option<Value>,
}

// ── Handlers ──

/// POST /generateAndInsertCommitment: owner/heir preimages plus the `createWill` call.
async fn create_will<L, P>(
    State(state): State<AppState<L, P>>,
    payload: Result<Json<CreateWillRequest>, JsonRejection>,
) -> Result<Json<CreationBundle>, AppError> {
    let Json(req) = payload.map_err(invalid_body)?;
    let identity = req.reddit_user.unwrap_or_default();
    let timestamp = match &req.timestamp {
        Some(t) => t.value()?,
        None => 0,
    };
    if identity.trim().is_empty() || timestamp == 0 {
        return Err(WillError::Validation("redditUser and timestamp are required".into()).into());
    }
    let bundle = prepare_creation(&mut rand::thread_rng(), &state.config, &identity, timestamp)?;
    info!(nullifier_hash = %bundle.owner.nullifier_hash, "created will commitments");
    Ok(Json(bundle))
}

/// POST /generateProof: proves the preimage and, once claimable, returns the `withdrawWill` call.
async fn generate_proof<L, P>(
    State(state): State<AppState<L, P>>,
    payload: Result<Json<GenerateProofRequest>, JsonRejection>,
) -> Result<Response, AppError>
where
    L: Ledger,
    P: ProvingBackend,
{
    let Json(req) = payload.map_err(invalid_body)?;
    let raw = req
        .preimage
        .ok_or_else(|| WillError::Validation("preimage is required".into()))?;
    let preimage: ClaimPreimage = serde_json::from_value(raw)
        .map_err(|e| WillError::Validation(format!("invalid preimage: {e}")))?;

    let outcome = produce_claim(
        state.ledger.as_ref(),
        state.prover.as_ref(),
        &state.config,
        &preimage,
        Timestamp::now(),
    )
    .await;

    match outcome {
        Ok(transaction) => Ok(Json(json!({
            "success": true,
            "transaction": transaction,
        }))
        .into_response()),
        Err(WillError::NotYetEligible {
            expiry_date,
            raw_expiry,
        }) => Ok(Json(json!({
            "success": false,
            "error": "Not yet expired",
            "expiryDate": expiry_date,
            "rawExpiryDate": raw_expiry.to_string(),
        }))
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

// ── Error handling ──

/// Body extraction failures answer like any other invalid input.
fn invalid_body(rejection: JsonRejection) -> AppError {
    WillError::Validation(rejection.body_text()).into()
}

/// Maps engine errors to HTTP status codes.
pub struct AppError(WillError);

impl From<WillError> for AppError {
    fn from(e: WillError) -> Self {
        AppError(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WillError::Validation(_) => StatusCode::BAD_REQUEST,
            WillError::NotFound(_) | WillError::NoCommitments => StatusCode::NOT_FOUND,
            WillError::Capacity { .. } => StatusCode::CONFLICT,
            WillError::NotYetEligible { .. } => StatusCode::OK,
            WillError::ExternalDependency(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            warn!(error = %self.0, "request rejected");
        }
        let body = json!({
            "error": self.0.to_string(),
            "retryable": self.0.is_retryable(),
        });
        (status, Json(body)).into_response()
    }
}

// Axum API Server Module
//
// Purpose: REST API around the sustainability engine and the reward pipeline
// (vision weight estimate → country multiplier → certificate mint → recycler payout)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use anyhow::Context;
use moka::future::Cache;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::engine::SustainabilityEngine;
use crate::error::ComputationError;
use crate::reward::{transfer_memo, RewardPolicy};
use crate::scan_state::{LastScanStore, ScanResult};
use crate::services::ledger::STATUS_RECYCLED;
use crate::services::{
    CertificateMetadata, GeminiVision, GeoLocator, HttpGeoLocator, HttpLedger, RewardLedger, VisionAnalyzer,
};
use crate::weight_analysis::{parse_weight_analysis, WEIGHT_PROMPT};

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SustainabilityEngine>,
    pub vision: Arc<dyn VisionAnalyzer>,
    pub geo: Arc<dyn GeoLocator>,
    pub ledger: Arc<dyn RewardLedger>,
    pub last_scan: Arc<LastScanStore>,
    pub cache: Cache<String, serde_json::Value>,
    pub policy: RewardPolicy,
    pub default_country: String,
}

impl AppState {
    /// Load the dataset and wire up the HTTP service clients from config
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        tracing::info!("Loading sustainability engine from {:?}...", config.data_path);
        let data_path = config.data_path.clone();
        let engine = tokio::task::spawn_blocking(move || SustainabilityEngine::from_csv(&data_path))
            .await
            .context("Engine load task failed")?
            .with_context(|| format!("Failed to load dataset {:?}", config.data_path))?;

        if config.gemini_api_key.is_empty() {
            tracing::warn!("GEMINI_API_KEY is not set; detection requests will fail");
        }
        if config.ledger_url.is_empty() {
            tracing::warn!("LEDGER_URL is not set; minting and payouts will fail");
        }

        let vision = GeminiVision::new(&config.gemini_api_key, &config.gemini_model);
        let geo = HttpGeoLocator::new(&config.geo_url, &config.geo_field);
        let ledger = HttpLedger::new(&config.ledger_url, config.ledger_api_key.clone());

        Ok(Self::with_services(
            engine,
            Arc::new(vision),
            Arc::new(geo),
            Arc::new(ledger),
            config.policy,
            &config.default_country,
        ))
    }

    /// Assemble state from an engine and arbitrary service implementations
    pub fn with_services(
        engine: SustainabilityEngine,
        vision: Arc<dyn VisionAnalyzer>,
        geo: Arc<dyn GeoLocator>,
        ledger: Arc<dyn RewardLedger>,
        policy: RewardPolicy,
        default_country: &str,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(300))
            .build();

        Self {
            engine: Arc::new(engine),
            vision,
            geo,
            ledger,
            last_scan: Arc::new(LastScanStore::new()),
            cache,
            policy,
            default_country: default_country.to_string(),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Multiplier endpoints
        // IMPORTANT: batch route must come before :country route
        .route("/api/multiplier/batch", post(get_multipliers_batch))
        .route("/api/multiplier/:country", get(get_multiplier))

        // Reward pipeline
        .route("/process_detection", post(process_detection))
        .route("/api/last-scan", get(get_last_scan))
        .route("/confirm_recycle", post(confirm_recycle))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BatchMultiplierRequest {
    pub countries: Vec<String>,
}

/// Output of the external detector for one frame
#[derive(Debug, Deserialize)]
pub struct DetectionRequest {
    /// Number of boxes the detector reported
    pub detections: usize,
    /// Annotated JPEG frame, base64
    #[serde(default)]
    pub image_base64: String,
    pub collector_wallet: String,
    /// Skips geolocation when present
    pub country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRecycleRequest {
    pub nft_address: String,
    pub collector_wallet: String,
    /// Reward in SOL
    pub amount: f64,
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "countries": state.engine.len(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_multiplier(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let country = normalize_country(&country);
    let cache_key = format!("multiplier:{}", country);

    if let Some(cached) = state.cache.get(&cache_key).await {
        tracing::debug!("Cache hit for {}", cache_key);
        return Ok(Json(cached));
    }

    let (multiplier, breakdown) = state.engine.get_multiplier(&country)?;
    let result = serde_json::json!({
        "country": country,
        "known": state.engine.contains(&country),
        "multiplier": multiplier,
        "breakdown": breakdown,
    });

    state.cache.insert(cache_key, result.clone()).await;

    Ok(Json(result))
}

async fn get_multipliers_batch(
    State(state): State<AppState>,
    Json(payload): Json<BatchMultiplierRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let engine = state.engine.clone();
    let codes: Vec<String> = payload.countries.iter().map(|c| normalize_country(c)).collect();

    tracing::info!("Batch multiplier lookup for {} countries", codes.len());

    let results = run_blocking(move || engine.multipliers_for(&codes)).await?;

    let data: Vec<serde_json::Value> = results
        .into_iter()
        .map(|(country, result)| match result {
            Ok((multiplier, breakdown)) => serde_json::json!({
                "country": country,
                "multiplier": multiplier,
                "breakdown": breakdown,
            }),
            Err(e) => serde_json::json!({
                "country": country,
                "error": e.to_string(),
            }),
        })
        .collect();

    Ok(Json(serde_json::json!({
        "rows": data.len(),
        "data": data,
    })))
}

async fn process_detection(
    State(state): State<AppState>,
    Json(payload): Json<DetectionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if payload.detections == 0 {
        return Ok(Json(serde_json::json!({
            "status": "no_debris",
            "message": "No debris detected in frame"
        })));
    }

    if payload.collector_wallet.trim().is_empty() {
        return Err(AppError::BadRequest("collector_wallet is required".to_string()));
    }

    let image = base64::decode(payload.image_base64.trim())
        .map_err(|e| AppError::BadRequest(format!("image_base64 is not valid base64: {}", e)))?;
    if image.is_empty() {
        return Err(AppError::BadRequest("image_base64 is empty".to_string()));
    }

    tracing::info!("Processing detection with {} boxes", payload.detections);

    // Weight estimate from the vision model
    let vision = state.vision.clone();
    let reply = run_blocking(move || vision.analyze(&image, WEIGHT_PROMPT))
        .await?
        .map_err(|e| AppError::Upstream(format!("Vision analysis failed: {}", e)))?;
    let analysis = parse_weight_analysis(&reply)
        .map_err(|e| AppError::Upstream(format!("Vision analysis failed: {}", e)))?;

    // Country: explicit, else geolocated, else the configured default
    let country = match payload.country_code.as_deref().map(normalize_country) {
        Some(code) if !code.is_empty() => code,
        _ => {
            let geo = state.geo.clone();
            match run_blocking(move || geo.country_code()).await? {
                Ok(code) => code,
                Err(e) => {
                    tracing::warn!("Geolocation failed ({}), using {}", e, state.default_country);
                    state.default_country.clone()
                }
            }
        }
    };

    let (multiplier, breakdown) = state.engine.get_multiplier(&country)?;
    let quote = state.policy.quote(analysis.total_weight, multiplier);

    tracing::info!(
        "Scan in {}: {:.3} kg × {:.2} → {:.6} SOL",
        country,
        quote.total_kg,
        multiplier,
        quote.reward_sol
    );

    let nft_address = if quote.is_payable() {
        let ledger = state.ledger.clone();
        let owner = payload.collector_wallet.clone();
        let metadata = CertificateMetadata::for_collection(quote.total_kg, &country, multiplier, quote.reward_sol);
        let asset_id = run_blocking(move || ledger.mint_certificate(&owner, &metadata))
            .await?
            .map_err(|e| AppError::Upstream(format!("Certificate mint failed: {}", e)))?;
        Some(asset_id)
    } else {
        None
    };

    let scan = ScanResult {
        location: country,
        weight: quote.total_kg,
        multiplier,
        breakdown,
        reward_sol: quote.reward_sol,
        lamports: quote.lamports,
        nft_address,
        collector_wallet: payload.collector_wallet,
        items: analysis.items,
    };
    state.last_scan.record(scan.clone());

    Ok(Json(serde_json::json!({
        "status": "success",
        "location": scan.location,
        "weight": scan.weight,
        "multiplier": scan.multiplier,
        "breakdown": scan.breakdown,
        "reward_sol": scan.reward_sol,
        "lamports": scan.lamports,
        "nft_address": scan.nft_address,
        "collector_wallet": scan.collector_wallet,
        "items": scan.items,
    })))
}

async fn get_last_scan(State(state): State<AppState>) -> Result<Json<ScanResult>, AppError> {
    state
        .last_scan
        .latest()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No scan recorded yet".to_string()))
}

async fn confirm_recycle(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmRecycleRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let nft_address = payload.nft_address.trim().to_string();
    let wallet = payload.collector_wallet.trim().to_string();

    if nft_address.is_empty() || wallet.is_empty() {
        return Err(AppError::BadRequest("nft_address and collector_wallet are required".to_string()));
    }

    let lamports = state.policy.lamports_for(payload.amount);
    if lamports == 0 {
        return Err(AppError::BadRequest(format!("amount must be positive, got {}", payload.amount)));
    }

    // Keep the original attributes when the certificate came from the last scan
    let metadata = match state.last_scan.latest() {
        Some(scan) if scan.nft_address.as_deref() == Some(nft_address.as_str()) => {
            CertificateMetadata::for_collection(scan.weight, &scan.location, scan.multiplier, scan.reward_sol)
                .with_status(STATUS_RECYCLED)
        }
        _ => CertificateMetadata::recycled(&nft_address),
    };
    let memo = transfer_memo(&nft_address, payload.amount);

    tracing::info!("Recycling confirmed for {}, paying {} lamports to {}", nft_address, lamports, wallet);

    let ledger = state.ledger.clone();
    let (certificate_signature, signature) = run_blocking(move || {
        let update = ledger.update_certificate(&nft_address, &metadata)?;
        let transfer = ledger.transfer(&wallet, lamports, &memo)?;
        Ok::<_, crate::services::ServiceError>((update, transfer))
    })
    .await?
    .map_err(|e| AppError::Upstream(format!("Payout failed: {}", e)))?;

    // Paid certificates leave the slot
    if state.last_scan.take_certificate(payload.nft_address.trim()).is_some() {
        tracing::debug!("Cleared last scan after payout");
    }

    Ok(Json(serde_json::json!({
        "status": "success",
        "signature": signature,
        "certificate_signature": certificate_signature,
        "lamports": lamports,
    })))
}

// ============================================================================
// Helpers
// ============================================================================

fn normalize_country(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Run blocking work (external HTTP calls, rayon batches) off the async workers
async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Computation(ComputationError),
    Upstream(String),
    Internal(String),
}

impl From<ComputationError> for AppError {
    fn from(e: ComputationError) -> Self {
        AppError::Computation(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Computation(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!("{}: {}", status, message);
        }

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

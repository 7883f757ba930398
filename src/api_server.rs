// Axum API Server Module
//
// Purpose: REST API over the crop predictor
// Prediction is CPU-bound and runs on the blocking pool; responses are cached
// per canonical input and the cache is dropped on model reload.

#[cfg(feature = "api")]
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};

#[cfg(feature = "api")]
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};

#[cfg(feature = "api")]
use moka::future::Cache;

#[cfg(feature = "api")]
use serde::Deserialize;

#[cfg(feature = "api")]
use std::sync::{Arc, RwLock};

#[cfg(feature = "api")]
use std::time::Duration;

#[cfg(feature = "api")]
use crate::config::AdvisorConfig;

#[cfg(feature = "api")]
use crate::features::FeatureInput;

#[cfg(feature = "api")]
use crate::predictor::CropPredictor;

/// Maximum inputs accepted by the batch endpoint
#[cfg(feature = "api")]
pub const MAX_BATCH_SIZE: usize = 1000;

// ============================================================================
// Application State
// ============================================================================

/// Predictor plus the reload generation it belongs to
#[cfg(feature = "api")]
#[derive(Clone)]
struct PredictorSlot {
    generation: u64,
    predictor: Arc<CropPredictor>,
}

#[cfg(feature = "api")]
#[derive(Clone)]
pub struct AppState {
    /// Swapped wholesale on reload; in-flight requests keep their snapshot
    slot: Arc<RwLock<PredictorSlot>>,
    pub cache: Cache<String, serde_json::Value>,
    pub config: Arc<AdvisorConfig>,
}

#[cfg(feature = "api")]
impl AppState {
    pub async fn new(config: AdvisorConfig) -> anyhow::Result<Self> {
        tracing::info!("Loading model context from {:?}...", config.model_dir);
        let loader = config.clone();
        let predictor = tokio::task::spawn_blocking(move || loader.build_predictor()).await?;
        tracing::info!("Predictor ready (model: {})", predictor.model_version());

        Ok(Self::from_predictor(predictor, config))
    }

    pub fn from_predictor(predictor: CropPredictor, config: AdvisorConfig) -> Self {
        tracing::info!("Initializing Moka cache...");
        let cache = Cache::builder()
            .max_capacity(10_000) // 10K entries
            .time_to_live(Duration::from_secs(300)) // 5 min TTL
            .build();

        Self {
            slot: Arc::new(RwLock::new(PredictorSlot { generation: 0, predictor: Arc::new(predictor) })),
            cache,
            config: Arc::new(config),
        }
    }

    /// Current predictor snapshot
    pub fn predictor(&self) -> Arc<CropPredictor> {
        self.snapshot().1
    }

    /// Reload generation and predictor, read together
    pub fn snapshot(&self) -> (u64, Arc<CropPredictor>) {
        let slot = match self.slot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        (slot.generation, slot.predictor)
    }

    /// Install a new predictor and bump the generation
    fn replace_predictor(&self, predictor: CropPredictor) -> u64 {
        let predictor = Arc::new(predictor);
        let mut slot = match self.slot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.generation += 1;
        slot.predictor = predictor;
        slot.generation
    }
}

// ============================================================================
// Router
// ============================================================================

#[cfg(feature = "api")]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Model status and reload
        .route("/api/model", get(model_status))
        .route("/api/model/reload", post(reload_model))

        // Prediction endpoints
        .route("/api/predict", post(predict))
        .route("/api/predict/batch", post(predict_batch))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new()) // gzip + brotli compression
        .layer(CorsLayer::permissive()) // Allow all origins (adjust for production)
        .layer(TraceLayer::new_for_http()) // Request logging
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

#[cfg(feature = "api")]
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[cfg(feature = "api")]
async fn model_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(state.predictor().status()))
}

/// Rank crops for one input
#[cfg(feature = "api")]
async fn predict(
    State(state): State<AppState>,
    Json(input): Json<FeatureInput>,
) -> Result<Json<serde_json::Value>, AppError> {
    // Results computed before a reload land under the old generation's key
    let (generation, predictor) = state.snapshot();
    let cache_key = prediction_cache_key(generation, &input).map_err(|e| AppError::Internal(e.to_string()))?;

    // Check cache
    if let Some(cached) = state.cache.get(&cache_key).await {
        tracing::debug!("Cache hit for prediction");
        return Ok(Json(cached));
    }

    // CPU-bound work: run in blocking thread pool
    let (model_version, recommendations) = tokio::task::spawn_blocking(move || {
        (predictor.model_version(), predictor.predict(&input))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?;

    tracing::info!("Predicted {} crops (model: {})", recommendations.len(), model_version);

    let result = serde_json::json!({
        "model_version": model_version,
        "recommendations": recommendations,
    });

    // Cache result
    state.cache.insert(cache_key, result.clone()).await;

    Ok(Json(result))
}

/// Rank crops for many inputs; results are in input order
#[cfg(feature = "api")]
async fn predict_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchPredictRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.inputs.is_empty() {
        return Err(AppError::BadRequest("inputs must not be empty".to_string()));
    }
    if req.inputs.len() > MAX_BATCH_SIZE {
        return Err(AppError::BadRequest(format!(
            "batch of {} exceeds the limit of {}",
            req.inputs.len(),
            MAX_BATCH_SIZE
        )));
    }

    let count = req.inputs.len();
    tracing::info!("Predicting batch of {} inputs", count);

    let predictor = state.predictor();
    let (model_version, results) = tokio::task::spawn_blocking(move || {
        (predictor.model_version(), predictor.predict_batch(&req.inputs))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?;

    Ok(Json(serde_json::json!({
        "model_version": model_version,
        "count": count,
        "results": results,
    })))
}

/// Reload artifacts from the configured model directory
#[cfg(feature = "api")]
async fn reload_model(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let config = state.config.clone();
    tracing::info!("Reloading model context from {:?}", config.model_dir);

    let predictor = tokio::task::spawn_blocking(move || config.build_predictor())
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?;

    let status = predictor.status();
    let generation = state.replace_predictor(predictor);
    state.cache.invalidate_all();
    tracing::info!("Model reloaded (model: {}, generation {})", status.model_version, generation);

    Ok(Json(serde_json::json!(status)))
}

/// Cache key for one prediction: reload generation plus canonical input JSON
#[cfg(feature = "api")]
pub fn prediction_cache_key(generation: u64, input: &FeatureInput) -> Result<String, serde_json::Error> {
    Ok(format!("predict:{}:{}", generation, serde_json::to_string(input)?))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[cfg(feature = "api")]
#[derive(Debug, Deserialize)]
struct BatchPredictRequest {
    inputs: Vec<FeatureInput>,
}

// ============================================================================
// Error Handling
// ============================================================================

#[cfg(feature = "api")]
#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Internal(String),
}

#[cfg(feature = "api")]
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

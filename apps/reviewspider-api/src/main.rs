use anyhow::Context;
use axum::{
    extract::{Json, Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use reviewspider_core::scraper::{ReviewRequest, ReviewScraper};
use reviewspider_core::storage::{PersistenceGateway, StoreOutcome};
use reviewspider_core::{Config, Dataset, ReviewError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reviewspider_api=debug,reviewspider_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    let gateway = Arc::new(PersistenceGateway::connect(&config.store).await);

    let app_state = Arc::new(AppState {
        config,
        gateway,
        run_lock: Mutex::new(()),
    });

    let app = Router::new()
        .route("/health", get(health))
        .nest(
            "/v1",
            Router::new()
                .route("/reviews", post(collect_reviews))
                .route("/reviews/:product", get(get_reviews))
                .route("/products", get(list_products))
                .layer(middleware::from_fn(auth)),
        )
        .with_state(app_state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn auth(req: Request, next: Next) -> Result<Response, StatusCode> {
    // If API_KEY is not set, allow all requests (for development)
    let Ok(api_key) = std::env::var("API_KEY") else {
        return Ok(next.run(req).await);
    };

    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    if let Some(auth_header) = auth_header {
        if auth_header == format!("Bearer {}", api_key) {
            return Ok(next.run(req).await);
        }
    }

    Err(StatusCode::UNAUTHORIZED)
}

struct AppState {
    config: Config,
    gateway: Arc<PersistenceGateway>,
    /// One browser run at a time.
    run_lock: Mutex<()>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewsResponse {
    success: bool,
    data: Option<Dataset>,
    stored: Option<StoreOutcome>,
    error: Option<String>,
}

impl ReviewsResponse {
    fn ok(data: Dataset, stored: Option<StoreOutcome>) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            stored,
            error: None,
        })
    }

    fn failed(error: &ReviewError) -> (StatusCode, Json<Self>) {
        (
            status_for(error),
            Json(Self {
                success: false,
                data: None,
                stored: None,
                error: Some(error.to_string()),
            }),
        )
    }
}

fn status_for(error: &ReviewError) -> StatusCode {
    match error {
        ReviewError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ReviewError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Deserialize)]
struct CollectRequest {
    product: String,
    count: usize,
}

async fn collect_reviews(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CollectRequest>,
) -> Result<Json<ReviewsResponse>, (StatusCode, Json<ReviewsResponse>)> {
    let request = ReviewRequest::new(req.product, req.count);

    let dataset = {
        let _run = state.run_lock.lock().await;
        let scraper = ReviewScraper::launch(&state.config)
            .await
            .map_err(|e| ReviewsResponse::failed(&e))?;
        scraper
            .collect(&request)
            .await
            .map_err(|e| ReviewsResponse::failed(&e))?
    };

    match state.gateway.store(&request.product_name, &dataset).await {
        Ok(outcome) => Ok(ReviewsResponse::ok(dataset, Some(outcome))),
        Err(e) => {
            // The reviews were collected; report them even though persisting failed.
            tracing::error!("Failed to store reviews for '{}': {}", request.product_name, e);
            Ok(Json(ReviewsResponse {
                success: false,
                data: Some(dataset),
                stored: None,
                error: Some(e.to_string()),
            }))
        }
    }
}

async fn get_reviews(
    State(state): State<Arc<AppState>>,
    Path(product): Path<String>,
) -> Result<Json<ReviewsResponse>, (StatusCode, Json<ReviewsResponse>)> {
    state
        .gateway
        .retrieve(&product)
        .await
        .map(|dataset| ReviewsResponse::ok(dataset, None))
        .map_err(|e| ReviewsResponse::failed(&e))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductsResponse {
    success: bool,
    offline: bool,
    products: Vec<String>,
    error: Option<String>,
}

async fn list_products(State(state): State<Arc<AppState>>) -> Json<ProductsResponse> {
    match state.gateway.known_products().await {
        Ok(keys) => Json(ProductsResponse {
            success: true,
            offline: state.gateway.is_offline(),
            products: keys.iter().map(|key| key.display_name()).collect(),
            error: None,
        }),
        Err(e) => Json(ProductsResponse {
            success: false,
            offline: state.gateway.is_offline(),
            products: vec![],
            error: Some(e.to_string()),
        }),
    }
}

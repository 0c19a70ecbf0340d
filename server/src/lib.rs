use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use reelmatch_core::{CatalogItem, Error, ModelHandle, Recommender, ResolverConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct TitleParams {
    pub title: String,
}

#[derive(Deserialize)]
pub struct RecommendParams {
    pub title: String,
    #[serde(default = "default_n")]
    pub n: i64,
}
fn default_n() -> i64 { 10 }

#[derive(Serialize)]
pub struct MovieDetail {
    pub id: String,
    pub title: String,
    pub alternate_title: Option<String>,
    pub release_year: Option<i32>,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<String>,
    pub rating: Option<f32>,
    pub vote_count: u64,
    pub contributors: Vec<String>,
}

impl From<&CatalogItem> for MovieDetail {
    fn from(item: &CatalogItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            alternate_title: item.alternate_title.clone(),
            release_year: item.release_year,
            runtime_minutes: item.runtime_minutes,
            genres: item.genres.clone(),
            rating: item.rating,
            vote_count: item.vote_count,
            contributors: item.contributors.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct RecommendHit {
    pub id: String,
    pub title: String,
    pub release_year: Option<i32>,
    pub genres: Vec<String>,
    pub rating: Option<f32>,
    pub score: f32,
}

#[derive(Serialize)]
pub struct RecommendResponse {
    pub query: String,
    pub matched: MovieDetail,
    pub took_s: f64,
    pub results: Vec<RecommendHit>,
}

#[derive(Clone)]
pub struct AppState {
    pub model: ModelHandle,
    pub artifact: PathBuf,
    pub resolver: ResolverConfig,
    pub admin_token: Option<String>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(err: Error) -> ApiError {
    let status = match &err {
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::InvalidQuery { .. } | Error::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

pub fn build_app(artifact: PathBuf, resolver: ResolverConfig) -> Result<Router> {
    // Refuse to start without a valid model.
    let recommender = Recommender::load(&artifact, resolver.clone())?;
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(router(AppState { model: ModelHandle::new(recommender), artifact, resolver, admin_token }))
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/recommend", get(recommend_handler))
        .route("/movie/:id", get(movie_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<TitleParams>) -> Result<Json<MovieDetail>, ApiError> {
    let model = state.model.snapshot();
    let hit = model.resolve(&params.title).map_err(api_error)?;
    let item = model.item(hit.row).ok_or_else(|| api_error(Error::NotFound { query: hit.id.clone() }))?;
    Ok(Json(MovieDetail::from(item)))
}

pub async fn recommend_handler(State(state): State<AppState>, Query(params): Query<RecommendParams>) -> Result<Json<RecommendResponse>, ApiError> {
    let start = std::time::Instant::now();
    let model = state.model.snapshot();
    let hit = model.resolve(&params.title).map_err(api_error)?;
    let neighbors = model.recommend(hit.row, params.n).map_err(api_error)?;
    let matched = model.item(hit.row).map(MovieDetail::from).ok_or_else(|| api_error(Error::NotFound { query: hit.id.clone() }))?;

    let results = neighbors
        .into_iter()
        .map(|n| {
            let item = model.item_by_id(&n.id);
            RecommendHit {
                release_year: item.and_then(|i| i.release_year),
                genres: item.map(|i| i.genres.clone()).unwrap_or_default(),
                rating: item.and_then(|i| i.rating),
                id: n.id,
                title: n.title,
                score: n.score,
            }
        })
        .collect();

    Ok(Json(RecommendResponse { query: params.title, matched, took_s: start.elapsed().as_secs_f64(), results }))
}

pub async fn movie_handler(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<MovieDetail>, ApiError> {
    let model = state.model.snapshot();
    match model.item_by_id(&id) {
        Some(item) => Ok(Json(MovieDetail::from(item))),
        None => Err(api_error(Error::NotFound { query: id })),
    }
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let artifact = state.artifact.clone();
    let resolver = state.resolver.clone();
    let handle = state.model.clone();
    let previous = tokio::task::spawn_blocking(move || handle.reload(&artifact, resolver))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({ "error": e.to_string() }))))?
        .map_err(api_error)?;
    let current = state.model.snapshot();
    Ok(Json(serde_json::json!({
        "previous_rows": previous.model().num_rows(),
        "rows": current.model().num_rows(),
        "terms": current.model().vocabulary.len(),
    })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let unauthorized = |msg: &str| (StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "error": msg })));
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(unauthorized("ADMIN_TOKEN not set")),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(unauthorized("invalid admin token"))
    }
}

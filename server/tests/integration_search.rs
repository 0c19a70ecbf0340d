use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use reelmatch_core::catalog::GenreField;
use reelmatch_core::{
    save_model, Catalog, CatalogRecord, FeatureBuilder, FeatureConfig, ModelHandle, Recommender, ResolverConfig, TrainedModel,
    VectorizerConfig,
};
use serde_json::Value;
use server::{router, AppState};
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

fn movie(id: &str, title: &str, genres: &[&str], director: &str, year: i64, votes: i64) -> CatalogRecord {
    CatalogRecord {
        id: id.into(),
        title: title.into(),
        genres: GenreField::List(genres.iter().map(|g| g.to_string()).collect()),
        contributors: vec![director.into()],
        release_year: Some(year),
        vote_count: Some(votes),
        rating: Some(8.0),
        ..Default::default()
    }
}

fn build_tiny_artifact(path: &Path, records: Vec<CatalogRecord>) {
    let catalog = Catalog::from_records(records, &FeatureBuilder::default(), 0).unwrap();
    let model = TrainedModel::fit(catalog, FeatureConfig::default(), VectorizerConfig::default()).unwrap();
    save_model(&model, path).unwrap();
}

fn films() -> Vec<CatalogRecord> {
    vec![
        movie("tt1375666", "Inception", &["Sci-Fi", "Thriller"], "Christopher Nolan", 2010, 2_400_000),
        movie("tt0816692", "Interstellar", &["Sci-Fi", "Drama"], "Christopher Nolan", 2014, 2_000_000),
        movie("tt0109830", "Forrest Gump", &["Drama", "Romance"], "Robert Zemeckis", 1994, 2_200_000),
    ]
}

fn app_for(artifact: &Path, admin_token: Option<&str>) -> Router {
    let recommender = Recommender::load(artifact, ResolverConfig::default()).unwrap();
    router(AppState {
        model: ModelHandle::new(recommender),
        artifact: artifact.to_path_buf(),
        resolver: ResolverConfig::default(),
        admin_token: admin_token.map(str::to_string),
    })
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    call(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn recommend_returns_ranked_neighbors() {
    let dir = tempdir().unwrap();
    let artifact = dir.path().join("model.bin");
    build_tiny_artifact(&artifact, films());
    let app = server::build_app(artifact, ResolverConfig::default()).unwrap();

    let (status, json) = get(app, "/recommend?title=%20inception%20&n=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["matched"]["id"], "tt1375666");
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["title"], "Interstellar");
    assert!(results[0]["score"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn error_statuses_follow_failure_kind() {
    let dir = tempdir().unwrap();
    let artifact = dir.path().join("model.bin");
    build_tiny_artifact(&artifact, films());
    let app = app_for(&artifact, None);

    let (status, json) = get(app.clone(), "/search?title=Nonexistent%20Movie%20Title%20Xyz").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("nonexistent movie title xyz"));

    let (status, _) = get(app.clone(), "/recommend?title=inception&n=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app.clone(), "/search?title=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app, "/movie/tt0000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_and_detail_agree() {
    let dir = tempdir().unwrap();
    let artifact = dir.path().join("model.bin");
    build_tiny_artifact(&artifact, films());
    let app = app_for(&artifact, None);

    let (status, found) = get(app.clone(), "/search?title=forest%20gump").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], "tt0109830");

    let (status, detail) = get(app, "/movie/tt0109830").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["title"], "Forrest Gump");
    assert_eq!(detail["contributors"][0], "Robert Zemeckis");
}

#[tokio::test]
async fn reload_requires_token_and_swaps_model() {
    let dir = tempdir().unwrap();
    let artifact = dir.path().join("model.bin");
    build_tiny_artifact(&artifact, films());
    let app = app_for(&artifact, Some("secret"));

    let denied = Request::post("/admin/reload").header("X-ADMIN-TOKEN", "wrong").body(Body::empty()).unwrap();
    let (status, _) = call(app.clone(), denied).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut more = films();
    more.push(movie("tt0482571", "The Prestige", &["Drama", "Mystery"], "Christopher Nolan", 2006, 1_400_000));
    build_tiny_artifact(&artifact, more);

    let allowed = Request::post("/admin/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, json) = call(app.clone(), allowed).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["previous_rows"], 3);
    assert_eq!(json["rows"], 4);

    let (status, found) = get(app, "/search?title=the%20prestige").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], "tt0482571");
}

#[tokio::test]
async fn startup_fails_without_artifact() {
    let dir = tempdir().unwrap();
    assert!(server::build_app(dir.path().join("missing.bin"), ResolverConfig::default()).is_err());
}

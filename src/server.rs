use crate::config::AppConfig;
use crate::raster::{build_index, locate, RegionIndex};
use crate::render::ChoroplethMap;
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub struct AppState {
    pub map: ChoroplethMap,
    pub tree: RTree<RegionIndex>,
    pub html: String,
    pub figure: String,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct ZoneResponse {
    zone: String,
    count: u64,
}

impl AppState {
    pub fn new(map: ChoroplethMap, title: &str) -> Result<Self> {
        let html = map.to_html(title).context("Failed to build viewer page")?;
        let figure = map.to_figure_json().context("Failed to serialize figure")?;
        let tree = build_index(&map.regions);
        Ok(Self {
            map,
            tree,
            html,
            figure,
        })
    }
}

pub fn router(state: Arc<AppState>, files_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/figure", get(figure_handler))
        .route("/api/zone", get(zone_handler))
        .nest_service("/files", ServeDir::new(files_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: &AppConfig, map: ChoroplethMap) -> Result<()> {
    let title = format!("{} cases on {}", config.filter.category, config.filter.date);
    let state = Arc::new(AppState::new(map, &title)?);
    info!("Indexed {} regions for point lookup", state.map.regions.len());

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let app = router(state, &config.output.dir());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.html.clone())
}

async fn figure_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        state.figure.clone(),
    )
}

async fn zone_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<ZoneResponse>> {
    let region = locate(&state.tree, &state.map.regions, params.lon, params.lat);
    Json(region.map(|r| ZoneResponse {
        zone: r.zone.clone(),
        count: r.count,
    }))
}

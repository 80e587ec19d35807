use crate::clustering::{concentration_map, MAX_RADIUS_M};
use crate::config::AppConfig;
use crate::stats::{summarize, StatsSummary};
use crate::types::{ConcentrationCircle, EntryRecord, Viewport};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use geo::{HaversineDistance, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

// Rough degrees-per-meter at mid latitudes, only used to size envelopes.
const DEG_PER_METER: f64 = 1.0 / 111_320.0;

// Wrapper for RTree indexing
struct CircleIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CircleIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub circles: Vec<ConcentrationCircle>,
    pub viewport: Viewport,
    pub stats: StatsSummary,
    pub tree: RTree<CircleIndex>,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CirclesResponse {
    circles: Vec<ConcentrationCircle>,
    viewport: Viewport,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMatch {
    distance_m: f64,
    circle: ConcentrationCircle,
}

pub async fn start_server(config: AppConfig, entries: Vec<EntryRecord>) -> Result<()> {
    let outcome = concentration_map(&entries, &config.map);
    let stats = summarize(&entries);
    println!(
        "Computed {} concentration circles from {} entries",
        outcome.circles.len(),
        entries.len()
    );

    // Spatial index over circle extents for the popup lookup endpoint.
    let tree_items: Vec<CircleIndex> = outcome
        .circles
        .iter()
        .enumerate()
        .map(|(i, circle)| {
            let half = circle.radius * DEG_PER_METER;
            let [lat, lng] = circle.center;
            CircleIndex {
                index: i,
                aabb: AABB::from_corners([lat - half, lng - half], [lat + half, lng + half]),
            }
        })
        .collect();
    let tree = RTree::bulk_load(tree_items);

    let state = Arc::new(AppState {
        circles: outcome.circles,
        viewport: outcome.viewport,
        stats,
        tree,
    });

    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    println!("Starting server on http://{}", addr);

    let tile_service = ServeDir::new(&config.output.tile_dir);

    let app = Router::new()
        .route("/api/circles", get(circles_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/query", get(query_handler))
        .nest_service("/tiles", tile_service)
        .nest_service("/", ServeDir::new("."))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn circles_handler(State(state): State<Arc<AppState>>) -> Json<CirclesResponse> {
    Json(CirclesResponse {
        circles: state.circles.clone(),
        viewport: state.viewport,
    })
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<StatsSummary> {
    Json(state.stats.clone())
}

/// Circles covering the queried point, nearest anchor first. Backs the
/// map popup: click a location, get the cluster details under it.
async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Vec<QueryMatch>> {
    let query_point = Point::new(params.lon, params.lat);
    // Envelope padded by the largest possible circle, then verified
    // against each candidate's true radius.
    let half = MAX_RADIUS_M * DEG_PER_METER;
    let envelope = AABB::from_corners(
        [params.lat - half, params.lon - half],
        [params.lat + half, params.lon + half],
    );

    let mut matches: Vec<QueryMatch> = state
        .tree
        .locate_in_envelope_intersecting(&envelope)
        .filter_map(|candidate| {
            let circle = state.circles.get(candidate.index)?;
            let center = Point::new(circle.center[1], circle.center[0]);
            let distance_m = query_point.haversine_distance(&center);
            (distance_m <= circle.radius).then(|| QueryMatch {
                distance_m,
                circle: circle.clone(),
            })
        })
        .collect();

    matches.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
    Json(matches)
}

//! rpqcheck_api: REST façade over the regular-path-constraint engine.
//!
//! Endpoints (JSON unless noted):
//! - GET  /api/health                       -> { status }
//! - GET  /api/graph/stats                  -> { nodes, relationships }
//! - GET  /api/nodes                        -> first 200 nodes of the active graph
//! - GET  /api/relationships                -> first 200 edges of the active graph
//! - GET  /api/schema?db=<name>             -> { labels, rel_types }
//! - GET  /api/instances                    -> { instances }
//! - POST /api/instances/select/:name       -> { selected } (404 on unknown)
//! - GET  /api/instances/current            -> { current }
//! - POST /api/rpq/check       { constraint }               -> inclusion report
//! - POST /api/measures/compute { constraints, measures? }  -> summary + details
//! - POST /api/constraints/validate { constraints }         -> { ok, errors }
//! - POST /api/constraints/save     { constraints }         -> { ok, file }
//! - GET  /api/constraints/files                            -> { files }
//! - GET  /api/constraints/file/:name                       -> the stored bundle
//! - POST /api/constraints/import   (multipart field "file") -> { constraints, ok, errors }
//!
//! Error mapping follows the engine's taxonomy: syntax problems are 400,
//! storage/probe problems are 500, unknown names are 404. Symbol-validation
//! failures are *not* transport errors; they come back inside the payload.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use rpqcheck::config::Settings;
use rpqcheck::store::{
    validate_bundle, BundleReport, ConstraintBundle, ConstraintStore, InstanceManager,
    StoreError,
};
use rpqcheck::{
    check_inclusion, compute_measures, EngineError, InclusionReport, MeasureName,
    MeasuresOutcome, MemoryGraph, NodeId,
};

// ------------------------------ State ------------------------------

#[derive(Clone)]
struct AppState {
    store: Arc<ConstraintStore>,
    instances: Arc<InstanceManager>,
    /// Instance name -> loaded, indexed graph. Entries are dropped when an
    /// instance is re-selected so edits to the document are picked up.
    graphs: Arc<RwLock<HashMap<String, Arc<MemoryGraph>>>>,
}

type Failure = (StatusCode, String);

fn store_failure(err: StoreError) -> Failure {
    match &err {
        StoreError::NoSuchBundle(_) | StoreError::UnknownInstance(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        StoreError::Io { .. } | StoreError::Malformed { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn engine_failure(err: EngineError) -> Failure {
    match &err {
        EngineError::Syntax(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        EngineError::Probe(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl AppState {
    fn graph(&self, name: &str) -> Result<Arc<MemoryGraph>, Failure> {
        if let Some(g) = self
            .graphs
            .read()
            .expect("graph cache lock poisoned")
            .get(name)
        {
            return Ok(g.clone());
        }
        let loaded = Arc::new(self.instances.load(name).map_err(store_failure)?);
        self.graphs
            .write()
            .expect("graph cache lock poisoned")
            .insert(name.to_owned(), loaded.clone());
        Ok(loaded)
    }

    fn active_graph(&self) -> Result<Arc<MemoryGraph>, Failure> {
        let name = self.instances.current_or_default();
        self.graph(&name)
    }
}

// ------------------------------ Types ------------------------------

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
struct GraphStats {
    nodes: usize,
    relationships: usize,
}

#[derive(Serialize)]
struct NodeView {
    id: NodeId,
    labels: Vec<String>,
    props: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
struct RelView {
    start: NodeId,
    #[serde(rename = "type")]
    rel_type: String,
    end: NodeId,
}

#[derive(Serialize)]
struct SchemaView {
    labels: Vec<String>,
    rel_types: Vec<String>,
}

#[derive(Deserialize)]
struct SchemaQuery {
    db: Option<String>,
}

#[derive(Deserialize)]
struct CheckRequest {
    constraint: String,
}

#[derive(Deserialize)]
struct MeasuresRequest {
    constraints: Vec<String>,
    #[serde(default)]
    measures: Option<Vec<MeasureName>>,
}

#[derive(Serialize)]
struct SaveResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<rpqcheck::store::BundleIssue>,
}

#[derive(Serialize)]
struct ImportResponse {
    constraints: Vec<String>,
    ok: bool,
    errors: Vec<rpqcheck::store::BundleIssue>,
}

const BROWSE_LIMIT: usize = 200;

// ------------------------------ Handlers ------------------------------

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn graph_stats(State(state): State<AppState>) -> Result<Json<GraphStats>, Failure> {
    let g = state.active_graph()?;
    Ok(Json(GraphStats {
        nodes: g.node_count(),
        relationships: g.edge_count(),
    }))
}

async fn list_nodes(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, Failure> {
    let g = state.active_graph()?;
    let nodes: Vec<NodeView> = g
        .nodes()
        .take(BROWSE_LIMIT)
        .map(|n| NodeView {
            id: n.id.clone(),
            labels: n.labels.clone(),
            props: n.props.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        })
        .collect();
    Ok(Json(serde_json::json!({ "nodes": nodes })))
}

async fn list_relationships(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, Failure> {
    let g = state.active_graph()?;
    let rels: Vec<RelView> = g
        .edges()
        .iter()
        .take(BROWSE_LIMIT)
        .map(|e| RelView {
            start: e.from.clone(),
            rel_type: e.label.clone(),
            end: e.to.clone(),
        })
        .collect();
    Ok(Json(serde_json::json!({ "relationships": rels })))
}

async fn schema(
    State(state): State<AppState>,
    Query(query): Query<SchemaQuery>,
) -> Result<Json<SchemaView>, Failure> {
    let g = match query.db {
        Some(name) => state.graph(&name)?,
        None => state.active_graph()?,
    };
    Ok(Json(SchemaView {
        labels: g.labels().into_iter().collect(),
        rel_types: g.relationship_types().into_iter().collect(),
    }))
}

async fn instances_list(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, Failure> {
    let instances = state.instances.list().map_err(store_failure)?;
    Ok(Json(serde_json::json!({ "instances": instances })))
}

async fn instance_select(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, Failure> {
    state.instances.set_active(&name).map_err(store_failure)?;
    // Drop any cached copy so the next request re-reads the document.
    state
        .graphs
        .write()
        .expect("graph cache lock poisoned")
        .remove(&name);
    info!(instance = %name, "active graph instance selected");
    Ok(Json(serde_json::json!({ "selected": name })))
}

async fn instance_current(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, Failure> {
    Ok(Json(
        serde_json::json!({ "current": state.instances.current_or_default() }),
    ))
}

async fn rpq_check(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<InclusionReport>, Failure> {
    let g = state.active_graph()?;
    check_inclusion(g.as_ref(), &req.constraint)
        .map(Json)
        .map_err(engine_failure)
}

async fn measures_compute(
    State(state): State<AppState>,
    Json(req): Json<MeasuresRequest>,
) -> Result<Json<MeasuresOutcome>, Failure> {
    let g = state.active_graph()?;
    let requested = req.measures.unwrap_or_else(|| MeasureName::ALL.to_vec());
    compute_measures(g.as_ref(), &req.constraints, &requested)
        .map(Json)
        .map_err(engine_failure)
}

async fn constraints_validate(Json(bundle): Json<ConstraintBundle>) -> Json<BundleReport> {
    Json(validate_bundle(&bundle))
}

async fn constraints_save(
    State(state): State<AppState>,
    Json(bundle): Json<ConstraintBundle>,
) -> Result<Json<SaveResponse>, Failure> {
    let report = validate_bundle(&bundle);
    if !report.ok {
        return Ok(Json(SaveResponse { ok: false, file: None, errors: report.errors }));
    }
    let file = state.store.save(&bundle).map_err(store_failure)?;
    Ok(Json(SaveResponse { ok: true, file: Some(file), errors: Vec::new() }))
}

async fn constraints_files(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, Failure> {
    let files = state.store.list().map_err(store_failure)?;
    Ok(Json(serde_json::json!({ "files": files })))
}

async fn constraints_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ConstraintBundle>, Failure> {
    state.store.load(&name).map(Json).map_err(store_failure)
}

async fn constraints_import(mut multipart: Multipart) -> Result<Json<ImportResponse>, Failure> {
    let mut payload: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("multipart error: {e}")))?
    {
        if field.name() == Some("file") || payload.is_none() {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, format!("multipart error: {e}")))?;
            payload = Some(bytes.to_vec());
        }
    }
    let bytes = payload
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "missing multipart field 'file'".to_string()))?;
    let bundle: ConstraintBundle = serde_json::from_slice(&bytes).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("invalid bundle: expected {{\"constraints\": [...]}}: {e}"),
        )
    })?;
    let report = validate_bundle(&bundle);
    Ok(Json(ImportResponse {
        constraints: bundle.constraints,
        ok: report.ok,
        errors: report.errors,
    }))
}

// ------------------------------ Server ------------------------------

fn cors_layer(origins: &str) -> CorsLayer {
    if origins == "*" {
        warn!("CORS set to permissive mode (*)");
        CorsLayer::permissive()
    } else {
        let parsed: Vec<_> = origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        info!("CORS configured for origins: {parsed:?}");
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "rpqcheck_api=info,tower_http=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env();
    info!("starting rpqcheck API server");

    let store = Arc::new(ConstraintStore::open(settings.constraints_dir())?);
    let instances = Arc::new(InstanceManager::open(
        settings.graphs_dir(),
        settings.state_file(),
    )?);
    let state = AppState {
        store,
        instances,
        graphs: Arc::new(RwLock::new(HashMap::new())),
    };

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/graph/stats", get(graph_stats))
        .route("/api/nodes", get(list_nodes))
        .route("/api/relationships", get(list_relationships))
        .route("/api/schema", get(schema))
        .route("/api/instances", get(instances_list))
        .route("/api/instances/select/:name", post(instance_select))
        .route("/api/instances/current", get(instance_current))
        .route("/api/rpq/check", post(rpq_check))
        .route("/api/measures/compute", post(measures_compute))
        .route("/api/constraints/validate", post(constraints_validate))
        .route("/api/constraints/save", post(constraints_save))
        .route("/api/constraints/files", get(constraints_files))
        .route("/api/constraints/file/:name", get(constraints_file))
        .route("/api/constraints/import", post(constraints_import))
        .layer(DefaultBodyLimit::max(8 * 1024 * 1024))
        .with_state(state)
        .layer(cors_layer(&settings.cors_origins))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = settings.addr;
    info!("rpqcheck API listening on http://{addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

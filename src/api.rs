//! REST API for the stowage planning service.
//!
//! Provides HTTP endpoints for placement, retrieval, and return planning.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, PlannerConfig};
use crate::error::{PlanError, RejectedReason, UnplacedReason};
use crate::model::{
    Container, Dimensions, Item, MoveStep, Placement, RearrangementAction, RearrangementStep,
    RetrievalAction, RetrievalStep, ReturnAction, ReturnItem, ReturnManifest, ReturnStep,
    StowedItem, WasteReason,
};
use crate::planner::{PlacementPlan, plan_placement, plan_placement_with_progress};
use crate::retrieval::plan_retrieval;
use crate::returns::{ReturnPlan, plan_return};
use crate::types::{BoundingBox, Vec3};

#[derive(Clone)]
struct ApiState {
    planner_config: PlannerConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>stowage API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the placement endpoint.
///
/// `containers` is the occupancy snapshot the plan is computed against.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "items": [
            {
                "id": "ITM-001",
                "name": "Food Pack",
                "dimensions": { "width": 40.0, "depth": 40.0, "height": 40.0 },
                "mass": 5.0,
                "priority": 9,
                "usageLimit": 10,
                "preferredZone": "A"
            }
        ],
        "containers": [
            {
                "id": "CONT-A1",
                "zone": "A",
                "dimensions": { "width": 100.0, "depth": 100.0, "height": 100.0 }
            }
        ]
    })
)]
pub struct PlacementRequest {
    pub items: Vec<Item>,
    pub containers: Vec<Container>,
}

/// Request structure for the retrieval endpoint.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalRequest {
    #[schema(example = "ITM-001")]
    pub item_id: String,
    pub container: Container,
}

/// Request structure for the return endpoint.
///
/// `date` defaults to today (UTC) when omitted.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    #[schema(example = "CONT-UND")]
    pub container_id: String,
    #[schema(example = 100.0)]
    pub weight_limit: f64,
    pub waste_items: Vec<Item>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub date: Option<NaiveDate>,
}

/// Response structure for the placement endpoint.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlacementResponse {
    pub placements: Vec<Placement>,
    pub unplaced: Vec<UnplacedEntry>,
    pub rearrangements: Vec<RearrangementStep>,
    pub is_complete: bool,
}

/// An item the planner could not place, with a stable reason code.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnplacedEntry {
    pub item_id: String,
    pub reason_code: String,
    pub reason: String,
}

impl PlacementResponse {
    fn from_plan(plan: PlacementPlan) -> Self {
        let is_complete = plan.is_complete();
        Self {
            placements: plan.placements,
            unplaced: plan
                .unplaced
                .into_iter()
                .map(|entry| UnplacedEntry {
                    item_id: entry.item_id,
                    reason_code: entry.reason.code().to_string(),
                    reason: entry.reason.to_string(),
                })
                .collect(),
            rearrangements: plan.rearrangements,
            is_complete,
        }
    }
}

/// Response structure for the retrieval endpoint.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResponse {
    pub item_id: String,
    pub steps: Vec<RetrievalStep>,
}

/// Response structure for the return endpoint.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnResponse {
    pub manifest: ReturnManifest,
    pub moves: Vec<MoveStep>,
    pub steps: Vec<ReturnStep>,
    pub rejected: Vec<RejectedEntry>,
}

/// A waste candidate left out of the manifest, with a stable reason code.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectedEntry {
    pub item_id: String,
    pub reason_code: String,
    pub reason: String,
}

impl ReturnResponse {
    fn from_plan(plan: ReturnPlan) -> Self {
        Self {
            manifest: plan.manifest,
            moves: plan.moves,
            steps: plan.steps,
            rejected: plan
                .rejected
                .into_iter()
                .map(|entry| RejectedEntry {
                    item_id: entry.item_id,
                    reason_code: entry.reason.code().to_string(),
                    reason: entry.reason.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn plan_error_response(err: PlanError) -> Response {
    match &err {
        PlanError::InvalidInput(_) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid input data",
            err.to_string(),
        ),
        PlanError::ItemNotPlaced(_) => {
            error_response(StatusCode::NOT_FOUND, "Item not placed", err.to_string())
        }
        PlanError::NoWasteItems | PlanError::NoItemsFit => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "No plannable return",
            err.to_string(),
        ),
    }
}

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(err) => Err(json_deserialize_error(err)),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_placement,
        handle_placement_stream,
        handle_retrieval,
        handle_return
    ),
    components(
        schemas(
            PlacementRequest,
            RetrievalRequest,
            ReturnRequest,
            PlacementResponse,
            UnplacedEntry,
            RetrievalResponse,
            ReturnResponse,
            RejectedEntry,
            ErrorResponse,
            Item,
            Container,
            StowedItem,
            Dimensions,
            Vec3,
            BoundingBox,
            Placement,
            RearrangementAction,
            RearrangementStep,
            RetrievalAction,
            RetrievalStep,
            ReturnAction,
            ReturnStep,
            ReturnItem,
            ReturnManifest,
            MoveStep,
            WasteReason,
            UnplacedReason,
            RejectedReason
        )
    ),
    tags((name = "planning", description = "Endpoints for stowage planning"))
)]
struct ApiDoc;

/// Starts the API server.
///
/// Configures CORS for cross-origin requests and blocks until the server
/// is terminated.
pub async fn start_api_server(config: ApiConfig, planner_config: PlannerConfig) {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { planner_config };

    let app = Router::new()
        // API endpoints
        .route("/plan/placement", post(handle_placement))
        .route("/plan/placement/stream", post(handle_placement_stream))
        .route("/plan/retrieval", post(handle_retrieval))
        .route("/plan/return", post(handle_return))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            panic!("Could not bind API server to {}: {}", addr, err);
        }
    };

    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!("Endpoints: POST /plan/placement, /plan/placement/stream, /plan/retrieval, /plan/return");
    info!("Documentation: GET /docs, /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        error!("API server terminated with an error: {err}");
    }
}

/// Handler for the POST /plan/placement endpoint.
///
/// Plans positions for a batch of items against a container snapshot.
///
/// # Parameters
/// * `payload` - JSON payload with items and the container occupancy snapshot
///
/// # Returns
/// JSON response with placements, unplaced items, and rearrangement steps
#[utoipa::path(
    post,
    path = "/plan/placement",
    request_body = PlacementRequest,
    responses(
        (status = 200, description = "Placement plan computed", body = PlacementResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_placement(
    State(state): State<ApiState>,
    payload: Result<Json<PlacementRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        "New placement request: {} items, {} containers",
        request.items.len(),
        request.containers.len()
    );
    let plan = match plan_placement(request.items, request.containers, &state.planner_config) {
        Ok(plan) => plan,
        Err(err) => return plan_error_response(err),
    };
    info!(
        "Placement result: {} placed, {} unplaced, {} rearrangement steps",
        plan.placed_count(),
        plan.unplaced_count(),
        plan.rearrangements.len()
    );

    (StatusCode::OK, Json(PlacementResponse::from_plan(plan))).into_response()
}

/// Handler for the POST /plan/placement/stream endpoint (SSE).
///
/// Streams planning events in real-time as Server-Sent Events
/// (text/event-stream), so a client can visualize progress without waiting
/// for the complete plan.
#[utoipa::path(
    post,
    path = "/plan/placement/stream",
    request_body = PlacementRequest,
    responses(
        (
            status = 200,
            description = "Streams planning events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_placement_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PlacementRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);
    let planner_config = state.planner_config.clone();

    tokio::task::spawn_blocking(move || {
        let result = plan_placement_with_progress(
            request.items,
            request.containers,
            &planner_config,
            |evt| {
                if let Ok(json) = serde_json::to_string(evt) {
                    if tx.blocking_send(json).is_err() {
                        // Receiver has closed the stream; remaining events are discarded.
                        return;
                    }
                }
            },
        );
        if let Err(err) = result {
            error!("Streamed placement planning failed: {err}");
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for the POST /plan/retrieval endpoint.
///
/// Computes the minimum-disturbance step sequence to extract one item.
#[utoipa::path(
    post,
    path = "/plan/retrieval",
    request_body = RetrievalRequest,
    responses(
        (status = 200, description = "Retrieval plan computed", body = RetrievalResponse),
        (status = NOT_FOUND, description = "Item not placed in the container", body = ErrorResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_retrieval(
    State(_state): State<ApiState>,
    payload: Result<Json<RetrievalRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let steps = match plan_retrieval(&request.item_id, &request.container) {
        Ok(steps) => steps,
        Err(err) => return plan_error_response(err),
    };
    info!(
        "Retrieval plan for '{}': {} steps",
        request.item_id,
        steps.len()
    );

    let response = RetrievalResponse {
        item_id: request.item_id,
        steps,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for the POST /plan/return endpoint.
///
/// Selects waste items into a weight-bounded return manifest and plans the
/// collection walk.
#[utoipa::path(
    post,
    path = "/plan/return",
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Return plan computed", body = ReturnResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or no plannable return",
            body = ErrorResponse
        )
    ),
    tag = "planning"
)]
async fn handle_return(
    State(state): State<ApiState>,
    payload: Result<Json<ReturnRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let date = request.date.unwrap_or_else(|| Utc::now().date_naive());
    let plan = match plan_return(
        &request.container_id,
        request.weight_limit,
        request.waste_items,
        date,
        &state.planner_config,
    ) {
        Ok(plan) => plan,
        Err(err) => return plan_error_response(err),
    };
    info!(
        "Return plan for '{}': {} items, {:.1} kg of {:.1} kg",
        plan.manifest.container_id,
        plan.manifest.items.len(),
        plan.manifest.total_mass,
        plan.manifest.weight_limit
    );

    (StatusCode::OK, Json(ReturnResponse::from_plan(plan))).into_response()
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in [
            "/plan/placement",
            "/plan/placement/stream",
            "/plan/retrieval",
            "/plan/return",
        ] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in [
            "PlacementRequest",
            "PlacementResponse",
            "RetrievalResponse",
            "ReturnResponse",
            "ErrorResponse",
        ] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn placement_request_parses_camel_case_payload() {
        let json = r#"{
            "items": [
                {
                    "id": "ITM-001",
                    "name": "Food Pack",
                    "dimensions": { "width": 40.0, "depth": 40.0, "height": 40.0 },
                    "mass": 5.0,
                    "priority": 9,
                    "usageLimit": 10,
                    "preferredZone": "A"
                }
            ],
            "containers": [
                {
                    "id": "CONT-A1",
                    "zone": "A",
                    "dimensions": { "width": 100.0, "depth": 100.0, "height": 100.0 }
                }
            ]
        }"#;
        let request: PlacementRequest =
            serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].priority, Some(9));
        assert_eq!(request.items[0].preferred_zone.as_deref(), Some("A"));
        assert_eq!(request.containers.len(), 1);
        assert!(request.containers[0].stowed.is_empty());
    }

    #[test]
    fn return_request_date_is_optional() {
        let json = r#"{
            "containerId": "CONT-UND",
            "weightLimit": 100.0,
            "wasteItems": []
        }"#;
        let request: ReturnRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.date, None);

        let json_with_date = r#"{
            "containerId": "CONT-UND",
            "weightLimit": 100.0,
            "wasteItems": [],
            "date": "2026-08-23"
        }"#;
        let request: ReturnRequest =
            serde_json::from_str(json_with_date).expect("Should parse valid JSON");
        assert_eq!(request.date, NaiveDate::from_ymd_opt(2026, 8, 23));
    }

    #[test]
    fn retrieval_request_parses_container_snapshot() {
        let json = r#"{
            "itemId": "ITM-001",
            "container": {
                "id": "CONT-A1",
                "zone": "A",
                "dimensions": { "width": 100.0, "depth": 100.0, "height": 100.0 },
                "stowed": []
            }
        }"#;
        let request: RetrievalRequest =
            serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.item_id, "ITM-001");
        assert_eq!(request.container.id, "CONT-A1");
    }

    #[test]
    fn plan_error_maps_to_expected_status() {
        let cases = [
            (
                PlanError::InvalidInput("bad".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                PlanError::ItemNotPlaced("ITM-1".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (PlanError::NoWasteItems, StatusCode::UNPROCESSABLE_ENTITY),
            (PlanError::NoItemsFit, StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (err, expected) in cases {
            let response = plan_error_response(err);
            assert_eq!(response.status(), expected);
        }
    }
}

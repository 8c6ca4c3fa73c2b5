use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use crate::downloader;
use crate::importer::{ImportOutcome, Importer};
use crate::loader::TabularFormat;
use crate::store::{FileStore, ShareStore, persist_batch};

/// Upper bound for an upload body
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub struct AppState {
    store: Mutex<Box<dyn ShareStore + Send>>,
    importer: Importer,
}

impl AppState {
    pub fn new(store: Box<dyn ShareStore + Send>) -> Self {
        AppState {
            store: Mutex::new(store),
            importer: Importer::new(),
        }
    }

    fn store(&self) -> MutexGuard<'_, Box<dyn ShareStore + Send>> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Deserialize)]
struct TemplateQuery {
    format: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorResponse {
        status: "error",
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

/// Build the admin API router around an explicitly constructed state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/shares", get(list_shares))
        .route("/api/shares/template", get(download_template))
        .route("/api/shares/import", post(import_shares))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(&config.store)?;

    // Setup app state
    let app_state = Arc::new(AppState::new(Box::new(store)));
    let app = router(app_state);

    // Start server
    let listener = TcpListener::bind(config.bind).await?;
    info!("Listening on http://{}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn list_shares(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let shares = state.store().list();
    Json(serde_json::json!({ "shares": shares }))
}

async fn download_template(Query(params): Query<TemplateQuery>) -> Response {
    let (format, content_type, disposition) = match params.format.as_deref() {
        None | Some("xlsx") => (
            TabularFormat::Spreadsheet,
            XLSX_CONTENT_TYPE,
            "attachment; filename=\"shares_template.xlsx\"",
        ),
        Some("csv") => (
            TabularFormat::Csv,
            "text/csv; charset=utf-8",
            "attachment; filename=\"shares_template.csv\"",
        ),
        Some(other) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Unknown template format '{}', use csv or xlsx", other),
            );
        }
    };

    match downloader::template(format) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, content_type),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            error!("failed to build template: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn import_shares(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    // Process the multipart form data
    let mut upload = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        };

        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(bytes) => upload = Some((file_name, bytes)),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        }
    }

    let Some((file_name, bytes)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "No file received in field 'file'");
    };

    let outcome = TabularFormat::from_path(&file_name)
        .and_then(|format| state.importer.import(&bytes, format));

    match outcome {
        Ok(ImportOutcome::Accepted(records)) => {
            let report = {
                let mut store = state.store();
                persist_batch(&mut **store, &records)
            };
            info!("upload '{}' stored {} shares", file_name, report.succeeded);

            let failed: Vec<_> = report
                .failed
                .iter()
                .map(|(name, message)| serde_json::json!({ "name": name, "message": message }))
                .collect();
            Json(serde_json::json!({
                "status": "ok",
                "imported": report.succeeded,
                "failed": failed,
            }))
            .into_response()
        }
        Ok(ImportOutcome::Rejected(errors)) => {
            warn!("upload '{}' rejected with {} errors", file_name, errors.len());
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({ "status": "rejected", "errors": errors })),
            )
                .into_response()
        }
        Err(e) => {
            warn!("upload '{}' failed: {}", file_name, e);
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    const BOUNDARY: &str = "shares-boundary";

    fn app() -> (Arc<AppState>, Router) {
        let state = Arc::new(AppState::new(Box::new(MemoryStore::new())));
        (state.clone(), router(state))
    }

    fn upload(file_name: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/shares/import")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const HEADER: &str = "S.No,Logo,Shares Name,Price,Depository,Applicable,Minimum Lot Size\n";

    #[tokio::test]
    async fn accepted_upload_is_stored() {
        let (state, app) = app();
        let csv = format!("{HEADER}1,,ABC Ltd,100,nsdl,Yes,1\n");

        let response = app.oneshot(upload("shares.csv", &csv)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["imported"], 1);

        let shares = state.store().list();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].depository, "NSDL");
    }

    #[tokio::test]
    async fn rejected_upload_stores_nothing() {
        let (state, app) = app();
        let csv = format!("{HEADER}1,,ABC Ltd,0,NSDL,Yes,1\n");

        let response = app.oneshot(upload("shares.csv", &csv)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let json = json_body(response).await;
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["errors"][0]["fieldName"], "Price");
        assert!(state.store().list().is_empty());
    }

    #[tokio::test]
    async fn unsupported_extension_is_bad_request() {
        let (_, app) = app();
        let response = app.oneshot(upload("shares.txt", "whatever")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["status"], "error");
    }

    #[tokio::test]
    async fn csv_template_download() {
        let (_, app) = app();
        let request = Request::builder()
            .uri("/api/shares/template?format=csv")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"shares_template.csv\""
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes, downloader::template_csv().into_bytes());
    }

    #[tokio::test]
    async fn unknown_template_format_is_bad_request() {
        let (_, app) = app();
        let request = Request::builder()
            .uri("/api/shares/template?format=pdf")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

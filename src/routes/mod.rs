use axum::http::HeaderValue;
use axum::{
    extract::{DefaultBodyLimit, Multipart},
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub mod causas;
pub mod health;
pub mod metricas;
pub mod resumen;
pub mod usuarios;

const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 25;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    let user_routes = Router::new()
        .route(
            "/usuarios",
            get(usuarios::list_users).post(usuarios::register),
        )
        .route("/usuarios/:id", patch(usuarios::update_user))
        .route("/login", post(usuarios::login))
        .route("/me", get(usuarios::me))
        .route(
            "/password-reset/request",
            post(usuarios::request_password_reset),
        )
        .route(
            "/password-reset/confirm",
            post(usuarios::confirm_password_reset),
        );

    let case_routes = Router::new()
        .route("/causas", get(causas::list_cases).post(causas::create_case))
        .route("/causas/:id", get(causas::get_case))
        .route("/causas/:id/checklist", get(causas::get_checklist))
        .route(
            "/causas/:id/checklist/:tarea_nombre",
            put(causas::update_task_by_name),
        )
        .route("/importar-causas", post(causas::import_cases))
        .route("/tareas", get(causas::list_tasks))
        .route("/tareas/:id", put(causas::update_task));

    let report_routes = Router::new()
        .route("/metricas/abogado", get(metricas::lawyer_metrics))
        .route("/metricas/supervision", get(metricas::supervision_metrics))
        .route("/resumir", post(resumen::summarize_text))
        .route("/resumen-pdf", post(resumen::summarize_pdf));

    Router::new()
        .merge(user_routes)
        .merge(case_routes)
        .merge(report_routes)
        .route("/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Comma-separated allow list, or mirror the request origin when unset.
fn cors_layer(allowed: Option<&str>) -> CorsLayer {
    let allow_origin = match allowed {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(%origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub(crate) struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Reads the multipart field named `file`; other fields are ignored.
pub(crate) async fn read_file_field(multipart: &mut Multipart) -> AppResult<UploadedFile> {
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|err| {
            error!(error = %err, "failed to read file bytes");
            AppError::bad_request(format!("failed to read file bytes: {err}"))
        })?;
        return Ok(UploadedFile {
            file_name,
            bytes: bytes.to_vec(),
        });
    }
    Err(AppError::bad_request("missing `file` field"))
}

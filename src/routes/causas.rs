use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::read_file_field;
use crate::{
    auth::{AnyStaff, Authorized, CaseWriters},
    calendar,
    cases::{self, CaseDraft, TaskFilter, TaskUpdate},
    error::{AppError, AppResult},
    import::{ensure_spreadsheet_name, import_rows, CaseSheet},
    models::{Causa, ChecklistTarea},
    state::AppState,
};

pub async fn list_cases(
    State(state): State<AppState>,
    _caller: Authorized<AnyStaff>,
) -> AppResult<Json<Vec<Causa>>> {
    let mut conn = state.db()?;
    Ok(Json(cases::list_cases(&mut conn)?))
}

pub async fn create_case(
    State(state): State<AppState>,
    caller: Authorized<CaseWriters>,
    WithRejection(Json(draft), _): WithRejection<Json<CaseDraft>, AppError>,
) -> AppResult<(StatusCode, Json<Causa>)> {
    let new_causa = draft.validate().map_err(AppError::bad_request)?;
    let mut conn = state.db()?;
    let causa = cases::create_case(&mut conn, &new_causa)?;
    info!(causa_id = causa.id, created_by = %caller.user.email, "case created");
    Ok((StatusCode::CREATED, Json(causa)))
}

pub async fn get_case(
    State(state): State<AppState>,
    _caller: Authorized<AnyStaff>,
    Path(causa_id): Path<i32>,
) -> AppResult<Json<Causa>> {
    let mut conn = state.db()?;
    cases::get_case(&mut conn, causa_id)?
        .map(Json)
        .ok_or_else(|| AppError::not_found_with("case not found"))
}

/// A case without tasks is reported the same way as a missing case.
pub async fn get_checklist(
    State(state): State<AppState>,
    _caller: Authorized<AnyStaff>,
    Path(causa_id): Path<i32>,
) -> AppResult<Json<Vec<ChecklistTarea>>> {
    let mut conn = state.db()?;
    let tareas = cases::checklist_for_case(&mut conn, causa_id)?;
    if tareas.is_empty() {
        return Err(AppError::not_found_with("checklist not found for case"));
    }
    Ok(Json(tareas))
}

pub async fn update_task(
    State(state): State<AppState>,
    caller: Authorized<CaseWriters>,
    Path(tarea_id): Path<i32>,
    WithRejection(Json(update), _): WithRejection<Json<TaskUpdate>, AppError>,
) -> AppResult<Json<ChecklistTarea>> {
    let mut conn = state.db()?;
    let tarea = cases::update_task(&mut conn, tarea_id, &update, calendar::today())
        .map_err(task_not_found)?;
    info!(
        tarea_id,
        causa_id = tarea.causa_id,
        completada = tarea.completada,
        updated_by = %caller.user.email,
        "task updated"
    );
    Ok(Json(tarea))
}

pub async fn update_task_by_name(
    State(state): State<AppState>,
    caller: Authorized<CaseWriters>,
    Path((causa_id, tarea_nombre)): Path<(i32, String)>,
    WithRejection(Json(update), _): WithRejection<Json<TaskUpdate>, AppError>,
) -> AppResult<Json<ChecklistTarea>> {
    let mut conn = state.db()?;
    let tarea = cases::update_task_by_name(
        &mut conn,
        causa_id,
        &tarea_nombre,
        &update,
        calendar::today(),
    )
    .map_err(task_not_found)?;
    info!(
        tarea_id = tarea.id,
        causa_id,
        completada = tarea.completada,
        updated_by = %caller.user.email,
        "task updated"
    );
    Ok(Json(tarea))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    _caller: Authorized<AnyStaff>,
    Query(filter): Query<TaskFilter>,
) -> AppResult<Json<Vec<ChecklistTarea>>> {
    let mut conn = state.db()?;
    Ok(Json(cases::filter_tasks(&mut conn, &filter)?))
}

pub async fn import_cases(
    State(state): State<AppState>,
    caller: Authorized<CaseWriters>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let upload = read_file_field(&mut multipart).await?;
    ensure_spreadsheet_name(&upload.file_name)?;
    let sheet = CaseSheet::from_bytes(upload.bytes)?;

    let mut conn = state.db()?;
    let summary = import_rows(&sheet, |draft| {
        let new_causa = draft.validate()?;
        cases::create_case(&mut conn, &new_causa)
            .map(|_| ())
            .map_err(|err| err.to_string())
    });

    if summary.is_clean() {
        info!(
            creadas = summary.creadas,
            file = %upload.file_name,
            imported_by = %caller.user.email,
            "cases imported"
        );
        Ok(Json(json!({
            "creadas": summary.creadas,
            "mensaje": format!("{} causas importadas", summary.creadas),
        })))
    } else {
        warn!(
            creadas = summary.creadas,
            errores = summary.errores.len(),
            file = %upload.file_name,
            "case import finished with errors"
        );
        Err(AppError::partial_failure(
            format!("{} filas con errores", summary.errores.len()),
            serde_json::to_value(&summary)?,
        ))
    }
}

fn task_not_found(err: diesel::result::Error) -> AppError {
    match err {
        diesel::result::Error::NotFound => AppError::not_found_with("task not found"),
        other => AppError::from(other),
    }
}

use axum::{extract::State, Json};
use diesel::prelude::*;

use crate::{
    auth::{Authorized, LawyerOnly, Supervisors},
    calendar::IsoWeek,
    cases,
    error::AppResult,
    metrics::{self, LawyerReport, SupervisionReport},
    models::Causa,
    schema::causas,
    state::AppState,
    users,
};

pub async fn lawyer_metrics(
    State(state): State<AppState>,
    caller: Authorized<LawyerOnly>,
) -> AppResult<Json<LawyerReport>> {
    let abogado = users::normalize_email(&caller.user.email);
    let mut conn = state.db()?;
    let causas = cases::list_cases_by_lawyer(&mut conn, &abogado)?;
    let ids: Vec<i32> = causas.iter().map(|causa| causa.id).collect();
    let tareas = cases::tasks_for_cases(&mut conn, &ids)?;

    Ok(Json(metrics::lawyer_report(
        &abogado,
        IsoWeek::current(),
        &causas,
        &tareas,
    )))
}

pub async fn supervision_metrics(
    State(state): State<AppState>,
    _caller: Authorized<Supervisors>,
) -> AppResult<Json<SupervisionReport>> {
    let mut conn = state.db()?;
    let lawyers = users::list_lawyers(&mut conn)?;
    let correos: Vec<&str> = lawyers.iter().map(|lawyer| lawyer.correo.as_str()).collect();
    let causas: Vec<Causa> = causas::table
        .filter(causas::abogado_responsable.eq_any(&correos))
        .order(causas::id.asc())
        .load(&mut conn)?;
    let ids: Vec<i32> = causas.iter().map(|causa| causa.id).collect();
    let tareas = cases::tasks_for_cases(&mut conn, &ids)?;

    Ok(Json(metrics::supervision_report(
        IsoWeek::current(),
        &lawyers,
        &causas,
        &tareas,
    )))
}

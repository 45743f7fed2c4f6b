use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    auth::{password, AdminOnly, AnyStaff, Authorized, Role},
    error::{AppError, AppResult},
    jobs::{enqueue_password_reset_email, PasswordResetEmail},
    state::AppState,
    users::{self, ResetOutcome, UserChanges, UsuarioPublic},
};

const RESET_ACKNOWLEDGEMENT: &str =
    "Si el correo está registrado, recibirá instrucciones para restablecer la contraseña";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub nombre_completo: String,
    pub correo: String,
    pub password: String,
    pub rol: Role,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub correo: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub correo: String,
}

#[derive(Deserialize)]
pub struct ResetConfirm {
    pub token: String,
    pub new_password: String,
}

pub async fn register(
    State(state): State<AppState>,
    admin: Authorized<AdminOnly>,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> AppResult<(StatusCode, Json<UsuarioPublic>)> {
    password::check_password_strength(&payload.password).map_err(AppError::bad_request)?;
    let hashed = password::hash_password(&payload.password)?;

    let mut conn = state.db()?;
    let usuario = users::create_user(
        &mut conn,
        &payload.nombre_completo,
        &payload.correo,
        hashed,
        payload.rol,
    )?;

    info!(
        usuario_id = usuario.id,
        rol = %usuario.rol,
        registered_by = %admin.user.email,
        "user registered"
    );
    Ok((StatusCode::CREATED, Json(usuario.into())))
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: Authorized<AdminOnly>,
) -> AppResult<Json<Vec<UsuarioPublic>>> {
    let mut conn = state.db()?;
    let usuarios = users::list_users(&mut conn)?;
    Ok(Json(usuarios.into_iter().map(UsuarioPublic::from).collect()))
}

pub async fn update_user(
    State(state): State<AppState>,
    admin: Authorized<AdminOnly>,
    Path(usuario_id): Path<i32>,
    WithRejection(Json(changes), _): WithRejection<Json<UserChanges>, AppError>,
) -> AppResult<Json<UsuarioPublic>> {
    if changes.is_empty() {
        return Err(AppError::bad_request("nothing to update: send rol and/or activo"));
    }

    let mut conn = state.db()?;
    let usuario = users::update_user(&mut conn, usuario_id, &changes)
        .map_err(|err| match err {
            diesel::result::Error::NotFound => AppError::not_found_with("user not found"),
            other => AppError::from(other),
        })?;

    info!(
        usuario_id,
        rol = %usuario.rol,
        activo = usuario.activo,
        updated_by = %admin.user.email,
        "user updated"
    );
    Ok(Json(usuario.into()))
}

/// Unknown email, wrong password and inactive account all yield the same 401.
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, AppError>,
) -> AppResult<Json<LoginResponse>> {
    let mut conn = state.db()?;
    let usuario = users::find_by_email(&mut conn, &payload.correo)?
        .ok_or_else(AppError::unauthorized)?;

    let valid = password::verify_password(&payload.password, &usuario.hashed_password)
        .map_err(|_| AppError::unauthorized())?;
    if !valid || !usuario.activo {
        return Err(AppError::unauthorized());
    }

    let role = usuario.role().map_err(AppError::internal)?;
    let access_token = state
        .jwt
        .generate_token(usuario.id, &usuario.correo, role)?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: state.jwt.expires_in_seconds(),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    caller: Authorized<AnyStaff>,
) -> AppResult<Json<UsuarioPublic>> {
    let mut conn = state.db()?;
    let usuario = users::find_by_email(&mut conn, &caller.user.email)?
        .ok_or_else(|| AppError::not_found_with("user not found"))?;
    Ok(Json(usuario.into()))
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ResetRequest>, AppError>,
) -> (StatusCode, Json<Value>) {
    if let Err(err) = schedule_password_reset(&state, &payload.correo) {
        warn!(error = %err.message(), "password reset request not scheduled");
    }
    (
        StatusCode::ACCEPTED,
        Json(json!({ "mensaje": RESET_ACKNOWLEDGEMENT })),
    )
}

fn schedule_password_reset(state: &AppState, correo: &str) -> AppResult<()> {
    let mut conn = state.db()?;
    let Some(usuario) = users::find_by_email(&mut conn, correo)? else {
        return Ok(());
    };

    let ttl_minutes = state.config.password_reset_expiry_minutes;
    let token = users::issue_reset_token(
        &mut conn,
        usuario.id,
        Utc::now().naive_utc(),
        Duration::minutes(ttl_minutes),
    )?;

    let job = enqueue_password_reset_email(
        &mut conn,
        &PasswordResetEmail {
            correo: usuario.correo.clone(),
            token,
            expires_in_minutes: ttl_minutes,
        },
    )
    .map_err(AppError::internal)?;

    info!(usuario_id = usuario.id, job_id = %job.id, "password reset email queued");
    Ok(())
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ResetConfirm>, AppError>,
) -> AppResult<Json<Value>> {
    password::check_password_strength(&payload.new_password).map_err(AppError::bad_request)?;
    let hashed = password::hash_password(&payload.new_password)?;

    let mut conn = state.db()?;
    match users::consume_reset_token(&mut conn, &payload.token, &hashed, Utc::now().naive_utc())? {
        ResetOutcome::Applied => Ok(Json(json!({ "mensaje": "Contraseña actualizada" }))),
        ResetOutcome::Expired | ResetOutcome::Unknown => Err(AppError::invalid_or_expired()),
    }
}

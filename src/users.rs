//! Staff accounts and password-reset tokens.

use chrono::{Duration, NaiveDateTime};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::reset_token::{generate_reset_token, hash_reset_token};
use crate::auth::Role;
use crate::error::AppError;
use crate::models::{NewPasswordResetToken, NewUsuario, PasswordResetToken, Usuario};
use crate::schema::{password_reset_tokens, usuarios};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("a user with that email already exists")]
    DuplicateEmail,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Database(#[from] DieselError),
}

impl From<UserError> for AppError {
    fn from(value: UserError) -> Self {
        match value {
            UserError::DuplicateEmail => AppError::conflict(value.to_string()),
            UserError::Invalid(message) => AppError::bad_request(message),
            UserError::Database(err) => AppError::from(err),
        }
    }
}

/// What callers may see of a user. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsuarioPublic {
    pub id: i32,
    pub nombre_completo: String,
    pub correo: String,
    pub rol: String,
    pub activo: bool,
    pub fecha_creacion: NaiveDateTime,
}

impl From<Usuario> for UsuarioPublic {
    fn from(usuario: Usuario) -> Self {
        Self {
            id: usuario.id,
            nombre_completo: usuario.nombre_completo,
            correo: usuario.correo,
            rol: usuario.rol,
            activo: usuario.activo,
            fecha_creacion: usuario.fecha_creacion,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, AsChangeset)]
#[diesel(table_name = usuarios)]
pub struct UserChanges {
    #[serde(default, deserialize_with = "deserialize_role")]
    pub rol: Option<String>,
    #[serde(default)]
    pub activo: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.rol.is_none() && self.activo.is_none()
    }
}

fn deserialize_role<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let role = Option::<Role>::deserialize(deserializer)?;
    Ok(role.map(|role| role.as_str().to_string()))
}

pub fn normalize_email(correo: &str) -> String {
    correo.trim().to_lowercase()
}

/// Normalizes and loosely checks the `local@domain.tld` shape.
pub fn validate_email(correo: &str) -> Result<String, String> {
    let normalized = normalize_email(correo);
    let valid = match normalized.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !normalized.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(normalized)
    } else {
        Err(format!("`{}` is not a valid email address", correo.trim()))
    }
}

pub fn create_user(
    conn: &mut PgConnection,
    nombre_completo: &str,
    correo: &str,
    hashed_password: String,
    role: Role,
) -> Result<Usuario, UserError> {
    let nombre_completo = nombre_completo.trim();
    if nombre_completo.is_empty() {
        return Err(UserError::Invalid("nombre_completo must not be empty".into()));
    }
    let correo = validate_email(correo).map_err(UserError::Invalid)?;

    if find_by_email(conn, &correo)?.is_some() {
        return Err(UserError::DuplicateEmail);
    }

    let new_user = NewUsuario {
        nombre_completo: nombre_completo.to_string(),
        correo,
        hashed_password,
        rol: role.as_str().to_string(),
    };
    match diesel::insert_into(usuarios::table)
        .values(&new_user)
        .get_result(conn)
    {
        Ok(usuario) => Ok(usuario),
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            Err(UserError::DuplicateEmail)
        }
        Err(err) => Err(err.into()),
    }
}

pub fn find_by_email(conn: &mut PgConnection, correo: &str) -> QueryResult<Option<Usuario>> {
    usuarios::table
        .filter(usuarios::correo.eq(normalize_email(correo)))
        .first(conn)
        .optional()
}

pub fn list_users(conn: &mut PgConnection) -> QueryResult<Vec<Usuario>> {
    usuarios::table.order(usuarios::id.asc()).load(conn)
}

pub fn list_lawyers(conn: &mut PgConnection) -> QueryResult<Vec<Usuario>> {
    usuarios::table
        .filter(usuarios::rol.eq(Role::Lawyer.as_str()))
        .order(usuarios::id.asc())
        .load(conn)
}

/// Fails with `NotFound` for an unknown id.
pub fn update_user(
    conn: &mut PgConnection,
    usuario_id: i32,
    changes: &UserChanges,
) -> QueryResult<Usuario> {
    diesel::update(usuarios::table.find(usuario_id))
        .set(changes)
        .get_result(conn)
}

/// Stores the digest of a fresh token and returns the raw token.
pub fn issue_reset_token(
    conn: &mut PgConnection,
    usuario_id: i32,
    now: NaiveDateTime,
    ttl: Duration,
) -> QueryResult<String> {
    let token = generate_reset_token();
    let record = NewPasswordResetToken {
        id: Uuid::new_v4(),
        usuario_id,
        token_hash: hash_reset_token(&token),
        expires_at: now + ttl,
    };
    diesel::insert_into(password_reset_tokens::table)
        .values(&record)
        .execute(conn)?;
    Ok(token)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Applied,
    Expired,
    Unknown,
}

/// Deletes the token in every case where it exists, so a token can be tried
/// at most once. The password is only replaced when the token was live.
pub fn consume_reset_token(
    conn: &mut PgConnection,
    token: &str,
    new_hashed_password: &str,
    now: NaiveDateTime,
) -> QueryResult<ResetOutcome> {
    let token_hash = hash_reset_token(token);
    conn.transaction(|conn| {
        let consumed: Option<PasswordResetToken> = diesel::delete(
            password_reset_tokens::table.filter(password_reset_tokens::token_hash.eq(&token_hash)),
        )
        .get_result(conn)
        .optional()?;

        let Some(record) = consumed else {
            return Ok(ResetOutcome::Unknown);
        };
        if record.expires_at <= now {
            return Ok(ResetOutcome::Expired);
        }

        diesel::update(usuarios::table.find(record.usuario_id))
            .set(usuarios::hashed_password.eq(new_hashed_password))
            .execute(conn)?;
        Ok(ResetOutcome::Applied)
    })
}

pub fn purge_expired_reset_tokens(conn: &mut PgConnection, now: NaiveDateTime) -> QueryResult<usize> {
    diesel::delete(password_reset_tokens::table.filter(password_reset_tokens::expires_at.le(now)))
        .execute(conn)
}

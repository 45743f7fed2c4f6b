pub mod jwt;
pub mod password;
pub mod reset_token;
pub mod roles;

use std::marker::PhantomData;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub use roles::{AdminOnly, AnyStaff, CaseWriters, LawyerOnly, Role, RoleGate, Supervisors};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn require_role(&self, allowed: &[Role]) -> AppResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            warn!(email = %self.email, role = %self.role, "role not permitted");
            Err(AppError::forbidden())
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        Ok(AuthenticatedUser {
            user_id: claims.uid,
            email: claims.sub,
            role: claims.role,
        })
    }
}

/// Caller identity that has passed the role gate `G`.
pub struct Authorized<G: RoleGate> {
    pub user: AuthenticatedUser,
    gate: PhantomData<G>,
}

impl<G: RoleGate> Authorized<G> {
    pub fn check(user: AuthenticatedUser) -> AppResult<Self> {
        user.require_role(G::ALLOWED)?;
        Ok(Self {
            user,
            gate: PhantomData,
        })
    }
}

#[async_trait]
impl<G: RoleGate> FromRequestParts<AppState> for Authorized<G> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        Self::check(user)
    }
}

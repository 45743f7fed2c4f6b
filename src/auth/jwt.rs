use std::collections::HashMap;

use anyhow::{anyhow, ensure, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, decode_header, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::roles::Role;
use crate::config::AppConfig;

/// Signs access tokens with the current key and verifies them against any
/// key id it still knows about.
#[derive(Clone)]
pub struct JwtService {
    key_id: String,
    encoding: EncodingKey,
    decoding: HashMap<String, DecodingKey>,
    issuer: String,
    audience: String,
    expiry: Duration,
}

impl JwtService {
    pub fn new(
        key_id: impl Into<String>,
        secret: &str,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        expiry: Duration,
    ) -> Self {
        let key_id = key_id.into();
        let mut decoding = HashMap::new();
        decoding.insert(key_id.clone(), DecodingKey::from_secret(secret.as_bytes()));
        Self {
            key_id,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding,
            issuer: issuer.into(),
            audience: audience.into(),
            expiry,
        }
    }

    pub fn with_previous_key(mut self, key_id: impl Into<String>, secret: &str) -> Self {
        self.decoding
            .entry(key_id.into())
            .or_insert_with(|| DecodingKey::from_secret(secret.as_bytes()));
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        ensure!(!config.jwt_secret.is_empty(), "JWT secret must not be empty");
        let service = Self::new(
            config.jwt_key_id.clone(),
            &config.jwt_secret,
            config.jwt_issuer.clone(),
            config.jwt_audience.clone(),
            Duration::minutes(config.jwt_expiry_minutes),
        );
        Ok(match &config.jwt_previous_key {
            Some(previous) => service.with_previous_key(previous.key_id.clone(), &previous.secret),
            None => service,
        })
    }

    pub fn expires_in_seconds(&self) -> i64 {
        self.expiry.num_seconds()
    }

    pub fn generate_token(&self, user_id: i32, email: &str, role: Role) -> Result<String> {
        let now = Utc::now();
        let exp = now + self.expiry;
        let claims = Claims {
            sub: email.to_owned(),
            uid: user_id,
            role,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp().max(0) as usize,
        };
        let header = Header {
            kid: Some(self.key_id.clone()),
            ..Header::default()
        };

        Ok(encode(&header, &claims, &self.encoding)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token)?;
        let key_id = header.kid.ok_or_else(|| anyhow!("token carries no key id"))?;
        let key = self
            .decoding
            .get(&key_id)
            .ok_or_else(|| anyhow!("unknown signing key `{key_id}`"))?;

        let mut validation = Validation::default();
        validation.set_audience(&[self.audience.clone()]);
        validation.set_issuer(&[self.issuer.clone()]);
        let data = decode::<Claims>(token, key, &validation)?;
        Ok(data.claims)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub uid: i32,
    pub role: Role,
    pub iss: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}

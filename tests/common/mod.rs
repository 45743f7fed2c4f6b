use std::env;
use std::sync::Arc;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use causas::auth::jwt::JwtService;
use causas::auth::{password, Role};
use causas::config::AppConfig;
use causas::db::{self, PgPool};
use causas::mailer::{Mailer, OutgoingEmail};
use causas::models::{Job, NewUsuario};
use causas::routes;
use causas::state::AppState;
use causas::summarizer::{Summarizer, SummarizerError, SummaryModel};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::MigrationHarness;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[allow(dead_code)]
#[derive(Clone)]
pub enum FakeReply {
    Json(Value),
    Upstream { status: u16, body: String },
}

/// Stands in for the inference API; records every prompt it receives.
pub struct FakeSummarizer {
    reply: Mutex<FakeReply>,
    prompts: Mutex<Vec<(SummaryModel, String)>>,
}

impl Default for FakeSummarizer {
    fn default() -> Self {
        Self {
            reply: Mutex::new(FakeReply::Json(serde_json::json!([
                { "summary_text": "Resumen de prueba." }
            ]))),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[allow(dead_code)]
impl FakeSummarizer {
    pub async fn respond_with(&self, reply: FakeReply) {
        *self.reply.lock().await = reply;
    }

    pub async fn prompts(&self) -> Vec<(SummaryModel, String)> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn infer(&self, model: SummaryModel, inputs: &str) -> Result<Value, SummarizerError> {
        self.prompts.lock().await.push((model, inputs.to_string()));
        match self.reply.lock().await.clone() {
            FakeReply::Json(value) => Ok(value),
            FakeReply::Upstream { status, body } => Err(SummarizerError::Upstream { status, body }),
        }
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

#[allow(dead_code)]
impl RecordingMailer {
    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        self.sent.lock().await.push(email);
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    summarizer: Arc<FakeSummarizer>,
    mailer: Arc<RecordingMailer>,
}

impl TestApp {
    /// `None` when `TEST_DATABASE_URL` is not set; callers return early.
    pub async fn new() -> Result<Option<Self>> {
        let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping database flow test");
            return Ok(None);
        };

        let config = AppConfig {
            database_url,
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_key_id: "test".to_string(),
            jwt_previous_key: None,
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            password_reset_expiry_minutes: 15,
            cors_allowed_origin: None,
            summarizer_text_url: "http://summarizer.invalid/text".to_string(),
            summarizer_pdf_url: "http://summarizer.invalid/pdf".to_string(),
            summarizer_api_token: None,
            summarizer_timeout_seconds: 5,
            worker_poll_interval_seconds: 1,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let summarizer = Arc::new(FakeSummarizer::default());
        let mailer = Arc::new(RecordingMailer::default());
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(
            pool,
            config,
            jwt,
            summarizer.clone() as Arc<dyn Summarizer>,
            mailer.clone() as Arc<dyn Mailer>,
        );
        let router = routes::create_router(state.clone());

        Ok(Some(Self {
            state,
            router,
            summarizer,
            mailer,
        }))
    }

    pub async fn cleanup(&self) -> Result<()> {
        self.with_conn(truncate_all).await
    }

    #[allow(dead_code)]
    pub fn summarizer(&self) -> Arc<FakeSummarizer> {
        self.summarizer.clone()
    }

    #[allow(dead_code)]
    pub fn mailer(&self) -> Arc<RecordingMailer> {
        self.mailer.clone()
    }

    pub async fn insert_user(
        &self,
        nombre: &str,
        correo: &str,
        plain_password: &str,
        role: Role,
    ) -> Result<i32> {
        let user = NewUsuario {
            nombre_completo: nombre.to_string(),
            correo: correo.to_string(),
            hashed_password: password::hash_password(plain_password)?,
            rol: role.as_str().to_string(),
        };
        self.with_conn(move |conn| {
            let id = diesel::insert_into(causas::schema::usuarios::table)
                .values(&user)
                .returning(causas::schema::usuarios::id)
                .get_result(conn)
                .context("failed to insert user")?;
            Ok(id)
        })
        .await
    }

    /// Inserts a user with `role` and returns a bearer token for it.
    #[allow(dead_code)]
    pub async fn user_with_token(&self, correo: &str, role: Role) -> Result<String> {
        let plain_password = "contraseña-de-prueba";
        self.insert_user("Usuario de Prueba", correo, plain_password, role)
            .await?;
        self.login_token(correo, plain_password).await
    }

    pub async fn login_token(&self, correo: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            correo: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json("/login", &LoginPayload { correo, password }, None)
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        let body = body_to_json(response.into_body()).await?;
        body["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("login response without access_token"))
    }

    #[allow(dead_code)]
    pub async fn jobs_by_type(&self, ty: &str) -> Result<Vec<Job>> {
        let ty = ty.to_string();
        self.with_conn(move |conn| {
            use causas::schema::jobs::dsl::{created_at, job_type, jobs};
            let rows = jobs
                .filter(job_type.eq(&ty))
                .order(created_at.asc())
                .load::<Job>(conn)
                .context("failed to load jobs")?;
            Ok(rows)
        })
        .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PUT, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PATCH, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.dispatch(builder.body(Body::empty())?).await
    }

    #[allow(dead_code)]
    pub async fn upload_file(
        &self,
        path: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
        token: &str,
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        body.extend(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend(data);
        body.extend(b"\r\n");
        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(body))?;
        self.dispatch(request).await
    }

    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.dispatch(builder.body(Body::from(body))?).await
    }

    async fn dispatch(&self, request: Request<Body>) -> Result<hyper::Response<Body>> {
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_json(body: Body) -> Result<Value> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(serde_json::from_slice(&collected.to_bytes())?)
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(db::MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE checklist_tareas, causas, password_reset_tokens, jobs, usuarios RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}

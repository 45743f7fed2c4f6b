use std::env;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use causas::{
    auth::{password, Role},
    config::AppConfig,
    db::{self, PgPool},
    users,
};

const USAGE: &str = "Usage:\n  \
    maintenance create-admin <nombre> <correo> <password>\n  \
    maintenance purge-reset-tokens";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("create-admin") => match &args[1..] {
            [nombre, correo, password] => create_admin(nombre, correo, password).await?,
            _ => usage_error(),
        },
        Some("purge-reset-tokens") => purge_reset_tokens().await?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => usage_error(),
    }

    Ok(())
}

fn usage_error() -> ! {
    eprintln!("{USAGE}");
    std::process::exit(1);
}

async fn connect() -> Result<PgPool> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        "loaded configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    db::run_migrations(&pool).await?;
    Ok(pool)
}

async fn create_admin(nombre: &str, correo: &str, plain_password: &str) -> Result<()> {
    if let Err(reason) = password::check_password_strength(plain_password) {
        bail!(reason);
    }
    let hashed = password::hash_password(plain_password)?;

    let pool = connect().await?;
    let mut conn = pool.get().context("failed to get database connection")?;
    let usuario = users::create_user(&mut conn, nombre, correo, hashed, Role::Admin)
        .context("failed to create admin")?;

    println!("Created admin #{} <{}>", usuario.id, usuario.correo);
    Ok(())
}

async fn purge_reset_tokens() -> Result<()> {
    let pool = connect().await?;
    let mut conn = pool.get().context("failed to get database connection")?;
    let removed = users::purge_expired_reset_tokens(&mut conn, Utc::now().naive_utc())
        .context("failed to purge reset tokens")?;

    println!("Removed {removed} expired reset tokens.");
    Ok(())
}

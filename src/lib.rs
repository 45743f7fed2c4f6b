pub mod auth;
pub mod calendar;
pub mod cases;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod jobs;
pub mod mailer;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod schema;
pub mod state;
pub mod summarizer;
pub mod users;
pub mod workers;

pub use workers::{default_handlers, Worker};

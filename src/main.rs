mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod mailer;
#[cfg(test)]
mod memory;
mod permissions;
mod references;
mod state;
mod tokens;
mod users;
mod validator;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "myreference=debug,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let db = db::connect(&config).await?;
    tracing::info!("database connection pool established");

    if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    let state = AppState::from_parts(config, db);
    let app = app::build_app(state.clone());
    app::serve(app, state).await
}

mod app;
mod auth;
mod config;
mod error;
mod extract;
mod images;
mod labels;
mod recipes;
mod state;
mod storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipe_api=debug,axum=info,tower_http=info".to_string());
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

    let app_state = state::AppState::init().await?;

    sqlx::migrate!("./migrations").run(&app_state.db).await?;

    // Admin tooling: `recipe-api create-superuser <email> <password>`
    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("create-superuser") {
        let email = args
            .next()
            .ok_or_else(|| anyhow::anyhow!("usage: create-superuser <email> <password>"))?;
        let password = args
            .next()
            .ok_or_else(|| anyhow::anyhow!("usage: create-superuser <email> <password>"))?;
        let user = auth::services::create_superuser(&app_state.db, &email, &password).await?;
        tracing::info!(user_id = %user.id, email = %user.email, "superuser created");
        return Ok(());
    }

    let app = app::build_app(app_state);
    app::serve(app).await
}

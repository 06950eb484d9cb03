use timetable::{app, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "timetable=debug,axum=info,tower_http=info".to_string());
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

    let app_state = AppState::init().await?;

    if let Some(admin) = app_state.config.bootstrap_admin.clone() {
        if let Some(user) = app_state
            .authenticator
            .ensure_admin(&admin.username, &admin.password)
            .await?
        {
            tracing::info!(user_id = %user.id, username = %user.username, "bootstrap admin ready");
        }
    }

    let addr = app_state.config.bind_addr;
    let app = app::build_app(app_state);
    app::serve(app, addr).await
}

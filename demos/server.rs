// demos/server.rs
//
// A minimal axum service guarded by cognito-guard. Configuration comes from
// the environment:
//
//   COGNITO_ISSUER     issuer URL of the user pool (required)
//   COGNITO_CLIENT_ID  app client ID (required)
//   COGNITO_JWKS       pre-fetched JWKS JSON for offline bootstrap (optional)

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};
use cognito_guard::prelude::*;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let issuer = std::env::var("COGNITO_ISSUER")?;
    let client_id = std::env::var("COGNITO_CLIENT_ID")?;

    let mut builder = ConfigBuilder::new().issuer_url(&issuer)?.client_id(client_id);
    if let Ok(jwks) = std::env::var("COGNITO_JWKS") {
        builder = builder.preloaded_jwks(&jwks)?;
    }
    let validator = Arc::new(Validator::new(builder.build()?));
    info!(issuer = %validator.config().issuer_url, "validator ready");

    let protected = Router::new()
        .route("/me", get(me))
        .route("/admin/ping", get(admin_ping))
        .layer(from_fn_with_state(
            AuthState::new(validator),
            require_auth,
        ));
    let app = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .merge(protected);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn me(CurrentUser(user): CurrentUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "id": user.id,
        "email": user.email,
        "username": user.username,
        "groups": user.groups,
        "is_teacher": user.is_teacher(),
    }))
}

async fn admin_ping(RequireAdmin(user): RequireAdmin) -> String {
    format!("pong, {}", user.id)
}

//! Inbound HTTP surface
//!
//! Both dialog endpoints accept url-encoded form posts and always answer
//! HTTP 200 with a JSON envelope, so the editor only has to inspect
//! `success`.

use crate::app::App;
use crate::auth::AuthContext;
use crate::forwarder::{ImageForm, TextForm};
use crate::models::{Config, ForwardResponse, StorageConfig};
use crate::Result;
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

type SharedApp = Arc<App>;

pub fn router(app: SharedApp) -> Router {
    let mut router = Router::new()
        .route("/image", post(image_handler))
        .route("/text", post(text_handler))
        .route("/health", get(health));

    if let StorageConfig::Local {
        dir,
        public_base_url,
    } = &app.config().storage
    {
        let mount = public_base_url.trim_end_matches('/');
        if mount.starts_with('/') && mount.len() > 1 {
            router = router.nest_service(mount, ServeDir::new(dir));
        } else {
            tracing::info!(
                "Local files are published at {}; not serving them here",
                public_base_url
            );
        }
    }

    router.layer(TraceLayer::new_for_http()).with_state(app)
}

/// Binds `config.bind_addr` and serves until ctrl-c.
pub async fn run(config: Config) -> Result<()> {
    let addr = config.bind_addr.clone();
    let app = Arc::new(App::new(config).await?);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

fn authenticate(app: &App, headers: &HeaderMap) -> std::result::Result<AuthContext, ForwardResponse> {
    AuthContext::from_headers(headers, app.config().session_key.as_deref())
        .map_err(|e| ForwardResponse::failure(e.to_string()))
}

fn bad_form(rejection: FormRejection) -> Json<ForwardResponse> {
    tracing::warn!("Rejected malformed form: {}", rejection);
    Json(ForwardResponse::failure(format!(
        "Invalid request: {}",
        rejection.body_text()
    )))
}

async fn image_handler(
    State(app): State<SharedApp>,
    headers: HeaderMap,
    form: std::result::Result<Form<ImageForm>, FormRejection>,
) -> Json<ForwardResponse> {
    let auth = match authenticate(&app, &headers) {
        Ok(auth) => auth,
        Err(response) => return Json(response),
    };
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return bad_form(rejection),
    };
    tracing::info!("Image request '{}' from user {}", form.action, auth.user_id);
    Json(app.forward_image(&auth, form).await)
}

async fn text_handler(
    State(app): State<SharedApp>,
    headers: HeaderMap,
    form: std::result::Result<Form<TextForm>, FormRejection>,
) -> Json<ForwardResponse> {
    let auth = match authenticate(&app, &headers) {
        Ok(auth) => auth,
        Err(response) => return Json(response),
    };
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return bad_form(rejection),
    };
    tracing::info!("Text request '{}' from user {}", form.action, auth.user_id);
    Json(app.forward_text(&auth, form).await)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

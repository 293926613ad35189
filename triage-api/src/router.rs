use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::warn;

use crate::{app_state::AppState, config::ApplicationSettings, routes};

pub fn create(app_state: AppState, settings: &ApplicationSettings) -> Router<()> {
    let app = Router::new()
        .route("/", get(|| async { "Triage is up" }))
        .nest(
            "/triage",
            routes::triage::router().nest("/batch", routes::batch::router()),
        )
        .nest("/costs", routes::costs::router());

    app.with_state(app_state)
        .layer(cors_layer(&settings.allowed_origin))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origin == "*" {
        return cors.allow_origin(AllowOrigin::any());
    }
    match HeaderValue::from_str(allowed_origin) {
        Ok(origin) => cors.allow_origin(origin),
        Err(err) => {
            warn!(error = %err, allowed_origin, "Invalid CORS origin, cross-origin requests disabled");
            cors
        }
    }
}

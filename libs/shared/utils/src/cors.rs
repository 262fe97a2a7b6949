use tower_http::cors::{Any, CorsLayer};

/// CORS for the embeddable widget, which is served from clinic domains.
pub fn widget_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, body limit, request ID, CORS)
//! - Bind server to listener
//! - Serve until the shutdown signal fires, then drain

use std::sync::Arc;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{Method, Request},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::UpscalerConfig;
use crate::http::handlers;
use crate::output::OutputStore;
use crate::superres::SuperResolution;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn SuperResolution>,
    pub output: Option<OutputStore>,
    pub model_path: Arc<str>,
}

/// HTTP server for the upscaler.
pub struct HttpServer {
    router: Router,
    config: UpscalerConfig,
}

impl HttpServer {
    /// Create a new HTTP server around an already loaded engine.
    pub fn new(
        config: UpscalerConfig,
        engine: Arc<dyn SuperResolution>,
        output: Option<OutputStore>,
    ) -> Self {
        let state = AppState {
            engine,
            output,
            model_path: Arc::from(config.model.path.as_str()),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &UpscalerConfig, state: AppState) -> Router {
        let router = Router::new()
            .route("/", get(handlers::home))
            .route("/upscale", post(handlers::upscale))
            .route("/status", get(handlers::status))
            .route("/upscaled/{unique_id}", get(handlers::upscaled))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.listener.max_body_bytes))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        if config.http.cors_enabled {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([
                        Method::GET,
                        Method::POST,
                        Method::OPTIONS,
                        Method::PUT,
                        Method::DELETE,
                    ])
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_body_bytes = self.config.listener.max_body_bytes,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &UpscalerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::PixelBuffer;
    use crate::superres::{ModelKind, SuperResError};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    struct Broken;

    impl SuperResolution for Broken {
        fn upsample(&self, _input: &PixelBuffer) -> Result<PixelBuffer, SuperResError> {
            Err(SuperResError::Shape("broken engine".into()))
        }

        fn scale(&self) -> u32 {
            2
        }

        fn kind(&self) -> ModelKind {
            ModelKind::Fsrcnn
        }
    }

    fn router(config: &UpscalerConfig) -> Router {
        let state = AppState {
            engine: Arc::new(Broken),
            output: None,
            model_path: Arc::from("broken.pb"),
        };
        HttpServer::build_router(config, state)
    }

    #[tokio::test]
    async fn test_home_route() {
        let response = router(&UpscalerConfig::default())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Empty Page");
    }

    #[tokio::test]
    async fn test_status_reflects_engine() {
        let response = router(&UpscalerConfig::default())
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["model"]["name"], "fsrcnn");
        assert_eq!(json["model"]["scale"], 2);
        assert_eq!(json["model"]["path"], "broken.pb");
    }

    #[tokio::test]
    async fn test_stored_result_needs_persistence() {
        let response = router(&UpscalerConfig::default())
            .oneshot(Request::get("/upscaled/test1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = router(&UpscalerConfig::default())
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_headers_when_enabled() {
        let mut config = UpscalerConfig::default();
        config.http.cors_enabled = true;

        let response = router(&config)
            .oneshot(
                Request::get("/")
                    .header("origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_engine_failure_is_server_error() {
        let png = PixelBuffer::from_raw(1, 1, crate::imaging::ChannelOrder::Rgb, vec![1, 2, 3])
            .unwrap()
            .encode_png()
            .unwrap();
        let mut body = Vec::new();
        body.extend_from_slice(
            b"--XBOUNDARY\r\nContent-Disposition: form-data; name=\"image\"; filename=\"a.png\"\r\nContent-Type: image/png\r\n\r\n",
        );
        body.extend_from_slice(&png);
        body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");

        let response = router(&UpscalerConfig::default())
            .oneshot(
                Request::post("/upscale")
                    .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        assert_eq!(
            &body[..],
            br#"{"error":"Upscaling failed: shape error: broken engine"}"#
        );
    }
}

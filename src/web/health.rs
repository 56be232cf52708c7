//! Health-check responder for container platforms

use axum::{http::StatusCode, Router};
use std::net::SocketAddr;
use tracing::info;

/// Every method and path answers 200 OK
pub fn health_router() -> Router {
    Router::new().fallback(health)
}

async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Serve the health router on `0.0.0.0:port` until the process exits
pub async fn start_health_server(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Health check server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, health_router()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_any_path_is_ok() {
        for (method, uri) in [("GET", "/"), ("GET", "/healthz"), ("POST", "/anything/else")] {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();

            let response = health_router().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(&body[..], b"OK");
        }
    }
}

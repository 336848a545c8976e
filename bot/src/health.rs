//! Plain HTTP liveness endpoint for the hosting platform.

use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;

pub const RUNNING: &str = "Math Genius Bot is running! ✅";

async fn running() -> &'static str {
    RUNNING
}

async fn healthy() -> &'static str {
    "OK"
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// `GET /` and `GET /health` (HEAD included). Any other path or method is 404.
pub fn router() -> Router {
    Router::new()
        .route("/", get(running).fallback(not_found))
        .route("/health", get(healthy).fallback(not_found))
        .fallback(not_found)
}

pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    log::info!("health endpoint on {}", listener.local_addr()?);
    axum::serve(listener, router()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener));
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn routes() {
        let base = spawn().await;
        let client = reqwest::Client::new();

        let response = client.get(format!("{base}/")).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), RUNNING);

        let response = client.get(format!("{base}/health")).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "OK");

        let response = client.head(format!("{base}/health?check=1")).send().await.unwrap();
        assert_eq!(response.status(), 200);

        let response = client.get(format!("{base}/metrics")).send().await.unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(response.text().await.unwrap(), "Not Found");

        let response = client.post(format!("{base}/")).send().await.unwrap();
        assert_eq!(response.status(), 404);
    }
}

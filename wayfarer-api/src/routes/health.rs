/// Health check endpoint
use axum::Json;
use serde_json::{json, Value};

/// Liveness probe. Reports the service name and version; no dependencies are
/// touched, so a wedged database never flaps the probe.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "wayfarer-api",
        "version": crate::VERSION,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "wayfarer-api");
    }
}

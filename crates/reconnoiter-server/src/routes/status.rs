use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

async fn status() -> Json<Value> {
    Json(json!({ "status": "available" }))
}

pub fn routes() -> Router {
    Router::new().route("/status", get(status))
}

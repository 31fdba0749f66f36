use crate::metrics::{Metrics, Status};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
	pub metrics: Arc<Metrics>,
}

pub fn router(metrics: Arc<Metrics>) -> Router {
	let state = AppState { metrics };

	Router::new()
		.route("/", get(root))
		.route("/status", get(status))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

#[derive(Serialize)]
struct Greeting {
	message: String,
}

async fn root() -> Json<Greeting> {
	Json(Greeting {
		message: format!("Server running, PID: {}", std::process::id()),
	})
}

async fn status(State(state): State<AppState>) -> Json<Status> {
	Json(state.metrics.status().await)
}

use axum::{Json, Router, extract::State, routing::get};

use crate::models::AppState;

#[derive(serde::Serialize)]
pub struct HomeResponse {
    pub ok: bool,
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(home))
}

pub async fn home(State(state): State<AppState>) -> Json<HomeResponse> {
    Json(HomeResponse {
        ok: true,
        message: format!("{} API is running", state.shop_name),
    })
}

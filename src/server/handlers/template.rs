use axum::{extract::State, response::Json};

use crate::builder::ProposalTemplate;
use crate::server::app::AppState;

pub async fn get_template(State(state): State<AppState>) -> Json<ProposalTemplate> {
    Json(state.template.as_ref().clone())
}

use axum::{extract::Query, response::Json};
use serde::Deserialize;

use crate::builder::MainModule;
use crate::catalog;

#[derive(Debug, Default, Deserialize)]
pub struct ModuleQuery {
    pub q: Option<String>,
}

pub async fn search_main_modules(Query(query): Query<ModuleQuery>) -> Json<Vec<MainModule>> {
    Json(catalog::search_modules(query.q.as_deref()))
}

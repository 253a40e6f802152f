pub mod db;
pub mod extractors;
pub mod handlers;
pub mod hierarchy;
pub mod models;
pub mod names;
pub mod rejections;
pub mod sync;
pub mod utils;

use axum::Router;

#[derive(Clone)]
pub struct AppState {
    pub db: db::Db,
    pub secure_cookies: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::plans::routes())
        .merge(handlers::progress::routes())
        .with_state(state)
}

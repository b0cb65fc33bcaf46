pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use sqlx::PgPool;

use crate::services::catalog_service::CatalogService;
use crate::services::question_selector::QuestionSelector;
use crate::services::session_service::SessionService;
use crate::services::session_store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub catalog_service: CatalogService,
    pub session_service: SessionService,
}

impl AppState {
    /// All collaborators are constructed once here and injected explicitly;
    /// nothing is looked up through globals afterwards.
    pub fn new(pool: PgPool) -> Self {
        let catalog_service = CatalogService::new(pool.clone());
        let store = SessionStore::new(pool.clone());
        let selector = QuestionSelector::new(catalog_service.clone());
        let session_service = SessionService::new(store, selector, catalog_service.clone());

        Self {
            pool,
            catalog_service,
            session_service,
        }
    }
}

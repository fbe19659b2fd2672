pub mod models;
pub mod routes;
pub mod store;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;

use bookshelf_kernel::{settings::BooksSettings, InitCtx, Module};

use routes::SharedStore;
use store::BookStore;

/// Books module: one in-memory shelf served under `/api/books`
pub struct BooksModule {
    store: SharedStore,
}

impl BooksModule {
    pub fn new(settings: &BooksSettings) -> Self {
        Self {
            store: Arc::new(Mutex::new(BookStore::new(settings.filter_mode))),
        }
    }

    /// Handle to the shelf shared with the HTTP handlers
    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            filter_mode = ?ctx.settings.books.filter_mode,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.store())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(routes::openapi())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let remaining = routes::lock(&self.store).len();
        tracing::info!(
            module = self.name(),
            books = remaining,
            "books module stopped; shelf discarded"
        );
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(settings: &BooksSettings) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(settings))
}

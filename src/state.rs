use std::sync::Arc;

use crate::{
    clients::{PaymentGateway, PrintProvider},
    config::AppConfig,
    db::{DbPool, OrmConn},
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub payments: Option<Arc<dyn PaymentGateway>>,
    pub printify: Option<Arc<dyn PrintProvider>>,
}

impl AppState {
    /// Payment gateway, or 503 when it is not configured.
    pub fn payments(&self) -> AppResult<&Arc<dyn PaymentGateway>> {
        self.payments
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("Payment gateway not configured.".into()))
    }

    /// Print provider, or 503 when it is not configured.
    pub fn printify(&self) -> AppResult<&Arc<dyn PrintProvider>> {
        self.printify
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("Printify API not configured.".into()))
    }
}

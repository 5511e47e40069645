// Shared state for the axum router
use std::sync::Arc;

use crate::desk::Desk;

#[derive(Clone)]
pub struct AppState {
    pub desk: Arc<Desk>,
}

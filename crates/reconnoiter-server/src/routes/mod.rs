pub mod agents;
pub mod status;

use crate::state::AppState;
use axum::Router;

pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(agents::routes(state))
        .merge(status::routes())
}

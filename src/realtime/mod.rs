pub mod bridge;
pub mod connections;
pub mod events;
pub mod interactions;
pub mod presence;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub use self::connections::{ConnId, Connections};
pub use self::presence::{PresenceEntry, PresenceRegistry};

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(bridge::ws_handler))
}

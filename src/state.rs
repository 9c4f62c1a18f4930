use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::content::ContentStore;
use crate::realtime::{Connections, PresenceRegistry};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub content: ContentStore,
    pub config: Config,
    pub presence: Arc<PresenceRegistry>,
    pub connections: Arc<Connections>,
}

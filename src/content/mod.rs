pub mod posts;

use mongodb::{Client, Collection};

use crate::error::AppResult;

pub use self::posts::{Comment, FeedQuery, FeedSlice, OwnerFilter, Post, SortDirection, SortKey};

/// Handle on the document store holding posts.
///
/// The underlying client connects lazily; an unreachable server surfaces
/// per-operation as `StorageUnavailable`.
#[derive(Clone)]
pub struct ContentStore {
    client: Client,
    database: String,
}

impl ContentStore {
    pub async fn connect(uri: &str, database: &str) -> AppResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self {
            client,
            database: database.to_string(),
        })
    }

    pub fn posts(&self) -> Collection<Post> {
        self.client.database(&self.database).collection("posts")
    }
}

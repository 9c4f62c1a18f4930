use std::collections::{BTreeSet, HashMap};

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::content::posts::{total_pages, FeedQuery, OwnerFilter, Post, SortDirection, SortKey};
use crate::db::accounts::{self, AccountDisplay, UNKNOWN_USER};
use crate::error::AppResult;
use crate::extractors::CurrentAccount;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/posts", get(list_posts))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub hashtag: Option<String>,
    pub filter_by_owner: Option<String>,
    pub user_id: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

impl FeedParams {
    /// Fold raw query params into a feed query. Unknown filter or sort
    /// values fall back to the defaults rather than erroring.
    fn into_query(self, session_account: i64) -> FeedQuery {
        FeedQuery {
            page: self.page.unwrap_or(1).max(1),
            page_size: self.page_size.unwrap_or(10).max(1),
            hashtag: self.hashtag.filter(|tag| !tag.is_empty()),
            owner: OwnerFilter::parse(self.filter_by_owner.as_deref()),
            account_id: self.user_id.unwrap_or(session_account),
            sort_by: SortKey::parse(self.sort_by.as_deref()),
            direction: SortDirection::parse(self.sort_direction.as_deref()),
        }
    }
}

// -- View structs --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    pub id: String,
    pub body: String,
    pub user_id: i64,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub date: String,
    pub time: String,
    pub likes: i64,
    pub liked_by: Vec<i64>,
    pub comments: Vec<FeedComment>,
    pub hashtags: Vec<String>,
    pub images: Vec<String>,
    pub is_shared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_post: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_from: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_from_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedComment {
    pub id: String,
    pub user_id: i64,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub body: String,
    pub date: String,
    pub time: String,
}

// -- Handler --

/// GET /posts — paginated, filtered, sorted feed, enriched with display
/// data from the credential store.
async fn list_posts(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Query(params): Query<FeedParams>,
) -> AppResult<Response> {
    let query = params.into_query(account.id);
    let slice = state.content.list_posts(&query).await?;

    let ids = referenced_accounts(&slice.posts);
    let displays = accounts::display_map(&state.db, &ids)?;
    let posts: Vec<FeedPost> = slice
        .posts
        .into_iter()
        .map(|post| enrich(post, &displays))
        .collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "posts": posts,
        "total": slice.total,
        "page": query.page,
        "pageSize": query.page_size,
        "totalPages": total_pages(slice.total, query.page_size),
    }))
    .into_response())
}

// -- Enrichment helpers --

/// Every account id a page of posts refers to: authors, commenters, and
/// original authors of shared posts.
fn referenced_accounts(posts: &[Post]) -> Vec<i64> {
    let mut ids = BTreeSet::new();
    for post in posts {
        ids.insert(post.author_id);
        for comment in &post.comments {
            ids.insert(comment.author_id);
        }
        if let Some(original_author) = post.shared_from {
            ids.insert(original_author);
        }
    }
    ids.into_iter().collect()
}

fn display_of(displays: &HashMap<i64, AccountDisplay>, id: i64) -> (String, Option<String>) {
    match displays.get(&id) {
        Some(display) => (display.name.clone(), display.avatar.clone()),
        None => (UNKNOWN_USER.to_string(), None),
    }
}

fn enrich(post: Post, displays: &HashMap<i64, AccountDisplay>) -> FeedPost {
    let (user_name, user_avatar) = display_of(displays, post.author_id);
    let shared_from_name = post.shared_from.map(|id| display_of(displays, id).0);

    FeedPost {
        id: post.id.map(|id| id.to_hex()).unwrap_or_default(),
        body: post.body,
        user_id: post.author_id,
        user_name,
        user_avatar,
        date: post.date,
        time: post.time,
        likes: post.likes,
        liked_by: post.liked_by,
        comments: post
            .comments
            .into_iter()
            .map(|comment| {
                let (user_name, user_avatar) = display_of(displays, comment.author_id);
                FeedComment {
                    id: comment.id.to_hex(),
                    user_id: comment.author_id,
                    user_name,
                    user_avatar,
                    body: comment.body,
                    date: comment.date,
                    time: comment.time,
                }
            })
            .collect(),
        hashtags: post.hashtags,
        images: post.images,
        is_shared: post.is_shared,
        original_post: post.original_post.map(|id| id.to_hex()),
        shared_from: post.shared_from,
        shared_from_name,
    }
}

use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

use crate::content::ContentStore;
use crate::error::{AppError, AppResult};

pub const ALREADY_LIKED: &str = "Vous avez déjà liké ce post";

/// A post document. Comments are embedded; they have no identity outside
/// their parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub body: String,
    pub author_id: i64,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub liked_by: Vec<i64>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_post: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_from: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: ObjectId,
    pub author_id: i64,
    pub body: String,
    pub date: String,
    pub time: String,
}

impl Comment {
    pub fn new(author_id: i64, body: String) -> Self {
        let (date, time) = now_split();
        Self {
            id: ObjectId::new(),
            author_id,
            body,
            date,
            time,
        }
    }
}

impl Post {
    /// A share is a fresh post copying the source's content, carrying
    /// lineage fields and zeroed like/comment state. The source is never
    /// mutated.
    pub fn shared_copy(source: &Post, shared_by: i64) -> Post {
        let (date, time) = now_split();
        Post {
            id: None,
            body: source.body.clone(),
            author_id: shared_by,
            date,
            time,
            likes: 0,
            liked_by: Vec::new(),
            comments: Vec::new(),
            hashtags: source.hashtags.clone(),
            images: source.images.clone(),
            is_shared: true,
            original_post: source.id,
            shared_from: Some(source.author_id),
        }
    }
}

/// Current UTC timestamp split into date and time-of-day strings, the way
/// posts and comments store it.
pub fn now_split() -> (String, String) {
    let now = Utc::now();
    (
        now.format("%Y-%m-%d").to_string(),
        now.format("%H:%M:%S").to_string(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerFilter {
    Mine,
    Others,
    All,
}

impl OwnerFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("mine") => OwnerFilter::Mine,
            Some("others") => OwnerFilter::Others,
            _ => OwnerFilter::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Date,
    Author,
    Likes,
}

impl SortKey {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("author") => SortKey::Author,
            Some("likes") => SortKey::Likes,
            _ => SortKey::Date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    fn sign(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// Filter, sort and pagination for the feed. Pages are 1-indexed.
#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub page: u64,
    pub page_size: u64,
    pub hashtag: Option<String>,
    pub owner: OwnerFilter,
    pub account_id: i64,
    pub sort_by: SortKey,
    pub direction: SortDirection,
}

impl FeedQuery {
    pub fn filter_doc(&self) -> Document {
        let mut filter = doc! {};
        if let Some(tag) = &self.hashtag {
            filter.insert("hashtags", tag.as_str());
        }
        match self.owner {
            OwnerFilter::Mine => {
                filter.insert("authorId", self.account_id);
            }
            OwnerFilter::Others => {
                filter.insert("authorId", doc! { "$ne": self.account_id });
            }
            OwnerFilter::All => {}
        }
        filter
    }

    pub fn sort_doc(&self) -> Document {
        let d = self.direction.sign();
        match self.sort_by {
            SortKey::Date => doc! { "date": d, "time": d },
            SortKey::Author => doc! { "authorId": d, "date": d, "time": d },
            SortKey::Likes => doc! { "likes": d, "date": d, "time": d },
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.page_size
    }
}

pub fn total_pages(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// One page of matching posts plus the total match count.
#[derive(Debug)]
pub struct FeedSlice {
    pub posts: Vec<Post>,
    pub total: u64,
}

impl ContentStore {
    pub async fn list_posts(&self, query: &FeedQuery) -> AppResult<FeedSlice> {
        let posts = self.posts();
        let filter = query.filter_doc();

        let total = posts.count_documents(filter.clone()).await?;
        let page = posts
            .find(filter)
            .sort(query.sort_doc())
            .skip(query.skip())
            .limit(query.page_size as i64)
            .await?
            .try_collect()
            .await?;

        Ok(FeedSlice { posts: page, total })
    }

    /// Register a like. A single conditional update keeps the
    /// not-yet-liked check and the write atomic, so two concurrent likes
    /// from the same account cannot both land.
    pub async fn like_post(&self, post_id: &str, account_id: i64) -> AppResult<i64> {
        let posts = self.posts();
        let id = parse_post_id(post_id)?;

        let matched = posts
            .update_one(
                doc! { "_id": id, "likedBy": { "$ne": account_id } },
                doc! { "$inc": { "likes": 1 }, "$push": { "likedBy": account_id } },
            )
            .await?
            .matched_count;

        if matched == 0 {
            // Nothing matched: the post is missing, or this account is
            // already in likedBy.
            return match posts.find_one(doc! { "_id": id }).await? {
                None => Err(AppError::NotFound),
                Some(_) => Err(AppError::InvalidInput(ALREADY_LIKED.to_string())),
            };
        }

        let updated = posts
            .find_one(doc! { "_id": id })
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(updated.likes)
    }

    pub async fn add_comment(&self, post_id: &str, comment: &Comment) -> AppResult<()> {
        let posts = self.posts();
        let id = parse_post_id(post_id)?;

        let matched = posts
            .update_one(
                doc! { "_id": id },
                doc! { "$push": { "comments": mongodb::bson::to_bson(comment)? } },
            )
            .await?
            .matched_count;

        if matched == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Copy the source post into a new shared post. Returns the inserted
    /// copy with its generated id.
    pub async fn share_post(&self, post_id: &str, shared_by: i64) -> AppResult<Post> {
        let posts = self.posts();
        let id = parse_post_id(post_id)?;

        let source = posts
            .find_one(doc! { "_id": id })
            .await?
            .ok_or(AppError::NotFound)?;

        let mut copy = Post::shared_copy(&source, shared_by);
        let inserted = posts.insert_one(&copy).await?;
        let new_id = inserted
            .inserted_id
            .as_object_id()
            .ok_or(AppError::PersistenceFailure)?;
        copy.id = Some(new_id);
        Ok(copy)
    }
}

fn parse_post_id(raw: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| AppError::InvalidInput("invalid post id".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{from_document, to_document, Bson};

    fn query() -> FeedQuery {
        FeedQuery {
            page: 1,
            page_size: 10,
            hashtag: None,
            owner: OwnerFilter::All,
            account_id: 1,
            sort_by: SortKey::Date,
            direction: SortDirection::Desc,
        }
    }

    fn post(author_id: i64) -> Post {
        Post {
            id: Some(ObjectId::new()),
            body: "bonjour".to_string(),
            author_id,
            date: "2025-06-01".to_string(),
            time: "12:00:00".to_string(),
            likes: 2,
            liked_by: vec![4, 5],
            comments: vec![Comment::new(4, "salut".to_string())],
            hashtags: vec!["rust".to_string()],
            images: vec!["img/1.png".to_string()],
            is_shared: false,
            original_post: None,
            shared_from: None,
        }
    }

    #[test]
    fn filter_defaults_to_everything() {
        assert_eq!(query().filter_doc(), doc! {});
    }

    #[test]
    fn filter_hashtag_matches_array_membership() {
        let mut q = query();
        q.hashtag = Some("rust".to_string());
        assert_eq!(q.filter_doc(), doc! { "hashtags": "rust" });
    }

    #[test]
    fn filter_mine_pins_author() {
        let mut q = query();
        q.owner = OwnerFilter::Mine;
        q.account_id = 7;
        assert_eq!(q.filter_doc(), doc! { "authorId": 7_i64 });
    }

    #[test]
    fn filter_others_excludes_author() {
        let mut q = query();
        q.owner = OwnerFilter::Others;
        q.account_id = 7;
        assert_eq!(q.filter_doc(), doc! { "authorId": { "$ne": 7_i64 } });
    }

    #[test]
    fn filter_combines_hashtag_and_owner() {
        let mut q = query();
        q.hashtag = Some("rust".to_string());
        q.owner = OwnerFilter::Mine;
        let filter = q.filter_doc();
        assert_eq!(filter.get_str("hashtags").unwrap(), "rust");
        assert_eq!(filter.get_i64("authorId").unwrap(), 1);
    }

    #[test]
    fn default_sort_is_date_time_descending() {
        assert_eq!(query().sort_doc(), doc! { "date": -1, "time": -1 });
    }

    #[test]
    fn author_sort_breaks_ties_by_date_time() {
        let mut q = query();
        q.sort_by = SortKey::Author;
        q.direction = SortDirection::Asc;
        assert_eq!(q.sort_doc(), doc! { "authorId": 1, "date": 1, "time": 1 });
    }

    #[test]
    fn likes_sort_breaks_ties_by_date_time() {
        let mut q = query();
        q.sort_by = SortKey::Likes;
        assert_eq!(q.sort_doc(), doc! { "likes": -1, "date": -1, "time": -1 });
    }

    #[test]
    fn skip_is_zero_for_first_page() {
        assert_eq!(query().skip(), 0);
    }

    #[test]
    fn skip_advances_by_page_size() {
        let mut q = query();
        q.page = 3;
        assert_eq!(q.skip(), 20);
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(30, 10), 3);
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
    }

    #[test]
    fn parse_owner_filter_falls_back_to_all() {
        assert_eq!(OwnerFilter::parse(Some("mine")), OwnerFilter::Mine);
        assert_eq!(OwnerFilter::parse(Some("others")), OwnerFilter::Others);
        assert_eq!(OwnerFilter::parse(Some("bogus")), OwnerFilter::All);
        assert_eq!(OwnerFilter::parse(None), OwnerFilter::All);
    }

    #[test]
    fn parse_sort_falls_back_to_date_desc() {
        assert_eq!(SortKey::parse(Some("author")), SortKey::Author);
        assert_eq!(SortKey::parse(Some("likes")), SortKey::Likes);
        assert_eq!(SortKey::parse(None), SortKey::Date);
        assert_eq!(SortDirection::parse(Some("asc")), SortDirection::Asc);
        assert_eq!(SortDirection::parse(Some("desc")), SortDirection::Desc);
        assert_eq!(SortDirection::parse(None), SortDirection::Desc);
    }

    #[test]
    fn shared_copy_carries_lineage_and_zeroed_state() {
        let source = post(3);
        let copy = Post::shared_copy(&source, 9);

        assert_eq!(copy.body, source.body);
        assert_eq!(copy.hashtags, source.hashtags);
        assert_eq!(copy.images, source.images);
        assert_eq!(copy.author_id, 9);
        assert!(copy.is_shared);
        assert_eq!(copy.original_post, source.id);
        assert_eq!(copy.shared_from, Some(3));
        assert_eq!(copy.likes, 0);
        assert!(copy.liked_by.is_empty());
        assert!(copy.comments.is_empty());
        assert!(copy.id.is_none());
    }

    #[test]
    fn comment_timestamps_use_split_format() {
        let comment = Comment::new(1, "salut".to_string());
        assert_eq!(comment.date.len(), 10);
        assert_eq!(comment.time.len(), 8);
        assert!(comment.date.chars().nth(4) == Some('-'));
        assert!(comment.time.chars().nth(2) == Some(':'));
    }

    #[test]
    fn post_serializes_with_camel_case_fields() {
        let doc = to_document(&post(3)).unwrap();
        assert!(doc.contains_key("authorId"));
        assert!(doc.contains_key("likedBy"));
        assert!(doc.contains_key("isShared"));
        assert!(!doc.contains_key("originalPost"));
        assert!(doc.contains_key("_id"));
    }

    #[test]
    fn unsaved_post_omits_id() {
        let copy = Post::shared_copy(&post(3), 9);
        let doc = to_document(&copy).unwrap();
        assert!(!doc.contains_key("_id"));
        assert_eq!(doc.get_bool("isShared").unwrap(), true);
        assert!(matches!(doc.get("originalPost"), Some(Bson::ObjectId(_))));
    }

    #[test]
    fn sparse_document_deserializes_with_defaults() {
        let doc = doc! {
            "_id": ObjectId::new(),
            "body": "bonjour",
            "authorId": 3_i64,
            "date": "2025-06-01",
            "time": "12:00:00",
        };
        let post: Post = from_document(doc).unwrap();
        assert_eq!(post.likes, 0);
        assert!(post.liked_by.is_empty());
        assert!(post.comments.is_empty());
        assert!(!post.is_shared);
        assert!(post.original_post.is_none());
    }
}

use crate::content::posts::Comment;
use crate::error::AppResult;
use crate::realtime::connections::ConnId;
use crate::realtime::events::{
    CommentPayload, CommentView, LikePayload, ServerEvent, SharePayload,
};
use crate::state::AppState;

/// like-post: one atomic conditional update registers the like, then the
/// new total goes out to every connection.
pub async fn like(state: &AppState, payload: LikePayload) -> AppResult<()> {
    let (post_id, user_id) = payload.validate()?;

    let total_likes = state.content.like_post(&post_id, user_id).await?;

    state
        .connections
        .broadcast(ServerEvent::PostLiked {
            post_id,
            user_id,
            total_likes,
        })
        .await;
    Ok(())
}

/// add-comment: append an embedded comment and broadcast it with the
/// commenter's display name.
pub async fn comment(state: &AppState, payload: CommentPayload) -> AppResult<()> {
    let (post_id, user_id, content, user_name) = payload.validate()?;

    let comment = Comment::new(user_id, content);
    state.content.add_comment(&post_id, &comment).await?;

    state
        .connections
        .broadcast(ServerEvent::NewComment {
            post_id,
            comment: CommentView {
                id: comment.id.to_hex(),
                user_id,
                user_name,
                body: comment.body,
                date: comment.date,
                time: comment.time,
            },
        })
        .await;
    Ok(())
}

/// share-post: copy the source into a new post, announce it to everyone,
/// and confirm to the sharer alone.
pub async fn share(state: &AppState, conn_id: ConnId, payload: SharePayload) -> AppResult<()> {
    let (post_id, user_id, user_name) = payload.validate()?;

    let copy = state.content.share_post(&post_id, user_id).await?;
    let new_post_id = copy.id.map(|id| id.to_hex()).unwrap_or_default();

    state
        .connections
        .broadcast(ServerEvent::PostShared {
            post_id,
            new_post_id: new_post_id.clone(),
            user_id,
            user_name,
            date: copy.date.clone(),
        })
        .await;

    state
        .connections
        .send(conn_id, ServerEvent::ShareSuccess { new_post_id })
        .await;
    Ok(())
}

use serde::{Deserialize, Serialize};

use crate::db::accounts::{ConnectedAccount, UNKNOWN_USER};
use crate::error::{AppError, AppResult};

/// Messages a client may send. The wire envelope is
/// `{"event": "<name>", "data": {...}}`; required fields are checked by the
/// `validate` methods before dispatch, so handlers only see complete
/// payloads.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    Authenticate(AuthenticatePayload),
    GetConnectedUsers,
    LikePost(LikePayload),
    AddComment(CommentPayload),
    SharePost(SharePayload),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatePayload {
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikePayload {
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPayload {
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePayload {
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub user_name: Option<String>,
}

impl LikePayload {
    pub fn validate(self) -> AppResult<(String, i64)> {
        let post_id = required_str(self.post_id, "postId")?;
        let user_id = required(self.user_id, "userId")?;
        Ok((post_id, user_id))
    }
}

impl CommentPayload {
    pub fn validate(self) -> AppResult<(String, i64, String, String)> {
        let post_id = required_str(self.post_id, "postId")?;
        let user_id = required(self.user_id, "userId")?;
        let content = required_str(self.content, "content")?;
        let user_name = self
            .user_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_USER.to_string());
        Ok((post_id, user_id, content, user_name))
    }
}

impl SharePayload {
    pub fn validate(self) -> AppResult<(String, i64, String)> {
        let post_id = required_str(self.post_id, "postId")?;
        let user_id = required(self.user_id, "userId")?;
        let user_name = self
            .user_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_USER.to_string());
        Ok((post_id, user_id, user_name))
    }
}

fn required<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::InvalidInput(format!("{} is required", field)))
}

// Empty strings count as missing.
fn required_str(value: Option<String>, field: &str) -> AppResult<String> {
    match value {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(AppError::InvalidInput(format!("{} is required", field))),
    }
}

/// Messages the server pushes to clients, same envelope as `ClientEvent`.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    ConnectedUsers(Vec<ConnectedAccount>),
    UserConnected {
        id: i64,
        name: String,
    },
    UserDisconnected {
        id: i64,
        name: String,
    },
    PostLiked {
        post_id: String,
        user_id: i64,
        total_likes: i64,
    },
    NewComment {
        post_id: String,
        comment: CommentView,
    },
    PostShared {
        post_id: String,
        new_post_id: String,
        user_id: i64,
        user_name: String,
        date: String,
    },
    ShareSuccess {
        new_post_id: String,
    },
    Error {
        message: String,
    },
}

/// Embedded comment as broadcast to clients, display name included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub user_id: i64,
    pub user_name: String,
    pub body: String,
    pub date: String,
    pub time: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn authenticate_event_parses() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"authenticate","data":{"userId":1}}"#).unwrap();
        match event {
            ClientEvent::Authenticate(payload) => assert_eq!(payload.user_id, Some(1)),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn authenticate_without_id_parses_as_empty_payload() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"authenticate","data":{}}"#).unwrap();
        match event {
            ClientEvent::Authenticate(payload) => assert!(payload.user_id.is_none()),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn get_connected_users_needs_no_data() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"get-connected-users"}"#).unwrap();
        assert!(matches!(event, ClientEvent::GetConnectedUsers));
    }

    #[test]
    fn like_event_parses_camel_case_fields() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"event":"like-post","data":{"postId":"abc","userId":4}}"#,
        )
        .unwrap();
        match event {
            ClientEvent::LikePost(payload) => {
                assert_eq!(payload.post_id.as_deref(), Some("abc"));
                assert_eq!(payload.user_id, Some(4));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn unknown_event_is_rejected() {
        let result = serde_json::from_str::<ClientEvent>(r#"{"event":"reboot","data":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn like_validation_requires_both_fields() {
        let err = LikePayload {
            post_id: Some("abc".into()),
            user_id: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.public_message(), "userId is required");

        let err = LikePayload {
            post_id: None,
            user_id: Some(4),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.public_message(), "postId is required");
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let err = CommentPayload {
            post_id: Some("abc".into()),
            user_id: Some(4),
            content: Some(String::new()),
            user_name: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.public_message(), "content is required");
    }

    #[test]
    fn comment_validation_defaults_user_name() {
        let (_, _, _, user_name) = CommentPayload {
            post_id: Some("abc".into()),
            user_id: Some(4),
            content: Some("salut".into()),
            user_name: None,
        }
        .validate()
        .unwrap();
        assert_eq!(user_name, UNKNOWN_USER);
    }

    #[test]
    fn post_liked_serializes_with_envelope() {
        let event = ServerEvent::PostLiked {
            post_id: "abc".to_string(),
            user_id: 4,
            total_likes: 2,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "post-liked",
                "data": {"postId": "abc", "userId": 4, "totalLikes": 2}
            })
        );
    }

    #[test]
    fn connected_users_payload_is_a_bare_list() {
        let event = ServerEvent::ConnectedUsers(vec![ConnectedAccount {
            id: 1,
            name: "Alice Martin".to_string(),
            avatar: None,
        }]);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "connected-users");
        assert!(value["data"].is_array());
        assert_eq!(value["data"][0]["name"], "Alice Martin");
    }

    #[test]
    fn error_event_carries_message() {
        let event = ServerEvent::Error {
            message: "Vous avez déjà liké ce post".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["data"]["message"], "Vous avez déjà liké ce post");
    }
}

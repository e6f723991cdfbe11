pub mod create;
pub mod get;
pub mod moderate;

use serde::Serialize;

use crate::blog::models::comment::Comment;

// What public readers see; the submitter's email stays private to the
// moderation view.
#[derive(Debug, Serialize, Clone)]
pub struct CommentView {
    pub id: i32,
    pub name: String,
    pub comment: String,
    pub created_at: chrono::NaiveDateTime,
}

impl From<Comment> for CommentView {
    fn from(c: Comment) -> Self {
        CommentView {
            id: c.id,
            name: c.name,
            comment: c.content,
            created_at: c.created_at,
        }
    }
}

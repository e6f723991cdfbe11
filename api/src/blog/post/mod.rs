pub mod admin;
pub mod fallback;
pub mod get;
pub mod list;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::blog::models::post::Post;

pub const UNKNOWN_AUTHOR: &str = "Unknown";

// The post shape the site consumes. All defaulting of nullable backend
// columns happens here, once.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PostView {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub author: String,
    pub author_profession: String,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub read_time: String,
    pub featured: bool,
    pub published: bool,
    pub comments_enabled: bool,
    pub publish_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<Post> for PostView {
    fn from(row: Post) -> Self {
        PostView {
            id: row.id,
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            content: row.content,
            author: row
                .author
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.into()),
            author_profession: row.author_profession.unwrap_or_default(),
            tags: row.tags,
            image: row.image,
            read_time: row.read_time.unwrap_or_default(),
            featured: row.featured,
            published: row.published,
            comments_enabled: row.comments_enabled,
            publish_date: row.publish_date.unwrap_or(row.created_at),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_row_defaults_applied_once() {
        let created = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();

        let row = Post {
            id: 1,
            slug: "s".into(),
            title: "t".into(),
            excerpt: "".into(),
            content: "".into(),
            author: Some("   ".into()),
            author_profession: None,
            tags: vec![],
            image: None,
            read_time: None,
            featured: false,
            published: true,
            comments_enabled: true,
            publish_date: None,
            created_at: created,
            updated_at: created,
        };

        let view = PostView::from(row);
        assert_eq!(view.author, UNKNOWN_AUTHOR);
        assert_eq!(view.author_profession, "");
        assert_eq!(view.read_time, "");
        assert_eq!(view.publish_date, created);
    }
}

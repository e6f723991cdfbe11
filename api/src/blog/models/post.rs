use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Queryable, Selectable, Identifiable, Debug, Serialize, Clone)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Post {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub author: Option<String>,
    pub author_profession: Option<String>,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub read_time: Option<String>,
    pub featured: bool,
    pub published: bool,
    pub comments_enabled: bool,
    pub publish_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::posts)]
pub struct NewPost {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub author: Option<String>,
    pub author_profession: Option<String>,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub read_time: Option<String>,
    pub featured: bool,
    pub published: bool,
    pub comments_enabled: bool,
    pub publish_date: Option<NaiveDateTime>,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::posts)]
pub struct UpdatePost {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub author_profession: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
    pub read_time: Option<String>,
    pub featured: Option<bool>,
    pub published: Option<bool>,
    pub comments_enabled: Option<bool>,
    pub publish_date: Option<NaiveDateTime>,
}

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Queryable, Selectable, Identifiable, Debug, Serialize, Clone)]
#[diesel(table_name = crate::schema::trending_posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TrendingPost {
    pub id: i32,
    pub slug: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::trending_posts)]
pub struct NewTrendingPost {
    pub slug: String,
}

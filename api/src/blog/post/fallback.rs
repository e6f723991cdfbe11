//! Static content served when the database is unreachable. Callers treat
//! this list as drop-in compatible with live data.

use std::sync::LazyLock;

use chrono::NaiveDate;

use super::PostView;

static FALLBACK_POSTS: LazyLock<Vec<PostView>> = LazyLock::new(|| {
    let date = |y, m, d| {
        NaiveDate::from_ymd_opt(y, m, d)
            .expect("valid fallback date")
            .and_hms_opt(12, 0, 0)
            .expect("valid fallback time")
    };

    // Negative ids so synthetic rows can never collide with live ones.
    vec![
        PostView {
            id: -1,
            slug: "welcome".into(),
            title: "Welcome to the blog".into(),
            excerpt: "What this site is about, and why you might be seeing \
                      this particular copy of it."
                .into(),
            content: include_str!("fallback/welcome.md").into(),
            author: "Site Owner".into(),
            author_profession: "Software Engineer".into(),
            tags: vec!["meta".into()],
            image: None,
            read_time: "2 min read".into(),
            featured: true,
            published: true,
            comments_enabled: false,
            publish_date: date(2024, 6, 1),
            created_at: date(2024, 6, 1),
            updated_at: date(2024, 6, 1),
        },
        PostView {
            id: -2,
            slug: "building-this-site".into(),
            title: "Building this site".into(),
            excerpt: "A tour of the moving parts behind the blog, including \
                      the fallback list you may be reading right now."
                .into(),
            content: include_str!("fallback/building-this-site.md").into(),
            author: "Site Owner".into(),
            author_profession: "Software Engineer".into(),
            tags: vec!["meta".into(), "rust".into()],
            image: None,
            read_time: "4 min read".into(),
            featured: false,
            published: true,
            comments_enabled: false,
            publish_date: date(2024, 6, 8),
            created_at: date(2024, 6, 8),
            updated_at: date(2024, 6, 8),
        },
    ]
});

pub fn fallback_posts() -> Vec<PostView> {
    FALLBACK_POSTS.clone()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fallback_posts_are_published_with_unique_slugs() {
        let posts = fallback_posts();
        assert!(!posts.is_empty());
        assert!(posts.iter().all(|p| p.published));

        let mut slugs: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), posts.len());
    }

    #[test]
    fn test_fallback_content_renders() {
        for post in fallback_posts() {
            let html = crate::markdown::render(&post.content);
            assert!(!html.is_empty(), "fallback post `{}` is empty", post.slug);
        }
    }
}

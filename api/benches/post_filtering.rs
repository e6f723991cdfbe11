use std::cmp::Ordering;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::Rng;

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_filtering");
    for n in [10, 100, 1000, 10000].iter() {
        let posts = generate_posts(*n);
        group.bench_function(BenchmarkId::new("filter_by_search", n), |b| {
            b.iter(|| filter_posts(posts.clone(), Some("rust"), Some("part")))
        });
        group.bench_function(BenchmarkId::new("natural_title_sort", n), |b| {
            b.iter(|| {
                let mut posts = posts.clone();
                posts.sort_by(|a, b| natural_cmp(&a.title, &b.title));
                posts
            })
        });
    }
    group.finish();
}

#[derive(Clone)]
struct Post {
    title: String,
    excerpt: String,
    tags: Vec<String>,
}

fn generate_posts(n: usize) -> Vec<Post> {
    let tag_pool = ["rust", "games", "meta", "databases", "webdev"];
    let mut posts = Vec::with_capacity(n);
    for i in 0..n {
        let tag = tag_pool[rand::rng().random_range(0..tag_pool.len())];
        posts.push(Post {
            title: format!("Part {} of the {tag} series", i % 97),
            excerpt: format!("Notes on {tag}, installment {i}"),
            tags: vec![tag.to_string()],
        });
    }
    posts
}

fn filter_posts(posts: Vec<Post>, tag: Option<&str>, q: Option<&str>) -> Vec<Post> {
    let q = q.map(str::to_lowercase);

    posts
        .into_iter()
        .filter(|post| {
            if let Some(tag) = tag {
                if !post.tags.iter().any(|t| t == tag) {
                    return false;
                }
            }

            if let Some(q) = &q {
                let matches = post.title.to_lowercase().contains(q)
                    || post.excerpt.to_lowercase().contains(q)
                    || post.tags.iter().any(|t| t.to_lowercase().contains(q));
                if !matches {
                    return false;
                }
            }

            true
        })
        .collect()
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ac = a.chars().peekable();
    let mut bc = b.chars().peekable();

    loop {
        match (ac.peek().copied(), bc.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x.is_ascii_digit() && y.is_ascii_digit() {
                    let xr = take_digit_run(&mut ac);
                    let yr = take_digit_run(&mut bc);
                    let ord = cmp_digit_runs(&xr, &yr);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                } else {
                    let ord = x.to_lowercase().cmp(y.to_lowercase());
                    if ord != Ordering::Equal {
                        return ord;
                    }
                    ac.next();
                    bc.next();
                }
            }
        }
    }
}

fn take_digit_run(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(*c);
        chars.next();
    }
    run
}

fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');

    match a.len().cmp(&b.len()) {
        Ordering::Equal => a.cmp(b),
        ord => ord,
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

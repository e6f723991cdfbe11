//! Turns post markdown into display HTML.
//!
//! Two transformations beyond stock rendering: raw HTML `<img>` tags inside
//! the markdown are normalized into the same markup as markdown-native
//! images, and footnotes are renumbered with bare `fn-N`/`fnref-N` ids so
//! in-document anchors resolve. External links open in a new tab without
//! leaking a referrer. Other raw HTML passes through untouched; post content
//! is written by the site owner only.

use std::collections::HashMap;
use std::sync::LazyLock;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};
use regex::Regex;

static RAW_IMG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("img tag regex"));
static SRC_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)src\s*=\s*["']([^"']*)["']"#).expect("src attr regex"));
static ALT_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)alt\s*=\s*["']([^"']*)["']"#).expect("alt attr regex"));

pub fn render(markdown: &str) -> String {
    if markdown.trim().is_empty() {
        return String::new();
    }

    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_SMART_PUNCTUATION;

    let events: Vec<Event> = Parser::new_ext(markdown, options).collect();

    let (body, definitions) = split_footnote_definitions(events);

    let mut footnotes = FootnoteIndex::default();
    let mut out = rewrite(body, &mut footnotes);
    append_footnote_section(&mut out, &definitions, &mut footnotes);

    let mut html_output = String::new();
    html::push_html(&mut html_output, out.into_iter());
    html_output
}

/// Assigns footnote numbers in order of first reference.
#[derive(Default)]
struct FootnoteIndex {
    numbers: HashMap<String, usize>,
    order: Vec<String>,
}

impl FootnoteIndex {
    fn number(&mut self, label: &str) -> usize {
        if let Some(n) = self.numbers.get(label) {
            return *n;
        }
        self.order.push(label.to_string());
        let n = self.order.len();
        self.numbers.insert(label.to_string(), n);
        n
    }
}

/// Pulls footnote definition bodies out of the stream so they can be
/// re-emitted as one ordered section at the end of the document.
fn split_footnote_definitions<'a>(
    events: Vec<Event<'a>>,
) -> (Vec<Event<'a>>, HashMap<String, Vec<Event<'a>>>) {
    let mut body = Vec::with_capacity(events.len());
    let mut definitions: HashMap<String, Vec<Event<'a>>> = HashMap::new();
    let mut current: Option<(String, Vec<Event<'a>>)> = None;

    for event in events {
        match event {
            Event::Start(Tag::FootnoteDefinition(label)) => {
                current = Some((label.to_string(), Vec::new()));
            }
            Event::End(TagEnd::FootnoteDefinition) => {
                if let Some((label, events)) = current.take() {
                    definitions.insert(label, events);
                }
            }
            event => match current.as_mut() {
                Some((_, events)) => events.push(event),
                None => body.push(event),
            },
        }
    }

    (body, definitions)
}

fn rewrite<'a>(events: Vec<Event<'a>>, footnotes: &mut FootnoteIndex) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    // Tracks, per open link, whether the opening tag was rewritten so the
    // matching close tag can be too.
    let mut link_rewrites: Vec<bool> = Vec::new();

    let mut i = 0;
    while i < events.len() {
        match &events[i] {
            Event::Html(h) | Event::InlineHtml(h) if RAW_IMG.is_match(h) => {
                out.push(Event::Html(normalize_raw_images(h).into()));
            }
            Event::FootnoteReference(label) => {
                let n = footnotes.number(label);
                out.push(Event::Html(
                    format!(
                        r##"<sup class="footnote-reference" id="fnref-{n}"><a href="#fn-{n}">{n}</a></sup>"##
                    )
                    .into(),
                ));
            }
            Event::Start(Tag::Image { dest_url, .. }) => {
                let dest = dest_url.to_string();
                let mut alt = String::new();

                // The events up to the matching end tag are the alt text.
                i += 1;
                while i < events.len() {
                    match &events[i] {
                        Event::End(TagEnd::Image) => break,
                        Event::Text(t) | Event::Code(t) => alt.push_str(t),
                        _ => {}
                    }
                    i += 1;
                }

                out.push(Event::Html(image_html(&dest, &alt).into()));
            }
            Event::Start(Tag::Link {
                dest_url, title, ..
            }) => match external_link_open(dest_url, title) {
                Some(open_tag) => {
                    link_rewrites.push(true);
                    out.push(Event::Html(open_tag.into()));
                }
                None => {
                    link_rewrites.push(false);
                    out.push(events[i].clone());
                }
            },
            Event::End(TagEnd::Link) => {
                if link_rewrites.pop().unwrap_or(false) {
                    out.push(Event::Html("</a>".into()));
                } else {
                    out.push(Event::End(TagEnd::Link));
                }
            }
            event => out.push(event.clone()),
        }
        i += 1;
    }

    out
}

fn append_footnote_section<'a>(
    out: &mut Vec<Event<'a>>,
    definitions: &HashMap<String, Vec<Event<'a>>>,
    footnotes: &mut FootnoteIndex,
) {
    if footnotes.order.is_empty() {
        return;
    }

    out.push(Event::Html(
        r#"<section class="footnotes"><hr><ol>"#.into(),
    ));

    // Definitions can reference further footnotes, so the order can grow
    // while we walk it.
    let mut n = 0;
    while n < footnotes.order.len() {
        let label = footnotes.order[n].clone();
        let number = n + 1;

        out.push(Event::Html(format!(r#"<li id="fn-{number}">"#).into()));
        if let Some(body) = definitions.get(&label) {
            out.extend(rewrite(body.clone(), footnotes));
        }
        out.push(Event::Html(
            format!(r##"<a class="footnote-backref" href="#fnref-{number}">↩</a></li>"##).into(),
        ));

        n += 1;
    }

    out.push(Event::Html("</ol></section>".into()));
}

/// Replaces every raw `<img ...>` tag that carries a `src` attribute with
/// the normalized image markup; tags without a `src` are left as-is.
fn normalize_raw_images(fragment: &str) -> String {
    RAW_IMG
        .replace_all(fragment, |caps: &regex::Captures| {
            let tag = &caps[0];
            let src = SRC_ATTR.captures(tag).map(|c| c[1].to_string());
            let alt = ALT_ATTR
                .captures(tag)
                .map(|c| c[1].to_string())
                .unwrap_or_default();

            match src {
                Some(src) => image_html(&src, &alt),
                None => tag.to_string(),
            }
        })
        .into_owned()
}

fn image_html(src: &str, alt: &str) -> String {
    format!(
        r#"<img src="{}" alt="{}" class="post-image" loading="lazy" onerror="this.style.display='none'">"#,
        escape_attr(src),
        escape_attr(alt)
    )
}

/// Returns a rewritten opening tag for absolute http(s) links; `None` keeps
/// the default rendering (anchors and relative paths stay same-page).
fn external_link_open(dest: &str, title: &str) -> Option<String> {
    if dest.starts_with('#') {
        return None;
    }

    let parsed = url::Url::parse(dest).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }

    let title_attr = if title.is_empty() {
        String::new()
    } else {
        format!(r#" title="{}""#, escape_attr(title))
    };

    Some(format!(
        r#"<a href="{}"{} target="_blank" rel="noopener noreferrer">"#,
        escape_attr(dest),
        title_attr
    ))
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_content_renders_to_nothing() {
        assert_eq!(render(""), "");
        assert_eq!(render("   \n\t  "), "");
    }

    #[test]
    fn test_plain_paragraph() {
        let html = render("Hello world");
        assert_eq!(html.trim(), "<p>Hello world</p>");
    }

    #[test]
    fn test_raw_html_img_is_normalized() {
        let html = render(r#"<img src="x.png" alt="y">"#);
        assert!(html.contains(r#"src="x.png""#), "{html}");
        assert!(html.contains(r#"alt="y""#), "{html}");
        assert!(html.contains(r#"loading="lazy""#), "{html}");
        assert!(html.contains(r#"class="post-image""#), "{html}");
    }

    #[test]
    fn test_raw_img_matches_markdown_native_image() {
        fn img_tag(html: &str) -> &str {
            let start = html.find("<img").expect("img tag present");
            let end = html[start..].find('>').expect("img tag closed");
            &html[start..start + end + 1]
        }

        let raw = render(r#"<img src="x.png" alt="y">"#);
        let native = render("![y](x.png)");
        assert_eq!(img_tag(&raw), img_tag(&native));
    }

    #[test]
    fn test_raw_img_single_quotes_and_attribute_order() {
        let html = render(r#"<img alt='caption' class="old" src='photo.jpg'>"#);
        assert!(html.contains(r#"src="photo.jpg""#), "{html}");
        assert!(html.contains(r#"alt="caption""#), "{html}");
    }

    #[test]
    fn test_img_without_src_left_alone() {
        let html = render("<img alt=\"nothing\">");
        assert!(html.contains("<img alt=\"nothing\">"), "{html}");
    }

    #[test]
    fn test_footnote_ids_resolve_in_document() {
        let html = render("Read this[^note]\n\n[^note]: The fine print.");
        assert!(html.contains(r##"<a href="#fn-1">1</a>"##), "{html}");
        assert!(html.contains(r#"id="fnref-1""#), "{html}");
        assert!(html.contains(r#"<li id="fn-1">"#), "{html}");
        assert!(html.contains(r##"href="#fnref-1""##), "{html}");
        assert!(html.contains("The fine print"), "{html}");
    }

    #[test]
    fn test_footnotes_numbered_by_first_reference() {
        let html = render("b[^b] then a[^a]\n\n[^a]: note a\n\n[^b]: note b");
        let fn1 = html.find(r#"<li id="fn-1">"#).unwrap();
        let fn2 = html.find(r#"<li id="fn-2">"#).unwrap();
        let note_b = html.find("note b").unwrap();
        let note_a = html.find("note a").unwrap();
        assert!(fn1 < fn2);
        assert!(note_b > fn1 && note_b < fn2, "first list item is note b");
        assert!(note_a > fn2, "second list item is note a");
    }

    #[test]
    fn test_external_links_open_in_new_tab() {
        let html = render("[site](https://example.com)");
        assert!(html.contains(r#"target="_blank""#), "{html}");
        assert!(html.contains(r#"rel="noopener noreferrer""#), "{html}");
    }

    #[test]
    fn test_anchor_links_stay_same_page() {
        let html = render("[jump](#section)");
        assert!(html.contains(r##"href="#section""##), "{html}");
        assert!(!html.contains("target="), "{html}");
    }

    #[test]
    fn test_relative_links_keep_default_rendering() {
        let html = render("[about](/about)");
        assert!(html.contains(r#"href="/about""#), "{html}");
        assert!(!html.contains("target="), "{html}");
    }

    #[test]
    fn test_code_block_language_class() {
        let html = render("```rust\nfn main() {}\n```");
        assert!(html.contains(r#"<code class="language-rust">"#), "{html}");
    }

    #[test]
    fn test_table_and_blockquote_render() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |\n\n> quoted");
        assert!(html.contains("<table>"), "{html}");
        assert!(html.contains("<blockquote>"), "{html}");
    }

    #[test]
    fn test_unknown_raw_html_passes_through() {
        let html = render(r#"<div class="aside">kept</div>"#);
        assert!(html.contains(r#"<div class="aside">"#), "{html}");
    }

    #[test]
    fn test_malformed_html_does_not_panic() {
        for input in ["<img src=", "<img", "<><><img src=\"\">", "[]("] {
            let _ = render(input);
        }
    }

    #[test]
    fn test_attribute_values_escaped() {
        let html = render(r#"<img src="a&b.png" alt="q&a">"#);
        assert!(html.contains(r#"src="a&amp;b.png""#), "{html}");
        assert!(html.contains(r#"alt="q&amp;a""#), "{html}");
    }
}

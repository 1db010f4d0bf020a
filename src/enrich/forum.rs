// src/enrich/forum.rs
//! Forum posts: ask the GraphQL endpoint for the post excerpt instead of
//! scraping the page.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use super::fetch::PageFetcher;
use crate::text::clean_text;

const EXCERPT_QUERY: &str = r#"
query PostExcerpt($input: SinglePostInput!) {
    post(input: $input) {
        result {
            excerpt
            contents {
                plaintextDescription
            }
        }
    }
}
"#;

fn re_post_id() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"lesswrong\.com/posts/([A-Za-z0-9]+)").expect("post id regex"))
}

/// Post id from a `lesswrong.com/posts/<id>/<slug>` URL.
pub fn post_id(url: &str) -> Option<&str> {
    re_post_id()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub fn excerpt_request(post_id: &str) -> Value {
    json!({
        "query": EXCERPT_QUERY,
        "variables": { "input": { "selector": { "_id": post_id } } }
    })
}

/// Pull `excerpt`, then `contents.plaintextDescription`, from the response;
/// each must be at least `min_len` chars after cleaning.
pub fn excerpt_from_response(data: &Value, min_len: usize) -> Option<String> {
    let result = data.pointer("/data/post/result")?;
    let candidates = [
        result.get("excerpt").and_then(Value::as_str),
        result
            .pointer("/contents/plaintextDescription")
            .and_then(Value::as_str),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(clean_text)
        .find(|t| t.chars().count() >= min_len)
}

/// Query the excerpt for the post behind `url`. Any failure reads as "nothing found".
pub async fn fetch_excerpt(
    fetcher: &dyn PageFetcher,
    endpoint: &str,
    url: &str,
    min_len: usize,
) -> Option<String> {
    let id = post_id(url)?;
    match fetcher.post_json(endpoint, &excerpt_request(id), url).await {
        Ok(data) => excerpt_from_response(&data, min_len),
        Err(e) => {
            debug!(target: "enrich", %url, error = %e, "forum excerpt query failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_post_id() {
        assert_eq!(
            post_id("https://www.lesswrong.com/posts/AbC123xyz/some-slug"),
            Some("AbC123xyz")
        );
        assert_eq!(post_id("https://www.lesswrong.com/tag/ai"), None);
    }

    #[test]
    fn request_shape() {
        let req = excerpt_request("p1");
        assert_eq!(req["variables"]["input"]["selector"]["_id"], "p1");
        assert!(req["query"].as_str().unwrap().contains("plaintextDescription"));
    }

    #[test]
    fn prefers_excerpt_then_description() {
        let long = "An excerpt that is definitely longer than the fifty character minimum.";
        let data = json!({"data": {"post": {"result": {
            "excerpt": "<p>short</p>",
            "contents": {"plaintextDescription": long}
        }}}});
        assert_eq!(excerpt_from_response(&data, 50).as_deref(), Some(long));

        let data = json!({"data": {"post": {"result": {"excerpt": long, "contents": null}}}});
        assert_eq!(excerpt_from_response(&data, 50).as_deref(), Some(long));

        assert!(excerpt_from_response(&json!({"data": {"post": null}}), 50).is_none());
    }
}

// src/enrich/strategies.rs
//! HTML extraction strategies.
//!
//! Each strategy looks at an already-parsed page and either returns raw text
//! that met its length bar or `None`. [`run_chain`] tries [`GENERIC_CHAIN`] in
//! order and stops at the first hit. The archive-specific lookups live outside
//! the chain because they may need a second fetch.
//!
//! Parsing happens inside the sync functions here so no `Html` is ever held
//! across an await point.

use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::text::clean_text;

/// Length bars used by the strategies (chars, after cleaning).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    pub min_abstract_len: usize,
    pub min_paragraph_len: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            min_abstract_len: 50,
            min_paragraph_len: 80,
        }
    }
}

/// `(page, url, limits) -> Option<text>`
pub type Strategy = fn(&Html, &str, &ExtractLimits) -> Option<String>;

/// Generic strategies, most reliable first.
pub const GENERIC_CHAIN: &[(&str, Strategy)] = &[
    ("blog_platform", blog_platform),
    ("meta_description", meta_description_strategy),
    ("semantic_classes", semantic_classes),
    ("first_paragraph", first_paragraph_strategy),
];

const SEMANTIC_CLASSES: [&str; 7] = [
    "abstract",
    "summary",
    "description",
    "post-excerpt",
    "entry-summary",
    "article-summary",
    "paper-abstract",
];

const SEMANTIC_TAGS: [&str; 5] = ["div", "p", "section", "span", "blockquote"];

const PDF_EXTENSIONS: [&str; 2] = [".pdf", ".PDF"];

fn sel(cell: &'static OnceCell<Selector>, css: &'static str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("static selector"))
}

fn sel_meta_desc() -> [&'static Selector; 3] {
    static NAME: OnceCell<Selector> = OnceCell::new();
    static OG: OnceCell<Selector> = OnceCell::new();
    static TWITTER: OnceCell<Selector> = OnceCell::new();
    [
        sel(&NAME, "meta[name='description']"),
        sel(&OG, "meta[property='og:description']"),
        sel(&TWITTER, "meta[name='twitter:description']"),
    ]
}

fn sel_publisher() -> &'static Selector {
    static S: OnceCell<Selector> = OnceCell::new();
    sel(&S, "meta[property='article:publisher']")
}

fn sel_containers() -> [&'static Selector; 4] {
    static ARTICLE: OnceCell<Selector> = OnceCell::new();
    static MAIN: OnceCell<Selector> = OnceCell::new();
    static ROLE_MAIN: OnceCell<Selector> = OnceCell::new();
    static BODY: OnceCell<Selector> = OnceCell::new();
    [
        sel(&ARTICLE, "article"),
        sel(&MAIN, "main"),
        sel(&ROLE_MAIN, "[role='main']"),
        sel(&BODY, "body"),
    ]
}

fn sel_p() -> &'static Selector {
    static S: OnceCell<Selector> = OnceCell::new();
    sel(&S, "p")
}

fn sel_arxiv_blockquote() -> &'static Selector {
    static S: OnceCell<Selector> = OnceCell::new();
    sel(&S, "blockquote.abstract")
}

fn sel_arxiv_blocks() -> [&'static Selector; 3] {
    static DIV: OnceCell<Selector> = OnceCell::new();
    static P: OnceCell<Selector> = OnceCell::new();
    static SECTION: OnceCell<Selector> = OnceCell::new();
    [
        sel(&DIV, "div.abstract"),
        sel(&P, "p.abstract"),
        sel(&SECTION, "section.abstract"),
    ]
}

fn sel_semantic() -> &'static Vec<Selector> {
    static S: OnceCell<Vec<Selector>> = OnceCell::new();
    S.get_or_init(|| {
        SEMANTIC_CLASSES
            .iter()
            .flat_map(|class| {
                SEMANTIC_TAGS
                    .iter()
                    .map(move |tag| Selector::parse(&format!("{tag}.{class}")).expect("semantic selector"))
            })
            .collect()
    })
}

fn re_substack() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)substack").expect("substack regex"))
}

fn re_arxiv_variant() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"arxiv\.org/(?:pdf|html)/(\d+\.\d+(?:v\d+)?)").expect("arxiv variant regex"))
}

fn re_arxiv_abs() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"arxiv\.org/abs/(\d+\.\d+(?:v\d+)?)").expect("arxiv abs regex"))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

/// True when the URL path ends in a PDF extension.
pub fn is_pdf_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(u) => PDF_EXTENSIONS.iter().any(|ext| u.path().ends_with(ext)),
        Err(_) => PDF_EXTENSIONS
            .iter()
            .any(|ext| url.split(['?', '#']).next().unwrap_or(url).ends_with(ext)),
    }
}

pub fn is_arxiv_url(url: &str) -> bool {
    url.contains("arxiv.org")
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_default()
}

/// Alternate arXiv variant of the same paper: pdf/html → abs, abs → html.
pub fn arxiv_alt_url(url: &str) -> Option<String> {
    if let Some(c) = re_arxiv_variant().captures(url) {
        return Some(format!("https://arxiv.org/abs/{}", &c[1]));
    }
    re_arxiv_abs()
        .captures(url)
        .map(|c| format!("https://arxiv.org/html/{}", &c[1]))
}

/// Text of an arXiv abstract block minus its "Abstract:" descriptor span.
fn blockquote_text(block: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in block.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let in_descriptor = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| e.name() == "span" && e.classes().any(|c| c == "descriptor"))
        });
        if !in_descriptor {
            raw.push_str(text);
        }
    }
    clean_text(&raw)
}

fn arxiv_blockquote_in(doc: &Html, limits: &ExtractLimits) -> Option<String> {
    doc.select(sel_arxiv_blockquote())
        .next()
        .map(blockquote_text)
        .filter(|t| char_len(t) >= limits.min_abstract_len)
}

/// Abstract block on an arXiv abs/html page. Only the first element of each
/// kind is considered.
pub fn arxiv_abstract(body: &str, limits: &ExtractLimits) -> Option<String> {
    let doc = Html::parse_document(body);
    if let Some(t) = arxiv_blockquote_in(&doc, limits) {
        return Some(t);
    }
    for s in sel_arxiv_blocks() {
        if let Some(el) = doc.select(s).next() {
            let t = element_text(el);
            if char_len(&t) >= limits.min_abstract_len {
                return Some(t);
            }
        }
    }
    None
}

/// Lookup used on the alternate arXiv page: the blockquote only.
pub fn arxiv_blockquote(body: &str, limits: &ExtractLimits) -> Option<String> {
    let doc = Html::parse_document(body);
    arxiv_blockquote_in(&doc, limits)
}

/// First description meta tag (`description`, `og:description`,
/// `twitter:description`) whose cleaned content is long enough.
pub fn meta_description(doc: &Html, limits: &ExtractLimits) -> Option<String> {
    for s in sel_meta_desc() {
        let content = doc
            .select(s)
            .next()
            .and_then(|m| m.value().attr("content"))
            .filter(|c| !c.is_empty());
        if let Some(content) = content {
            let cleaned = clean_text(content);
            if char_len(&cleaned) >= limits.min_abstract_len {
                return Some(cleaned);
            }
        }
    }
    None
}

/// First paragraph of at least `min_paragraph_len` chars, searching article,
/// main and role=main containers before the whole body.
pub fn first_paragraph(doc: &Html, limits: &ExtractLimits) -> Option<String> {
    for container_sel in sel_containers() {
        for container in doc.select(container_sel) {
            for p in container.select(sel_p()) {
                let t = element_text(p);
                if char_len(&t) >= limits.min_paragraph_len {
                    return Some(t);
                }
            }
        }
    }
    None
}

fn is_blog_platform(doc: &Html, url: &str) -> bool {
    if host_of(url).contains("substack.com") {
        return true;
    }
    doc.select(sel_publisher()).any(|m| {
        m.value()
            .attr("content")
            .is_some_and(|c| re_substack().is_match(c))
    })
}

/// Hosted newsletter platform: meta description, then first paragraph.
pub fn blog_platform(doc: &Html, url: &str, limits: &ExtractLimits) -> Option<String> {
    if !is_blog_platform(doc, url) {
        return None;
    }
    meta_description(doc, limits).or_else(|| first_paragraph(doc, limits))
}

fn meta_description_strategy(doc: &Html, _url: &str, limits: &ExtractLimits) -> Option<String> {
    meta_description(doc, limits)
}

/// Elements carrying an abstract/summary-like class name.
pub fn semantic_classes(doc: &Html, _url: &str, limits: &ExtractLimits) -> Option<String> {
    for s in sel_semantic() {
        if let Some(el) = doc.select(s).next() {
            let t = element_text(el);
            if char_len(&t) >= limits.min_abstract_len {
                return Some(t);
            }
        }
    }
    None
}

fn first_paragraph_strategy(doc: &Html, _url: &str, limits: &ExtractLimits) -> Option<String> {
    first_paragraph(doc, limits)
}

/// Parse `body` once and run [`GENERIC_CHAIN`]; returns the strategy name and text.
pub fn run_chain(body: &str, url: &str, limits: &ExtractLimits) -> Option<(&'static str, String)> {
    let doc = Html::parse_document(body);
    GENERIC_CHAIN
        .iter()
        .find_map(|(name, strategy)| strategy(&doc, url, limits).map(|t| (*name, t)))
}

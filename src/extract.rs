//! Readable-content extraction from article HTML.
//!
//! A compact take on the Readability heuristic:
//!
//! 1. Boilerplate elements are ignored outright: scripts, navigation,
//!    headers/footers, forms, and anything whose class or id looks like a
//!    sidebar, comment thread, share bar or ad slot.
//! 2. Each paragraph-like element with enough text scores its parent fully
//!    and its grandparent by half.  Containers start from a score based on
//!    their tag and class/id, and the total is scaled down by link density.
//! 3. The best container wins, together with any siblings that score close
//!    enough or are long, link-free paragraphs.
//! 4. The winning subtree is re-serialised keeping only allow-listed tags
//!    and attributes.  Other elements are unwrapped, so their text survives.

use std::collections::{HashMap, HashSet};

use html_escape::{encode_double_quoted_attribute, encode_text};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::config::ExtractorConfig;
use crate::error::ExtractionError;

/// Article bodies above this size are rejected before parsing.
pub const MAX_HTML_SIZE: usize = 10 * 1024 * 1024;

/// Paragraphs shorter than this do not contribute to container scores.
const MIN_PARAGRAPH_LEN: usize = 25;

/// Elements that never hold article content; dropped with their subtree.
const DROP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "object", "embed", "svg", "canvas",
    "head", "meta", "link", "nav", "header", "footer", "aside", "form", "button", "input",
    "select", "textarea",
];

/// Void elements: written without children or a closing tag.
const VOID_TAGS: &[&str] = &["img", "br", "hr", "wbr", "source", "area", "col"];

static PARAGRAPHS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, pre, td").expect("static selector"));
static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("static selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector"));

static UNLIKELY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|foot|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote",
    )
    .expect("static regex")
});
static MAYBE_CANDIDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)and|article|body|column|main|shadow").expect("static regex"));
static POSITIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story")
        .expect("static regex")
});
static NEGATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)combx|comment|com-|contact|foot|footer|footnote|masthead|media|meta|outbrain|promo|related|scroll|shoutbox|sidebar|sponsor|shopping|tags|tool|widget|share|advert",
    )
    .expect("static regex")
});

/// The readable part of an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    /// Cleaned HTML fragment.
    pub content: String,
    /// `src` of every retained `<img>`, in document order.
    pub images: Vec<String>,
}

/// Configured extractor.  Cheap to share across items.
#[derive(Debug, Clone)]
pub struct Extractor {
    tags: HashSet<String>,
    attributes: HashSet<String>,
    remove_empty_nodes: bool,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(&ExtractorConfig::default())
    }
}

impl Extractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            tags: config.tags.iter().map(|t| t.to_ascii_lowercase()).collect(),
            attributes: config
                .attributes
                .iter()
                .map(|a| a.to_ascii_lowercase())
                .collect(),
            remove_empty_nodes: config.remove_empty_nodes,
        }
    }

    pub fn extract(&self, html: &str) -> Result<ExtractedArticle, ExtractionError> {
        if html.trim().is_empty() {
            return Err(ExtractionError::Empty);
        }
        if html.len() > MAX_HTML_SIZE {
            return Err(ExtractionError::TooLarge {
                size: html.len(),
                max: MAX_HTML_SIZE,
            });
        }

        let doc = Html::parse_document(html);
        let roots = select_content(&doc);

        let mut out = Output::default();
        for root in roots {
            self.write_element(root, &mut out);
        }

        if !out.has_text && out.images.is_empty() {
            return Err(ExtractionError::NoContent);
        }

        Ok(ExtractedArticle {
            content: out.html,
            images: out.images,
        })
    }

    /// Serialise `el` and its subtree into `out`.  Returns whether anything
    /// meaningful (non-blank text or an image) was written.
    fn write_element(&self, el: ElementRef<'_>, out: &mut Output) -> bool {
        let tag = el.value().name();
        let keep = self.tags.contains(tag);

        if tag == "img" {
            if !keep {
                return false;
            }
            out.html.push_str("<img");
            self.write_attributes(el, out);
            out.html.push('>');
            if let Some(src) = el.value().attr("src") {
                if !src.trim().is_empty() {
                    out.images.push(src.to_string());
                }
            }
            return true;
        }
        if VOID_TAGS.contains(&tag) {
            if keep {
                out.html.push('<');
                out.html.push_str(tag);
                self.write_attributes(el, out);
                out.html.push('>');
            }
            return false;
        }

        if !keep {
            return self.write_children(el, out);
        }

        // Render into a scratch buffer first so an empty element can be
        // dropped without touching what was already written.
        let mut inner = Output::default();
        let meaningful = self.write_children(el, &mut inner);
        if self.remove_empty_nodes && !meaningful {
            return false;
        }

        out.html.push('<');
        out.html.push_str(tag);
        self.write_attributes(el, out);
        out.html.push('>');
        out.html.push_str(&inner.html);
        out.html.push_str("</");
        out.html.push_str(tag);
        out.html.push('>');
        out.images.extend(inner.images);
        out.has_text |= inner.has_text;
        meaningful
    }

    fn write_children(&self, el: ElementRef<'_>, out: &mut Output) -> bool {
        let mut meaningful = false;
        for child in el.children() {
            match child.value() {
                Node::Text(text) => {
                    let text: &str = text;
                    out.html.push_str(&encode_text(text));
                    if !text.trim().is_empty() {
                        out.has_text = true;
                        meaningful = true;
                    }
                }
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        if !is_discarded(child) {
                            meaningful |= self.write_element(child, out);
                        }
                    }
                }
                _ => {}
            }
        }
        meaningful
    }

    fn write_attributes(&self, el: ElementRef<'_>, out: &mut Output) {
        for (name, value) in el.value().attrs() {
            if self.attributes.contains(name) {
                out.html.push(' ');
                out.html.push_str(name);
                out.html.push_str("=\"");
                out.html.push_str(&encode_double_quoted_attribute(value));
                out.html.push('"');
            }
        }
    }
}

#[derive(Default)]
struct Output {
    html: String,
    images: Vec<String>,
    has_text: bool,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Pick the elements that make up the article, in document order.
fn select_content(doc: &Html) -> Vec<ElementRef<'_>> {
    // Candidates in the order they were first scored, so ties resolve to
    // the earliest container in the document.
    let mut candidates: Vec<(ElementRef<'_>, f64)> = Vec::new();
    let mut index = HashMap::new();

    for para in doc.select(&PARAGRAPHS) {
        if is_discarded(para) || ancestors(para).any(is_discarded) {
            continue;
        }
        let text = inner_text(para);
        let len = text.chars().count();
        if len < MIN_PARAGRAPH_LEN {
            continue;
        }
        let score = 1.0 + text.matches(',').count() as f64 + (len as f64 / 100.0).min(3.0);

        for (depth, ancestor) in ancestors(para).take(2).enumerate() {
            let slot = *index.entry(ancestor.id()).or_insert_with(|| {
                candidates.push((ancestor, initial_score(ancestor)));
                candidates.len() - 1
            });
            candidates[slot].1 += if depth == 0 { score } else { score / 2.0 };
        }
    }

    for (el, score) in candidates.iter_mut() {
        *score *= 1.0 - link_density(*el);
    }

    let best = candidates
        .iter()
        .copied()
        .fold(None::<(ElementRef<'_>, f64)>, |best, cand| match best {
            Some(b) if b.1 >= cand.1 => Some(b),
            _ => Some(cand),
        });

    let Some((top, top_score)) = best else {
        return doc
            .select(&BODY)
            .next()
            .map(|body| vec![body])
            .unwrap_or_else(|| vec![doc.root_element()]);
    };

    let Some(parent) = top.parent().and_then(ElementRef::wrap) else {
        return vec![top];
    };

    let threshold = (top_score * 0.2).max(10.0);
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| {
            if sibling.id() == top.id() {
                return true;
            }
            if is_discarded(*sibling) {
                return false;
            }
            let scored = index
                .get(&sibling.id())
                .map(|&i| candidates[i].1)
                .unwrap_or(0.0);
            scored >= threshold || is_standalone_paragraph(*sibling)
        })
        .collect()
}

fn ancestors(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    el.ancestors().filter_map(ElementRef::wrap)
}

/// A long, link-free paragraph sitting next to the main container.
fn is_standalone_paragraph(el: ElementRef<'_>) -> bool {
    el.value().name() == "p" && inner_text(el).chars().count() > 80 && link_density(el) < 0.25
}

fn is_discarded(el: ElementRef<'_>) -> bool {
    let tag = el.value().name();
    if DROP_TAGS.contains(&tag) {
        return true;
    }
    if matches!(tag, "html" | "body" | "a") {
        return false;
    }
    let ident = class_and_id(el);
    !ident.is_empty() && UNLIKELY.is_match(&ident) && !MAYBE_CANDIDATE.is_match(&ident)
}

fn initial_score(el: ElementRef<'_>) -> f64 {
    let base = match el.value().name() {
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };
    base + class_weight(el)
}

fn class_weight(el: ElementRef<'_>) -> f64 {
    let mut weight = 0.0;
    for ident in [el.value().attr("class"), el.value().id()].into_iter().flatten() {
        if NEGATIVE.is_match(ident) {
            weight -= 25.0;
        }
        if POSITIVE.is_match(ident) {
            weight += 25.0;
        }
    }
    weight
}

fn class_and_id(el: ElementRef<'_>) -> String {
    let class = el.value().attr("class").unwrap_or_default();
    let id = el.value().id().unwrap_or_default();
    format!("{class} {id}").trim().to_string()
}

fn link_density(el: ElementRef<'_>) -> f64 {
    let total = inner_text(el).chars().count();
    if total == 0 {
        return 0.0;
    }
    let linked: usize = el
        .select(&LINKS)
        .map(|a| inner_text(a).chars().count())
        .sum();
    linked as f64 / total as f64
}

/// Descendant text with whitespace runs collapsed.
fn inner_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_A: &str = "The committee met on Tuesday, and after a long debate, agreed to fund the new library.";
    const LONG_B: &str = "Construction is expected to start next spring, with completion planned for late next year.";

    fn extract(html: &str) -> ExtractedArticle {
        Extractor::default().extract(html).unwrap()
    }

    #[test]
    fn keeps_only_allowed_tags_and_attributes() {
        let html = format!(
            r#"<html><body><article>
                <h1>Headline</h1>
                <p class="lead" style="color:red">{LONG_A}</p>
                <p><span>inline</span> <a href="https://example.com/x" onclick="bad()">link</a></p>
                <img src="a.png" alt="A" width="10">
            </article></body></html>"#
        );
        let article = extract(&html);

        assert!(article.content.contains(&format!("<p>{LONG_A}</p>")));
        assert!(article.content.contains(r#"<a href="https://example.com/x">link</a>"#));
        assert!(article.content.contains(r#"<img src="a.png">"#));
        assert!(article.content.contains("Headline"), "unwrapped text survives");
        assert!(article.content.contains("inline"));
        for stripped in ["<h1", "<span", "<article", "class=", "style=", "onclick", "alt="] {
            assert!(!article.content.contains(stripped), "{stripped} should be stripped");
        }
    }

    #[test]
    fn drops_boilerplate() {
        let html = format!(
            r#"<html><body>
                <nav><a href="/home">Home navigation</a></nav>
                <div class="content"><p>{LONG_A}</p><script>evil()</script><p>{LONG_B}</p></div>
                <div class="sidebar"><p>Sidebar text, with commas, that is long enough to score.</p></div>
                <footer><p>Copyright footer text that is definitely long enough.</p></footer>
            </body></html>"#
        );
        let article = extract(&html);

        assert!(article.content.contains(LONG_A));
        assert!(article.content.contains(LONG_B));
        for gone in ["Home navigation", "evil()", "Sidebar text", "Copyright"] {
            assert!(!article.content.contains(gone), "{gone} should be dropped");
        }
    }

    #[test]
    fn picks_highest_scoring_container() {
        let html = format!(
            r#"<html><body>
                <div id="promo"><p>Buy our product today, limited offer, act now, while stocks last.</p></div>
                <div id="story"><p>{LONG_A}</p><p>{LONG_B}</p><p>{LONG_A}</p></div>
            </body></html>"#
        );
        let article = extract(&html);

        assert!(article.content.starts_with("<div>"));
        assert!(article.content.contains(LONG_B));
        assert!(!article.content.contains("Buy our product"));
    }

    #[test]
    fn includes_long_sibling_paragraphs() {
        let sibling = "A closing paragraph that lives outside the main container but is long enough to be part of the story.";
        let html = format!(
            r#"<html><body>
                <div><p>{LONG_A}</p><p>{LONG_B}</p></div>
                <p>{sibling}</p>
                <div><a href="/more">More links</a></div>
            </body></html>"#
        );
        let article = extract(&html);

        assert!(article.content.contains(LONG_A));
        assert!(article.content.contains(sibling));
        assert!(!article.content.contains("More links"));
    }

    #[test]
    fn images_in_document_order_and_from_input() {
        let html = format!(
            r#"<html><body><div>
                <p>{LONG_A}</p>
                <img src="https://cdn.example.com/1.png">
                <p>{LONG_B} <img src="/2.jpg"></p>
                <a href="/full"><img src="3.gif"></a>
                <img alt="no source">
            </div>
            <aside><img src="ad.png"></aside>
            </body></html>"#
        );
        let article = extract(&html);

        assert_eq!(
            article.images,
            vec!["https://cdn.example.com/1.png", "/2.jpg", "3.gif"]
        );
        for img in &article.images {
            assert!(html.contains(&format!("src=\"{img}\"")));
        }
    }

    #[test]
    fn image_sources_are_reported_verbatim() {
        let html = format!(
            r#"<html><body><div><p>{LONG_A}</p><img src=" padded.png "><img src="  "></div></body></html>"#
        );
        let article = extract(&html);
        assert_eq!(article.images, vec![" padded.png "]);
    }

    #[test]
    fn keeps_empty_nodes_by_default() {
        let html = format!("<html><body><div><p>{LONG_A}</p><p></p><div> </div></div></body></html>");
        let article = extract(&html);
        assert!(article.content.contains("<p></p>"));
        assert!(article.content.contains("<div> </div>"));
    }

    #[test]
    fn removes_empty_nodes_when_configured() {
        let extractor = Extractor::new(&ExtractorConfig {
            remove_empty_nodes: true,
            ..ExtractorConfig::default()
        });
        let html = format!(
            r#"<html><body><div><p>{LONG_A}</p><p></p><div> </div><p><img src="kept.png"></p></div></body></html>"#
        );
        let article = extractor.extract(&html).unwrap();

        assert!(!article.content.contains("<p></p>"));
        assert!(!article.content.contains("<div> </div>"));
        assert!(article.content.contains(r#"<p><img src="kept.png"></p>"#));
        assert_eq!(article.images, vec!["kept.png"]);
    }

    #[test]
    fn custom_allow_list() {
        let extractor = Extractor::new(&ExtractorConfig {
            tags: vec!["p".into()],
            attributes: vec![],
            remove_empty_nodes: false,
        });
        let html = format!(
            r#"<html><body><div><p>{LONG_A}</p><img src="x.png"><p><a href="/y">y</a></p></div></body></html>"#
        );
        let article = extractor.extract(&html).unwrap();

        assert!(!article.content.contains("<div"));
        assert!(!article.content.contains("<img"));
        assert!(!article.content.contains("href"));
        assert!(article.content.contains("<p>y</p>"));
        assert!(article.images.is_empty());
    }

    #[test]
    fn escapes_text_and_attributes() {
        let html = format!(
            r#"<html><body><div><p>{LONG_A} 1 &lt; 2 &amp; 3</p><a href="/q?a=1&amp;b=&quot;2&quot;">q</a></div></body></html>"#
        );
        let article = extract(&html);
        assert!(article.content.contains("1 &lt; 2 &amp; 3"));
        assert!(article.content.contains(r#"href="/q?a=1&amp;b=&quot;2&quot;""#));
    }

    #[test]
    fn falls_back_to_body_without_candidates() {
        let article = extract("<html><body><div>Short note</div></body></html>");
        assert_eq!(article.content.trim(), "<div>Short note</div>");
    }

    #[test]
    fn blank_input_is_an_error() {
        assert_eq!(
            Extractor::default().extract("  \n "),
            Err(ExtractionError::Empty)
        );
    }

    #[test]
    fn oversized_input_is_an_error() {
        let html = "a".repeat(MAX_HTML_SIZE + 1);
        assert!(matches!(
            Extractor::default().extract(&html),
            Err(ExtractionError::TooLarge { .. })
        ));
    }

    #[test]
    fn document_without_content_is_an_error() {
        assert_eq!(
            Extractor::default().extract("<html><head><title>t</title></head><body><script>x()</script></body></html>"),
            Err(ExtractionError::NoContent)
        );
    }
}

use scraper::{Html, Selector};

const MEDIA_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".mp4"];
const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

/// Content extracted from one post body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedContent {
    pub text: String,
    pub links: Vec<String>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
}

/// Best-effort extraction of plain text, page links, image URLs and video
/// URLs from a post body. Malformed HTML degrades to whatever the tree
/// builder recovers; this never fails.
///
/// Media classification is case-insensitive substring containment, not a
/// suffix check. A URL carrying `.jpg` in a query parameter counts as an
/// image; tightening this would change the delivered payload shape for
/// existing subscribers.
pub fn parse_html(html: &str) -> ParsedContent {
    let document = Html::parse_document(html);

    let mut parts: Vec<&str> = Vec::new();
    for node in document.tree.nodes() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| matches!(el.name(), "script" | "style"))
        });
        if skipped {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    let text = parts.join(" ");

    let anchors = Selector::parse("a[href]").expect("anchor selector");
    let mut links = Vec::new();
    for element in document.select(&anchors) {
        if let Some(href) = element.value().attr("href") {
            let lower = href.to_ascii_lowercase();
            if !MEDIA_EXTENSIONS.iter().any(|ext| lower.contains(ext)) {
                links.push(href.to_string());
            }
        }
    }

    let imgs = Selector::parse("img[src]").expect("img selector");
    let mut images = Vec::new();
    for element in document.select(&imgs) {
        if let Some(src) = element.value().attr("src") {
            let lower = src.to_ascii_lowercase();
            if IMAGE_EXTENSIONS.iter().any(|ext| lower.contains(ext)) {
                images.push(src.to_string());
            }
        }
    }

    let video_sources = Selector::parse("video[src]").expect("video selector");
    let mut videos = Vec::new();
    for element in document.select(&video_sources) {
        if let Some(src) = element.value().attr("src") {
            if src.to_ascii_lowercase().contains(".mp4") {
                videos.push(src.to_string());
            }
        }
    }

    ParsedContent {
        text,
        links,
        images,
        videos,
    }
}

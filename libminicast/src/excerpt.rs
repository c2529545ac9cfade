//! Text and markup helpers for building publish payloads

use scraper::{Html, Selector};

/// First `n` whitespace-separated words of `text`, no trailing ellipsis.
pub fn trim_words(text: &str, n: usize) -> String {
    text.split_whitespace()
        .take(n)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `src` attribute of the first `<img>` element in the markup.
///
/// Absence of any image, or an image without a `src`, yields `None`;
/// malformed markup is never an error. This is the only place the crate
/// touches an HTML parser.
pub fn first_image_src(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let selector = Selector::parse("img").ok()?;
    fragment
        .select(&selector)
        .next()?
        .value()
        .attr("src")
        .map(|src| src.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_words_short_text_unchanged() {
        assert_eq!(trim_words("one two three", 150), "one two three");
    }

    #[test]
    fn test_trim_words_truncates_and_normalizes_whitespace() {
        assert_eq!(trim_words("a  b\n c\td e", 3), "a b c");
    }

    #[test]
    fn test_trim_words_empty() {
        assert_eq!(trim_words("", 150), "");
        assert_eq!(trim_words("   \n\t ", 150), "");
    }

    #[test]
    fn test_first_image_src_found() {
        let html = r#"<p>Intro</p><img src="https://x/y.png" alt="y"><img src="https://x/z.png">"#;
        assert_eq!(
            first_image_src(html).as_deref(),
            Some("https://x/y.png")
        );
    }

    #[test]
    fn test_first_image_src_no_images() {
        assert_eq!(first_image_src("<p>Just text</p>"), None);
    }

    #[test]
    fn test_first_image_src_missing_src_attribute() {
        assert_eq!(first_image_src(r#"<img alt="no source">"#), None);
    }

    #[test]
    fn test_first_image_src_malformed_markup_is_not_an_error() {
        assert_eq!(
            first_image_src(r#"<div><img src="https://x/a.jpg"<p>broken"#).as_deref(),
            Some("https://x/a.jpg")
        );
    }
}

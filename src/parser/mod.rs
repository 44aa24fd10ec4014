pub mod fields;
pub mod title;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::record::BookRecord;
use crate::site::COVER_FRAGMENT;
use fields::{FieldExtractor, LabelExtractor};
use title::TitleResolver;

static COVER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(&format!("img[src*=\"{COVER_FRAGMENT}\"]")).unwrap());

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("invalid page url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("page has no text content")]
    Empty,
}

/// Detail page HTML → BookRecord: labeled fields, title chain, cover image.
pub struct RecordBuilder<E = LabelExtractor> {
    extractor: E,
    titles: TitleResolver,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::with_extractor(LabelExtractor)
    }
}

impl<E: FieldExtractor> RecordBuilder<E> {
    pub fn with_extractor(extractor: E) -> Self {
        Self {
            extractor,
            titles: TitleResolver::default(),
        }
    }

    pub fn build(&self, url: &str, html: &str) -> Result<BookRecord, PageError> {
        let page_url = Url::parse(url)?;
        let doc = Html::parse_document(html);
        let text = flatten(&doc);
        if text.trim().is_empty() {
            return Err(PageError::Empty);
        }

        let fields = self.extractor.extract(&text);
        let title = self.titles.resolve(&text, Some(&doc));
        let cover = cover_image(&doc, &page_url);

        Ok(BookRecord::from_fields(url, title, cover, fields))
    }
}

/// All document text in order, like a browser's text dump minus scripts/styles.
pub fn flatten(doc: &Html) -> String {
    flatten_element(doc.root_element())
}

pub fn flatten_element(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let in_script = node
            .parent()
            .and_then(|p| p.value().as_element())
            .is_some_and(|e| matches!(e.name(), "script" | "style"));
        if !in_script {
            out.push_str(text);
        }
    }
    out
}

/// First cover upload on the page, as an absolute URL.
pub fn cover_image(doc: &Html, page_url: &Url) -> Option<String> {
    doc.select(&COVER_SEL)
        .filter_map(|img| img.value().attr("src"))
        .find_map(|src| page_url.join(src).ok())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    const URL: &str = "https://elib.duytan.edu.vn/Sach/Detail/92799";

    #[test]
    fn flatten_skips_scripts() {
        let doc = Html::parse_document(
            "<html><head><script>var jpg = 1;</script><style>p{}</style></head><body><p>A</p>\n<p>B</p></body></html>",
        );
        assert_eq!(flatten(&doc), "A\nB");
    }

    #[test]
    fn builds_full_record() {
        let r = RecordBuilder::default().build(URL, &fixture("detail_boundary")).unwrap();
        assert_eq!(r.url, URL);
        assert!(r.display_title().starts_with("Elon Musk"));
        assert_eq!(r.author.as_deref(), Some("Ashlee Vance"));
        assert_eq!(r.publisher.as_deref(), Some("NXB Trẻ"));
        assert_eq!(r.publication_year, Some(2016));
        assert_eq!(r.isbn.as_deref(), Some("9786041089345"));
        assert_eq!(r.language.as_deref(), Some("Tiếng Việt"));
        assert_eq!(r.availability.as_deref(), Some("2/3"));
        assert_eq!(
            r.cover_image.as_deref(),
            Some("https://elib.duytan.edu.vn/upload/sach_anh/92799.jpg")
        );
        let summary = r.summary.unwrap();
        assert!(summary.starts_with("Cuốn sách kể về"));
        assert!(!summary.contains("đăng nhập"));
        assert!(!summary.contains('\n'));
    }

    #[test]
    fn missing_labels_stay_absent() {
        let r = RecordBuilder::default().build(URL, &fixture("detail_elements")).unwrap();
        assert_eq!(r.publication_year, None);
        assert!(r.price.is_none());
        assert!(r.cover_image.is_none());
        assert_eq!(r.title.as_deref(), Some("Cấu trúc dữ liệu và giải thuật"));
    }

    #[test]
    fn relative_cover_resolves_against_page() {
        let doc = Html::parse_document(r#"<img src="../../upload/sach_anh/1.jpg"><img src="/logo.png">"#);
        let page = Url::parse("https://elib.duytan.edu.vn/Sach/Detail/1").unwrap();
        assert_eq!(
            cover_image(&doc, &page).as_deref(),
            Some("https://elib.duytan.edu.vn/upload/sach_anh/1.jpg")
        );
    }

    #[test]
    fn empty_page_is_an_error() {
        let err = RecordBuilder::default().build(URL, "<html><body>  </body></html>").unwrap_err();
        assert!(matches!(err, PageError::Empty));
    }

    #[test]
    fn bad_url_is_an_error() {
        let err = RecordBuilder::default().build("not a url", "<p>x</p>").unwrap_err();
        assert!(matches!(err, PageError::InvalidUrl(_)));
    }

    #[test]
    fn custom_extractor_is_used() {
        struct Nothing;
        impl FieldExtractor for Nothing {
            fn extract(&self, _text: &str) -> crate::record::Fields {
                crate::record::Fields::new()
            }
        }
        let r = RecordBuilder::with_extractor(Nothing)
            .build(URL, &fixture("detail_boundary"))
            .unwrap();
        assert!(r.author.is_none());
        assert!(r.title.is_some());
    }
}

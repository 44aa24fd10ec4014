use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::fields::starts_with_label;
use super::flatten_element;
use crate::site::{CONTENT_CONTAINER, COVER_EXT, COVER_FRAGMENT};

static CONTAINER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(CONTENT_CONTAINER).unwrap());
static BLOCK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p, div, span").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// The boundary tier ends at the author label.
const AUTHOR_ANCHORS: &[&str] = &["Tác giả:", "Author:"];
/// Inside the content column the title sits above whichever of these comes first.
const CONTAINER_ANCHORS: &[&str] = &[
    "Tác giả:",
    "Nhà xuất bản:",
    "Năm xuất bản:",
    "Author:",
    "Publisher:",
    "Year of publication:",
];

/// Breadcrumb / pager text that can sit where a title is expected.
const NAV_PREFIXES: &[&str] = &[
    "Trở về",
    "Back to list",
    "Hiển thị",
    "Showing",
    "CSDL",
    "Library database",
    "Trang chủ",
    "Home",
];
const NAV_MARKERS: &[&str] = &["Home", "Back", "Trang chủ", "Trở về"];

/// A title strategy: flattened page text plus the parsed document, if any.
pub type Strategy = fn(&str, Option<&Html>) -> Option<String>;

/// Ordered title heuristics; the first accepted candidate wins.
pub struct TitleResolver {
    strategies: Vec<(&'static str, Strategy)>,
}

impl Default for TitleResolver {
    fn default() -> Self {
        Self::new(vec![
            ("boundary", boundary as Strategy),
            ("scoped_container", scoped_container as Strategy),
            ("element_scan", element_scan as Strategy),
        ])
    }
}

impl TitleResolver {
    pub fn new(strategies: Vec<(&'static str, Strategy)>) -> Self {
        Self { strategies }
    }

    pub fn resolve(&self, text: &str, doc: Option<&Html>) -> Option<String> {
        for (name, strategy) in &self.strategies {
            if let Some(title) = strategy(text, doc) {
                debug!(strategy = *name, %title, "title resolved");
                return Some(title);
            }
        }
        debug!("no title candidate accepted");
        None
    }
}

/// Tier 1: the first line between the cover file name and the author label.
pub fn boundary(text: &str, _doc: Option<&Html>) -> Option<String> {
    let span = span_after_cover(text, AUTHOR_ANCHORS)?;
    accept(first_line(span)?, |n| n > 3)
}

/// Tier 2: tier 1 restricted to the content column.
pub fn scoped_container(_text: &str, doc: Option<&Html>) -> Option<String> {
    let container = doc?.select(&CONTAINER_SEL).next()?;
    let text = flatten_element(container);
    let span = span_after_cover(&text, CONTAINER_ANCHORS)?;
    let line = WS_RE.replace_all(first_line(span)?, " ");
    accept(&line, |n| n > 10 && n < 200)
}

/// Tier 3: first short block element in the content column that is not
/// metadata, navigation, or the cover path.
pub fn element_scan(_text: &str, doc: Option<&Html>) -> Option<String> {
    let container = doc?.select(&CONTAINER_SEL).next()?;
    container
        .select(&BLOCK_SEL)
        .filter(|el| el.id() != container.id())
        .find_map(scan_candidate)
}

fn scan_candidate(el: ElementRef<'_>) -> Option<String> {
    let text = flatten_element(el);
    let text = text.trim();
    if text.contains(COVER_FRAGMENT) {
        return None;
    }
    accept(text, |n| n > 10 && n < 200)
}

/// Text after the last cover extension that precedes the earliest anchor.
fn span_after_cover<'a>(text: &'a str, anchors: &[&str]) -> Option<&'a str> {
    let anchor = anchors.iter().filter_map(|a| text.find(a)).min()?;
    let head = &text[..anchor];
    let start = head.rfind(COVER_EXT)? + COVER_EXT.len();
    Some(&head[start..])
}

fn first_line(span: &str) -> Option<&str> {
    span.lines().map(str::trim).find(|l| !l.is_empty())
}

fn accept(candidate: &str, len_ok: impl Fn(usize) -> bool) -> Option<String> {
    let candidate = candidate.trim();
    let len = candidate.chars().count();
    let rejected = !len_ok(len)
        || starts_with_label(candidate)
        || NAV_PREFIXES.iter().any(|p| candidate.starts_with(p))
        || NAV_MARKERS.iter().any(|m| candidate.contains(m));
    if rejected {
        None
    } else {
        Some(candidate.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> Html {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
        Html::parse_document(&html)
    }

    fn resolve_fixture(name: &str) -> Option<String> {
        let doc = fixture(name);
        let text = super::super::flatten(&doc);
        TitleResolver::default().resolve(&text, Some(&doc))
    }

    #[test]
    fn boundary_picks_line_under_cover() {
        let text = "...jpg\nThe Great Gatsby\nTác giả: F. Scott Fitzgerald\n";
        assert_eq!(boundary(text, None).as_deref(), Some("The Great Gatsby"));
        assert_eq!(
            TitleResolver::default().resolve(text, None).as_deref(),
            Some("The Great Gatsby")
        );
    }

    #[test]
    fn boundary_skips_blank_lines() {
        let text = "cover.jpg\n\n   \n   Dế Mèn phiêu lưu ký  \n\n Tác giả: Tô Hoài";
        assert_eq!(boundary(text, None).as_deref(), Some("Dế Mèn phiêu lưu ký"));
    }

    #[test]
    fn boundary_uses_cover_closest_to_author() {
        let text = "logo.jpg\nTrang chủ\nbanner.jpg\nLập trình Rust\nTác giả: X";
        assert_eq!(boundary(text, None).as_deref(), Some("Lập trình Rust"));
    }

    #[test]
    fn boundary_rejects_short_and_navigation() {
        assert_eq!(boundary("a.jpg\nabc\nTác giả: X", None), None);
        assert_eq!(boundary("a.jpg\nBack to list\nTác giả: X", None), None);
        assert_eq!(boundary("a.jpg\nTrang chủ > Sách\nTác giả: X", None), None);
        assert_eq!(boundary("a.jpg\nNhà xuất bản: Kim Đồng\nTác giả: X", None), None);
    }

    #[test]
    fn boundary_needs_both_markers() {
        assert_eq!(boundary("The Great Gatsby\nTác giả: X", None), None);
        assert_eq!(boundary("a.jpg\nThe Great Gatsby\n", None), None);
    }

    #[test]
    fn detail_page_resolves_through_boundary() {
        let title = resolve_fixture("detail_boundary").unwrap();
        assert!(title.starts_with("Elon Musk"), "got {title}");
    }

    #[test]
    fn sidebar_author_filter_falls_back_to_container() {
        let doc = fixture("detail_container");
        let text = super::super::flatten(&doc);
        assert_eq!(boundary(&text, Some(&doc)), None);
        assert_eq!(
            scoped_container(&text, Some(&doc)).as_deref(),
            Some("Giáo trình Kinh tế vi mô")
        );
        assert_eq!(resolve_fixture("detail_container").as_deref(), Some("Giáo trình Kinh tế vi mô"));
    }

    #[test]
    fn element_scan_finds_title_without_cover_text() {
        let doc = fixture("detail_elements");
        let text = super::super::flatten(&doc);
        assert_eq!(boundary(&text, Some(&doc)), None);
        assert_eq!(scoped_container(&text, Some(&doc)), None);
        assert_eq!(
            resolve_fixture("detail_elements").as_deref(),
            Some("Cấu trúc dữ liệu và giải thuật")
        );
    }

    #[test]
    fn element_scan_skips_cover_path_and_listing_chrome() {
        let decoys = [
            "<span>upload/sach_anh/77120.jpg</span>",
            "<p>Showing 1 to 20 of 5000 books</p>",
            "<p>Library database of Duy Tan University</p>",
            "<p>Hiển thị 20 kết quả mỗi trang</p>",
        ];
        let doc_with = |body: &str| {
            Html::parse_document(&format!(
                "<html><body><div class=\"col-md-8\">{}</div></body></html>",
                body
            ))
        };

        for decoy in decoys {
            assert_eq!(element_scan("", Some(&doc_with(decoy))), None, "{decoy}");
        }

        let all = format!("{}<p>Nhập môn khoa học dữ liệu</p>", decoys.concat());
        assert_eq!(
            element_scan("", Some(&doc_with(&all))).as_deref(),
            Some("Nhập môn khoa học dữ liệu")
        );
    }

    #[test]
    fn no_candidate_means_no_title() {
        let doc = Html::parse_document("<html><body><div class=\"col-md-8\"><p>Home</p></div></body></html>");
        let text = super::super::flatten(&doc);
        assert_eq!(TitleResolver::default().resolve(&text, Some(&doc)), None);
        assert_eq!(TitleResolver::default().resolve("", None), None);
    }

    #[test]
    fn chain_order_decides() {
        fn always(_: &str, _: Option<&Html>) -> Option<String> {
            Some("fallback title".to_string())
        }
        let resolver = TitleResolver::new(vec![("boundary", boundary as Strategy), ("always", always as Strategy)]);
        assert_eq!(
            resolver.resolve("x.jpg\nFirst Choice\nTác giả: Y", None).as_deref(),
            Some("First Choice")
        );
        assert_eq!(resolver.resolve("nothing", None).as_deref(), Some("fallback title"));
    }

    #[test]
    fn accepted_titles_are_never_labels_or_navigation() {
        let samples = [
            "x.jpg\nTác giả: A\n",
            "x.jpg\n\nHiển thị 1-20\nTác giả: A",
            "x.jpg\nBackend basics\nTác giả: A",
            "x.jpg\n    \nTác giả: A",
            "x.jpg\nMột cuốn sách hay\nTác giả: A",
        ];
        for s in samples {
            if let Some(t) = TitleResolver::default().resolve(s, None) {
                assert!(t.chars().count() > 3);
                assert!(!starts_with_label(&t));
                assert!(!t.contains("Home") && !t.contains("Back"));
            }
        }
    }
}

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://elib.duytan.edu.vn";
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Listing pages are numbered from 1; only the first `listing_pages` are sampled.
pub const DEFAULT_LISTING_PAGES: u32 = 200;

/// Path fragment shared by every cover image upload.
pub const COVER_FRAGMENT: &str = "sach_anh";
/// File extension of cover uploads; it shows up in flattened text right above the title.
pub const COVER_EXT: &str = ".jpg";
/// Main column of a detail page.
pub const CONTENT_CONTAINER: &str = "div.col-md-8";

static DETAIL_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Sach/Detail/\d+").unwrap());

/// URL layout of the library catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    base: Url,
}

impl Catalog {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base_url)?,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Page 1 is served at the bare index path, later pages at the indexed one.
    pub fn listing_url(&self, page: u32) -> String {
        let origin = self.base.as_str().trim_end_matches('/');
        if page <= 1 {
            format!("{origin}/Sach/Index")
        } else {
            format!("{origin}/Sach/Index/0/0/0/{page}")
        }
    }

    pub fn detail_url(&self, book_id: u64) -> String {
        let origin = self.base.as_str().trim_end_matches('/');
        format!("{origin}/Sach/Detail/{book_id}")
    }

    pub fn is_detail_link(&self, href: &str) -> bool {
        DETAIL_PATH_RE.is_match(href)
    }

    /// Resolve an href found on a catalog page to an absolute URL.
    pub fn absolute(&self, href: &str) -> Option<String> {
        self.base.join(href).ok().map(String::from)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            base: Url::parse(DEFAULT_BASE_URL).unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_urls() {
        let c = Catalog::default();
        assert_eq!(c.listing_url(1), "https://elib.duytan.edu.vn/Sach/Index");
        assert_eq!(c.listing_url(37), "https://elib.duytan.edu.vn/Sach/Index/0/0/0/37");
    }

    #[test]
    fn detail_links() {
        let c = Catalog::new("http://127.0.0.1:8080/").unwrap();
        assert_eq!(c.detail_url(92799), "http://127.0.0.1:8080/Sach/Detail/92799");
        assert!(c.is_detail_link("/Sach/Detail/92799"));
        assert!(!c.is_detail_link("/Sach/Index/0/0/0/2"));
        assert_eq!(
            c.absolute("/Sach/Detail/5").as_deref(),
            Some("http://127.0.0.1:8080/Sach/Detail/5")
        );
    }
}

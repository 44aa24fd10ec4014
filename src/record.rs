use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One labeled attribute of a catalog detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Author,
    Publisher,
    PublicationYear,
    Pages,
    Dimensions,
    RegistrationNumber,
    Isbn,
    DeweyCode,
    Price,
    StorageLocation,
    Language,
    DocumentType,
    Availability,
    Keywords,
    Subject,
    Department,
    Summary,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::Author,
        Field::Publisher,
        Field::PublicationYear,
        Field::Pages,
        Field::Dimensions,
        Field::RegistrationNumber,
        Field::Isbn,
        Field::DeweyCode,
        Field::Price,
        Field::StorageLocation,
        Field::Language,
        Field::DocumentType,
        Field::Availability,
        Field::Keywords,
        Field::Subject,
        Field::Department,
        Field::Summary,
    ];

    /// Labels as printed on the catalog, site language first.
    pub fn labels(self) -> [&'static str; 2] {
        match self {
            Field::Author => ["Tác giả", "Author"],
            Field::Publisher => ["Nhà xuất bản", "Publisher"],
            Field::PublicationYear => ["Năm xuất bản", "Year of publication"],
            Field::Pages => ["Số trang", "Pages"],
            Field::Dimensions => ["Kích thước", "Dimensions"],
            Field::RegistrationNumber => ["Số đăng ký cá biệt", "Registration number"],
            Field::Isbn => ["ISBN", "ISBN"],
            Field::DeweyCode => ["Mã Dewey", "Dewey code"],
            Field::Price => ["Đơn giá", "Price"],
            Field::StorageLocation => ["Vị trí lưu trữ", "Storage location"],
            Field::Language => ["Ngôn ngữ", "Language"],
            Field::DocumentType => ["Loại tài liệu", "Document type"],
            Field::Availability => ["Đang rỗi/ Tổng sách", "Availability"],
            Field::Keywords => ["Từ khóa", "Keywords"],
            Field::Subject => ["Chủ đề", "Subject"],
            Field::Department => ["Chuyên ngành", "Department"],
            Field::Summary => ["Tóm tắt", "Summary"],
        }
    }
}

/// Extracted label values. Keys are present only when the label was found
/// and its value is non-empty after trimming.
pub type Fields = BTreeMap<Field, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dewey_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub url: String,
}

impl BookRecord {
    /// Assemble a record from extractor output. A year that is not a 4-digit
    /// number, or is all zeros, is dropped rather than stored.
    pub fn from_fields(
        url: &str,
        title: Option<String>,
        cover_image: Option<String>,
        mut fields: Fields,
    ) -> Self {
        let mut take = |f: Field| fields.remove(&f).filter(|v| !v.trim().is_empty());

        let publication_year = take(Field::PublicationYear).and_then(|y| parse_year(&y));

        BookRecord {
            title: title.filter(|t| !t.trim().is_empty()),
            author: take(Field::Author),
            publisher: take(Field::Publisher),
            publication_year,
            pages: take(Field::Pages),
            dimensions: take(Field::Dimensions),
            registration_number: take(Field::RegistrationNumber),
            isbn: take(Field::Isbn),
            dewey_code: take(Field::DeweyCode),
            price: take(Field::Price),
            storage_location: take(Field::StorageLocation),
            language: take(Field::Language),
            document_type: take(Field::DocumentType),
            availability: take(Field::Availability),
            keywords: take(Field::Keywords),
            subject: take(Field::Subject),
            department: take(Field::Department),
            summary: take(Field::Summary),
            cover_image,
            url: url.to_string(),
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }
}

/// (language, count) over a batch, most common first; absent language counts
/// as "unknown". Same ordering as `db::language_breakdown`.
pub fn language_counts(books: &[BookRecord]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for b in books {
        *counts.entry(b.language.as_deref().unwrap_or("unknown")).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(lang, n)| (lang.to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if raw.len() != 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // 0 is the storage sentinel for "no year"
    raw.parse().ok().filter(|y| *y != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fields_maps_every_key() {
        let mut fields = Fields::new();
        for f in Field::ALL {
            fields.insert(f, format!("v-{:?}", f));
        }
        fields.insert(Field::PublicationYear, "2015".to_string());

        let r = BookRecord::from_fields("https://x/Sach/Detail/1", Some("T".into()), None, fields);
        assert_eq!(r.author.as_deref(), Some("v-Author"));
        assert_eq!(r.department.as_deref(), Some("v-Department"));
        assert_eq!(r.summary.as_deref(), Some("v-Summary"));
        assert_eq!(r.publication_year, Some(2015));
        assert_eq!(r.url, "https://x/Sach/Detail/1");
    }

    #[test]
    fn bad_year_is_absent() {
        let mut fields = Fields::new();
        fields.insert(Field::PublicationYear, "N/A".to_string());
        let r = BookRecord::from_fields("u", None, None, fields);
        assert_eq!(r.publication_year, None);
    }

    #[test]
    fn zero_year_is_absent() {
        let mut fields = Fields::new();
        fields.insert(Field::PublicationYear, "0000".to_string());
        let r = BookRecord::from_fields("u", None, None, fields);
        assert_eq!(r.publication_year, None);
    }

    #[test]
    fn blank_values_are_omitted() {
        let mut fields = Fields::new();
        fields.insert(Field::Author, "   ".to_string());
        let r = BookRecord::from_fields("u", Some(" ".into()), None, fields);
        assert!(r.author.is_none());
        assert!(r.title.is_none());
    }

    #[test]
    fn batch_language_counts() {
        let book = |lang: Option<&str>| BookRecord {
            language: lang.map(String::from),
            url: "u".into(),
            ..Default::default()
        };
        let books = [book(Some("English")), book(Some("Tiếng Việt")), book(None), book(Some("Tiếng Việt"))];
        assert_eq!(
            language_counts(&books),
            vec![
                ("Tiếng Việt".to_string(), 2),
                ("English".to_string(), 1),
                ("unknown".to_string(), 1),
            ]
        );
        assert!(language_counts(&[]).is_empty());
    }

    #[test]
    fn json_omits_absent_fields() {
        let r = BookRecord {
            title: Some("Đắc nhân tâm".into()),
            url: "u".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("Đắc nhân tâm"));
        assert!(!json.contains("author"));
    }
}

use std::path::Path;

use anyhow::{Context, Result};

use crate::record::BookRecord;

/// Pretty-printed UTF-8 JSON array; absent fields are left out.
pub fn write_json(path: &Path, books: &[BookRecord]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating export directory {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(books)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn read_json(path: &Path) -> Result<Vec<BookRecord>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let books = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(books)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_keeps_vietnamese_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/books.json");
        let books = vec![
            BookRecord {
                title: Some("Dế Mèn phiêu lưu ký".into()),
                author: Some("Tô Hoài".into()),
                publication_year: Some(1941),
                url: "https://elib.duytan.edu.vn/Sach/Detail/1".into(),
                ..Default::default()
            },
            BookRecord {
                url: "https://elib.duytan.edu.vn/Sach/Detail/2".into(),
                ..Default::default()
            },
        ];

        write_json(&path, &books).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Dế Mèn phiêu lưu ký"));
        assert!(!raw.contains("publisher"));
        assert!(raw.contains("\n  "));

        assert_eq!(read_json(&path).unwrap(), books);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_json(&dir.path().join("nope.json")).is_err());
    }
}

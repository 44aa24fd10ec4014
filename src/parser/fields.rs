use std::sync::LazyLock;

use regex::Regex;

use crate::record::{Field, Fields};

/// Text that follows the summary when the full record is behind a login.
pub const LOGIN_MARKER: &str = "Bạn phải đăng nhập";

/// One compiled "<label>: value" pattern per (field, label) pair, site label first.
static LINE_RES: LazyLock<Vec<(Field, Regex)>> = LazyLock::new(|| {
    Field::ALL
        .iter()
        .filter(|f| **f != Field::Summary)
        .flat_map(|f| {
            let [site, gloss] = f.labels();
            [(*f, site_label_re(site, r":\s*([^\n\r]+)"))]
                .into_iter()
                .chain((gloss != site).then(|| (*f, gloss_label_re(gloss, r":[ \t]*([^\n\r]+)"))))
        })
        .collect()
});

static SUMMARY_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let [site, gloss] = Field::Summary.labels();
    vec![site_label_re(site, ":"), gloss_label_re(gloss, ":")]
});

fn site_label_re(label: &str, tail: &str) -> Regex {
    Regex::new(&format!("{}{}", regex::escape(label), tail)).unwrap()
}

/// English glosses also name search-form inputs in the page chrome, so they
/// only count at the start of a line with the value on that same line.
fn gloss_label_re(label: &str, tail: &str) -> Regex {
    Regex::new(&format!(r"(?m)^[ \t]*{}{}", regex::escape(label), tail)).unwrap()
}

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9])([0-9]{4})(?:[^0-9]|$)").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Pulls labeled metadata out of flattened page text.
pub trait FieldExtractor {
    fn extract(&self, text: &str) -> Fields;
}

/// Regex-over-flattened-text extractor for the catalog's label vocabulary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LabelExtractor;

impl FieldExtractor for LabelExtractor {
    fn extract(&self, text: &str) -> Fields {
        let mut fields = Fields::new();

        for (field, re) in LINE_RES.iter() {
            if fields.contains_key(field) {
                continue;
            }
            // "Tác giả:\nNhà xuất bản: X" must not hand the publisher line to author
            let value = re
                .captures_iter(text)
                .map(|c| c[1].trim().to_string())
                .find(|v| !v.is_empty() && !starts_with_label(v));
            let Some(value) = value else {
                continue;
            };
            let value = match field {
                Field::PublicationYear => match YEAR_RE.captures(&value) {
                    Some(c) => c[1].to_string(),
                    None => continue,
                },
                _ => value,
            };
            fields.insert(*field, value);
        }

        if let Some(summary) = extract_summary(text) {
            fields.insert(Field::Summary, summary);
        }

        fields
    }
}

/// True when `s` opens with any known "<label>:" prefix.
pub fn starts_with_label(s: &str) -> bool {
    Field::ALL.iter().any(|f| {
        f.labels().iter().any(|label| {
            s.strip_prefix(label)
                .is_some_and(|rest| rest.trim_start().starts_with(':'))
        })
    })
}

fn extract_summary(text: &str) -> Option<String> {
    let m = SUMMARY_RES.iter().find_map(|re| re.find(text))?;
    let rest = text[m.end()..].trim_start();
    let span = &rest[..summary_end(rest)];

    let collapsed = WS_RE.replace_all(span.trim(), " ");
    let summary = match collapsed.find(LOGIN_MARKER) {
        Some(idx) => collapsed[..idx].trim(),
        None => collapsed.trim(),
    };

    if summary.is_empty() {
        None
    } else {
        Some(summary.to_string())
    }
}

/// Summary runs until a blank line, a line opening with an ASCII uppercase
/// letter (next section), or end of text. Vietnamese capitals such as Đ or Â
/// continue the summary.
fn summary_end(rest: &str) -> usize {
    for (i, _) in rest.match_indices('\n') {
        let after = &rest[i + 1..];
        let next = after.trim_start();
        let gap = &after[..after.len() - next.len()];
        if gap.contains('\n') || next.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            return i;
        }
    }
    rest.len()
}

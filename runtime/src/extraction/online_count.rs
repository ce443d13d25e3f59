//! Phrase-based extractor for "N online" style counters.
//!
//! Matching is done on the human-readable phrasing rather than on a fixed
//! selector. Two passes run in order:
//!
//! 1. **Structural** (markup only): elements whose `class` mentions
//!    "online" are scanned with the phrase patterns, and a bare number inside
//!    such an element is accepted as the count.
//! 2. **Phrase scan**: the ordered phrase patterns are applied to the whole
//!    text and the first pattern that matches wins.
//!
//! No match is a normal result (`None`), not an error.

use regex::{Captures, Regex};
use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Digits, optionally grouped with thousands separators (`1,234`).
const COUNT: &str = r"\d{1,3}(?:,\d{3})+|\d+";

/// A pure matcher from text to a count.
type Matcher = fn(&str) -> Option<u64>;

/// Phrase matchers in priority order.
const PHRASE_MATCHERS: &[(&str, Matcher)] = &[
    ("count_online_or_users", match_online_or_users),
    ("online_label_count", match_online_label),
    ("count_person_unit", match_person_unit),
];

struct Patterns {
    online_or_users: Regex,
    online_label: Regex,
    person_unit: Regex,
    bare_count: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        online_or_users: Regex::new(&format!(r"(?i)({COUNT})\s*(?:online|users)"))
            .expect("online/users regex is valid"),
        online_label: Regex::new(&format!(r"在线[:：\s]*({COUNT})"))
            .expect("online label regex is valid"),
        person_unit: Regex::new(&format!(r"({COUNT})\s*人")).expect("person unit regex is valid"),
        bare_count: Regex::new(&format!(r"^\s*({COUNT})\s*$")).expect("bare count regex is valid"),
    })
}

// ── Public API ──────────────────────────────────────────────────────────────

/// Extract the concurrently viewing count from raw markup or rendered text.
///
/// Markup gets the structural pass first; every input then falls back to the
/// phrase scan.
pub fn extract(text: &str) -> Option<u64> {
    if looks_like_markup(text) {
        if let Some(count) = extract_from_markup(text) {
            return Some(count);
        }
    }
    extract_from_text(text)
}

/// Apply the phrase matchers in order and return the first hit.
pub fn extract_from_text(text: &str) -> Option<u64> {
    PHRASE_MATCHERS.iter().find_map(|(name, matcher)| {
        let count = matcher(text)?;
        tracing::trace!("phrase matcher {name} matched {count}");
        Some(count)
    })
}

/// Structural pass: look inside elements whose class mentions "online".
pub fn extract_from_markup(html: &str) -> Option<u64> {
    let document = Html::parse_document(html);
    let sel = Selector::parse("[class]").ok()?;

    for el in document.select(&sel) {
        let Some(class_attr) = el.value().attr("class") else {
            continue;
        };
        if !class_attr.to_lowercase().contains("online") {
            continue;
        }

        let text = element_text(&el);
        if text.is_empty() {
            continue;
        }
        if let Some(count) = extract_from_text(&text) {
            return Some(count);
        }
        if let Some(count) = first_count(&patterns().bare_count, &text) {
            return Some(count);
        }
    }
    None
}

/// Parse a count, stripping thousands separators.
///
/// Values that do not fit in a `u64` are treated as no count.
pub fn parse_count(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok()
}

// ── Matchers ────────────────────────────────────────────────────────────────

fn match_online_or_users(text: &str) -> Option<u64> {
    first_count(&patterns().online_or_users, text)
}

fn match_online_label(text: &str) -> Option<u64> {
    first_count(&patterns().online_label, text)
}

fn match_person_unit(text: &str) -> Option<u64> {
    first_count(&patterns().person_unit, text)
}

/// First match of `re` in `text` whose captured count parses.
fn first_count(re: &Regex, text: &str) -> Option<u64> {
    re.captures_iter(text)
        .find_map(|caps: Captures<'_>| caps.get(1).and_then(|m| parse_count(m.as_str())))
}

fn looks_like_markup(text: &str) -> bool {
    text.contains('<') && text.contains('>')
}

fn element_text(el: &scraper::ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_then_online_or_users() {
        assert_eq!(extract("1,234 users online"), Some(1234));
        assert_eq!(extract("42 Online"), Some(42));
        assert_eq!(extract("There are 7users here"), Some(7));
        assert_eq!(extract("12345 online"), Some(12345));
    }

    #[test]
    fn test_localized_label_and_unit() {
        assert_eq!(extract("当前在线: 5,678"), Some(5678));
        assert_eq!(extract("在线：12"), Some(12));
        assert_eq!(extract("3,210 人正在做此题"), Some(3210));
    }

    #[test]
    fn test_pattern_priority() {
        // The online/users phrase outranks the person unit even when it
        // appears later in the text.
        assert_eq!(extract("5 人 ... 7 online"), Some(7));
        assert_eq!(extract("在线 9 ... 11 人"), Some(9));
    }

    #[test]
    fn test_no_signal() {
        assert_eq!(extract("no data here"), None);
        assert_eq!(extract(""), None);
        assert_eq!(extract("<html><body><p>Two Sum</p></body></html>"), None);
    }

    #[test]
    fn test_overflowing_count_is_ignored() {
        assert_eq!(extract("99999999999999999999999 online"), None);
        assert_eq!(extract("99999999999999999999999 online, 3 online"), Some(3));
    }

    #[test]
    fn test_structural_pass_prefers_online_container() {
        let html = r#"<html><body>
            <p>5 users solved this today</p>
            <div class="css-x OnlineCount_root"><span>987</span></div>
        </body></html>"#;
        assert_eq!(extract(html), Some(987));
    }

    #[test]
    fn test_structural_pass_phrase_inside_container() {
        let html = r#"<div class="online-users"><b>2,048</b> users</div>"#;
        assert_eq!(extract_from_markup(html), Some(2048));
    }

    #[test]
    fn test_markup_falls_back_to_text_scan() {
        let html = r#"<div class="stats"><span>321 online</span></div>"#;
        assert_eq!(extract_from_markup(html), None);
        assert_eq!(extract(html), Some(321));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1,234,567"), Some(1_234_567));
        assert_eq!(parse_count("0"), Some(0));
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("12a"), None);
    }
}

//! Deterministic document classification.

use url::Url;

use crate::types::DocumentCategory;

/// Ordered keyword rules; the first rule with any keyword present wins.
const RULES: [(&[&str], DocumentCategory); 4] = [
    (&["permit", "building"], DocumentCategory::Permit),
    (&["zoning", "minutes"], DocumentCategory::ZoningMinutes),
    (&["utility", "power"], DocumentCategory::UtilityFiling),
    (&["planning", "development"], DocumentCategory::PlanningDoc),
];

/// Classify a document from its title and text.
///
/// Case-insensitive substring match over `title + " " + content`. Total:
/// anything matching no rule is [`DocumentCategory::Other`].
pub fn classify(title: &str, content: &str) -> DocumentCategory {
    let haystack = format!("{} {}", title, content).to_lowercase();

    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(_, category)| *category)
        .unwrap_or(DocumentCategory::Other)
}

/// Human-readable title derived from a URL's file name, used for binary
/// documents whose body is not decoded.
pub fn title_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    let stem = decoded
        .rsplit_once('.')
        .map(|(stem, _)| stem.to_string())
        .unwrap_or(decoded);

    let title = stem
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rule_order() {
        assert_eq!(classify("Building Permit 2024-17", ""), DocumentCategory::Permit);
        assert_eq!(classify("Board Minutes", "zoning hearing"), DocumentCategory::ZoningMinutes);
        assert_eq!(classify("Rate case", "Dominion Power filing"), DocumentCategory::UtilityFiling);
        assert_eq!(classify("Comprehensive Plan", "planning commission"), DocumentCategory::PlanningDoc);
        assert_eq!(classify("Agenda", "roll call"), DocumentCategory::Other);
    }

    #[test]
    fn test_first_match_wins_across_title_and_content() {
        // "minutes" in the title loses to "permit" in the body: permit is checked first.
        assert_eq!(
            classify("Zoning minutes", "the applicant requested a building permit"),
            DocumentCategory::Permit
        );
        assert_eq!(
            classify("Utility filing", "the planning commission"),
            DocumentCategory::UtilityFiling
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("ZONING", ""), DocumentCategory::ZoningMinutes);
        assert_eq!(classify("", "PoWeR"), DocumentCategory::UtilityFiling);
    }

    #[test]
    fn test_title_from_url() {
        let url = Url::parse("https://a.gov/docs/Building_Permit%20BP-2024-17.pdf").unwrap();
        assert_eq!(title_from_url(&url), "Building Permit BP 2024 17");

        let bare = Url::parse("https://a.gov/").unwrap();
        assert_eq!(title_from_url(&bare), "Untitled");
    }

    proptest! {
        #[test]
        fn prop_classification_is_deterministic(title in ".{0,40}", content in ".{0,200}") {
            let first = classify(&title, &content);
            let second = classify(&title, &content);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_keyword_free_text_is_other(text in "[qxjzv ]{0,60}") {
            prop_assert_eq!(classify(&text, &text), DocumentCategory::Other);
        }
    }
}

//! Personal-info keyword matching. The local machine decides; this is never
//! called from a network boundary so there is no reason to leave it async.

pub fn contains_personal_info(content: &str, keywords: &[String]) -> bool {
    let lower = content.to_lowercase();
    keywords.iter().any(|kw| lower.contains(&kw.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_case_insensitive_substring() {
        let keywords = vec!["ma fille".to_string()];
        assert!(contains_personal_info("Ma fille s'appelle Alice", &keywords));
        assert!(contains_personal_info("ma FILLE adore le foot", &keywords));
    }

    #[test]
    fn no_match_returns_false() {
        let keywords = vec!["numero de telephone".to_string()];
        assert!(!contains_personal_info("Paris est la capitale de la France", &keywords));
    }

    #[test]
    fn empty_keyword_list_never_matches() {
        assert!(!contains_personal_info("anything at all", &[]));
    }
}

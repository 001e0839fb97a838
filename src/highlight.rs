use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

/// Case-insensitive alternation over the search tokens, longest first so
/// "tomato" wins over "tom".
pub fn build_highlight_regex(tokens: &[String]) -> Option<Regex> {
    let mut seen = HashSet::new();
    let mut unique: Vec<&str> = tokens
        .iter()
        .map(|token| token.trim())
        .filter(|token| !token.is_empty() && seen.insert(token.to_lowercase()))
        .collect();
    if unique.is_empty() {
        return None;
    }
    unique.sort_by_key(|token| std::cmp::Reverse(token.chars().count()));
    let pattern = unique
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

/// Splits `text` into (fragment, is_match) runs.
pub fn split_matches<'t>(text: &'t str, regex: Option<&Regex>) -> Vec<(&'t str, bool)> {
    let Some(re) = regex else {
        return vec![(text, false)];
    };
    let mut runs = Vec::new();
    let mut last = 0;
    for mat in re.find_iter(text) {
        if mat.start() > last {
            runs.push((&text[last..mat.start()], false));
        }
        runs.push((mat.as_str(), true));
        last = mat.end();
    }
    if last < text.len() || runs.is_empty() {
        runs.push((&text[last..], false));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_longer_tokens_first() {
        let regex = build_highlight_regex(&["tom".into(), "tomato".into()]).expect("regex");
        let matches: Vec<_> = regex.find_iter("tomatoes").map(|m| m.as_str()).collect();
        assert_eq!(matches, vec!["tomato"]);
    }

    #[test]
    fn splits_text_around_hits() {
        let regex = build_highlight_regex(&["Basil".into(), "basil".into()]).expect("regex");
        assert_eq!(
            split_matches("Pesto with basil", Some(&regex)),
            vec![("Pesto with ", false), ("basil", true)]
        );
        assert_eq!(split_matches("plain", None), vec![("plain", false)]);
        assert!(build_highlight_regex(&["  ".into()]).is_none());
    }
}

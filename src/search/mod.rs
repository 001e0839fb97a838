#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub terms: Vec<String>,
    pub title_terms: Vec<String>,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub max_minutes: Option<u32>,
}

impl SearchQuery {
    pub fn has_terms(&self) -> bool {
        !self.terms.is_empty() || !self.title_terms.is_empty()
    }

    pub fn has_filters(&self) -> bool {
        !self.authors.is_empty() || !self.categories.is_empty() || self.max_minutes.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_terms() && !self.has_filters()
    }

    pub fn highlight_terms(&self) -> Vec<String> {
        let mut terms = self.terms.clone();
        terms.extend(self.title_terms.iter().cloned());
        terms
    }

    /// Free text that can also match people, e.g. "ali" for user "alice".
    pub fn people_term(&self) -> Option<String> {
        self.authors
            .first()
            .cloned()
            .or_else(|| self.terms.first().cloned())
    }

    pub fn filter_chips(&self) -> Vec<String> {
        let mut chips = Vec::new();
        for author in &self.authors {
            chips.push(format!("by:{author}"));
        }
        for category in &self.categories {
            chips.push(format!("category:{category}"));
        }
        if let Some(max) = self.max_minutes {
            chips.push(format!("≤{max}min"));
        }
        chips
    }
}

pub fn parse_query(input: &str) -> SearchQuery {
    let mut query = SearchQuery::default();
    for raw in input.split_whitespace() {
        if let Some(author) = raw
            .strip_prefix("author:")
            .or_else(|| raw.strip_prefix("by:"))
        {
            if let Some(value) = sanitize_term(author) {
                query.authors.push(value.to_lowercase());
            }
            continue;
        }
        if let Some(category) = raw.strip_prefix("category:") {
            if let Some(value) = sanitize_term(category) {
                query.categories.push(value.to_lowercase());
            }
            continue;
        }
        if let Some(term) = raw.strip_prefix("title:") {
            if let Some(value) = sanitize_term(term) {
                query.title_terms.push(value);
            }
            continue;
        }
        if let Some(limit) = raw.strip_prefix("max:") {
            if let Some(minutes) = parse_minutes(limit) {
                query.max_minutes = Some(match query.max_minutes {
                    Some(existing) => existing.min(minutes),
                    None => minutes,
                });
            }
            continue;
        }
        if let Some(value) = sanitize_term(raw) {
            query.terms.push(value);
        }
    }
    query
}

fn sanitize_term(raw: &str) -> Option<String> {
    let term: String = raw
        .chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.' | '\''))
        .collect();
    if term.is_empty() {
        None
    } else {
        Some(term)
    }
}

fn parse_minutes(raw: &str) -> Option<u32> {
    let trimmed = raw.trim_end_matches("min").trim_end_matches('m');
    trimmed.parse::<u32>().ok().filter(|minutes| *minutes > 0)
}

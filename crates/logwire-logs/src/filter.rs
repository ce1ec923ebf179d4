use regex::Regex;

use logwire_types::{Category, LogRecord};

/// Active view filter: search text, level and category, all conjunctive
#[derive(Clone, Default)]
pub struct LogFilter {
    /// Case-insensitive literal matcher for the search text (if any)
    regex: Option<Regex>,

    /// Search text as typed
    search: String,

    /// Level to include, compared case-insensitively (None = all)
    level: Option<String>,

    /// Category to include (None = all)
    category: Option<Category>,
}

impl LogFilter {
    /// Filter on a search string. The text is matched literally.
    pub fn new(search: &str) -> Result<Self, regex::Error> {
        let regex = if search.is_empty() {
            None
        } else {
            Some(Regex::new(&format!("(?i){}", regex::escape(search)))?)
        };

        Ok(Self {
            regex,
            search: search.to_string(),
            level: None,
            category: None,
        })
    }

    /// Set the level filter. Empty and "all" clear it.
    pub fn with_level(mut self, level: Option<&str>) -> Self {
        self.level = level
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("all"))
            .map(str::to_uppercase);
        self
    }

    pub fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    /// Check if a record passes every active criterion
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(level) = &self.level {
            if !record.level.eq_ignore_ascii_case(level) {
                return false;
            }
        }

        if let Some(category) = self.category {
            if record.category() != category {
                return false;
            }
        }

        match &self.regex {
            Some(re) => re.is_match(&record.message),
            None => true,
        }
    }

    /// Find all match positions in a string (for highlighting)
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        match &self.regex {
            Some(re) => re.find_iter(text).map(|m| (m.start(), m.end())).collect(),
            None => Vec::new(),
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    /// Check if filter is empty (matches everything)
    pub fn is_empty(&self) -> bool {
        self.regex.is_none() && self.level.is_none() && self.category.is_none()
    }
}

impl std::fmt::Debug for LogFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFilter")
            .field("search", &self.search)
            .field("level", &self.level)
            .field("category", &self.category)
            .finish()
    }
}

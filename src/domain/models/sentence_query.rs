use regex::Regex;

use crate::domain::DomainError;

/// Half-open ordinal range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceRange {
    start: u64,
    end: u64,
}

impl SentenceRange {
    pub fn new(start: u64, end: u64) -> Result<Self, DomainError> {
        if start > end {
            return Err(DomainError::invalid_input(format!(
                "range start {} is greater than end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, n: u64) -> bool {
        self.start <= n && n < self.end
    }
}

impl std::fmt::Display for SentenceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Regular expression matched anywhere inside a sentence.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    pattern: String,
    regex: Regex,
}

impl KeywordFilter {
    pub fn new(pattern: impl Into<String>) -> Result<Self, DomainError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(DomainError::invalid_input("keyword pattern must not be empty"));
        }
        let regex = Regex::new(&pattern).map_err(|e| {
            DomainError::invalid_input(format!("invalid keyword pattern '{}': {}", pattern, e))
        })?;
        Ok(Self { pattern, regex })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, sent: &str) -> bool {
        self.regex.is_match(sent)
    }
}

impl PartialEq for KeywordFilter {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SentenceQuery {
    range: Option<SentenceRange>,
    keyword: Option<KeywordFilter>,
}

impl SentenceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, range: SentenceRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_keyword(mut self, keyword: KeywordFilter) -> Self {
        self.keyword = Some(keyword);
        self
    }

    pub fn range(&self) -> Option<SentenceRange> {
        self.range
    }

    pub fn keyword(&self) -> Option<&KeywordFilter> {
        self.keyword.as_ref()
    }
}

//! Search request models.

use chrono::{Days, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ArxivError;

/// Sort order for search results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// Value of the `sortOrder` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

/// Sort field for search results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    Relevance,
    SubmittedDate,
    LastUpdatedDate,
}

impl SortBy {
    /// Value of the `sortBy` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::SubmittedDate => "submittedDate",
            SortBy::LastUpdatedDate => "lastUpdatedDate",
        }
    }
}

/// Field prefixes understood by the arXiv query grammar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    #[default]
    All,
    Title,
    Author,
    Abstract,
    Comment,
    JournalRef,
    Category,
    ReportNumber,
    Id,
}

impl SearchField {
    /// Prefix code used in `search_query`
    pub fn code(&self) -> &'static str {
        match self {
            SearchField::All => "all",
            SearchField::Title => "ti",
            SearchField::Author => "au",
            SearchField::Abstract => "abs",
            SearchField::Comment => "co",
            SearchField::JournalRef => "jr",
            SearchField::Category => "cat",
            SearchField::ReportNumber => "rn",
            SearchField::Id => "id",
        }
    }
}

/// Boolean operator joining the terms of a [`FieldQuery`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoolOp {
    #[default]
    And,
    Or,
    AndNot,
}

impl BoolOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoolOp::And => "AND",
            BoolOp::Or => "OR",
            BoolOp::AndNot => "ANDNOT",
        }
    }
}

/// One or more terms scoped to a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldQuery {
    pub terms: Vec<String>,
    #[serde(default)]
    pub field: SearchField,
    #[serde(default)]
    pub operator: BoolOp,
}

impl FieldQuery {
    /// Create a query over `field` with the default `AND` operator
    pub fn new<I, S>(field: SearchField, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
            field,
            operator: BoolOp::And,
        }
    }

    /// Set the operator joining the terms
    pub fn operator(mut self, operator: BoolOp) -> Self {
        self.operator = operator;
        self
    }
}

/// Free text or structured field-scoped terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// Passed through to `search_query` as written (e.g. `cat:cs.AI`)
    Text(String),
    /// Field-scoped terms, AND-joined with each other
    Fields(Vec<FieldQuery>),
}

impl Query {
    fn is_blank(&self) -> bool {
        match self {
            Query::Text(text) => text.trim().is_empty(),
            Query::Fields(fields) => fields
                .iter()
                .all(|f| f.terms.iter().all(|t| t.trim().is_empty())),
        }
    }
}

/// Which date field a [`DateRange`] filters on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateField {
    #[default]
    SubmittedDate,
    LastUpdatedDate,
}

impl DateField {
    pub fn code(&self) -> &'static str {
        match self {
            DateField::SubmittedDate => "submittedDate",
            DateField::LastUpdatedDate => "lastUpdatedDate",
        }
    }
}

/// Inclusive date window; either bound may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub field: DateField,
}

impl DateRange {
    /// Parse optional `YYYY-MM-DD` bounds
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, ArxivError> {
        Ok(Self {
            start: start.map(parse_date).transpose()?,
            end: end.map(parse_date).transpose()?,
            field: DateField::SubmittedDate,
        })
    }

    /// Window covering exactly `from..=to`
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            start: Some(from),
            end: Some(to),
            field: DateField::SubmittedDate,
        }
    }

    /// Today in local time
    pub fn today() -> Self {
        let today = Local::now().date_naive();
        Self::between(today, today)
    }

    /// Yesterday in local time
    pub fn yesterday() -> Self {
        let day = Local::now().date_naive() - Duration::days(1);
        Self::between(day, day)
    }

    /// The last `days` days up to and including today
    ///
    /// A window reaching past the earliest representable date starts there.
    pub fn last_days(days: u32) -> Self {
        let today = Local::now().date_naive();
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self::between(start, today)
    }

    /// Filter on a different date field
    pub fn on_field(mut self, field: DateField) -> Self {
        self.field = field;
        self
    }

    /// Whether neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Parse a strict `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, ArxivError> {
    let value = value.trim();
    let shaped = value.len() == 10
        && value
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !shaped {
        return Err(ArxivError::Validation(format!(
            "Invalid date format (expected YYYY-MM-DD): {}",
            value
        )));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| ArxivError::Validation(format!("Invalid date {}: {}", value, e)))
}

/// A logical arXiv search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query text or structured field terms
    pub query: Option<Query>,

    /// Optional date window
    pub date_range: Option<DateRange>,

    /// Category codes, OR-joined
    pub categories: Vec<String>,

    /// Explicit arXiv ids, sent as `id_list`
    pub id_list: Vec<String>,

    /// Maximum number of results to return
    pub max_results: usize,

    /// Offset of the first result
    pub start: usize,

    pub sort_by: SortBy,

    pub sort_order: SortOrder,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: None,
            date_range: None,
            categories: Vec::new(),
            id_list: Vec::new(),
            max_results: 10,
            start: 0,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl SearchRequest {
    /// Create a free-text search
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(Query::Text(query.into())),
            ..Default::default()
        }
    }

    /// Create a search over structured field terms
    pub fn fields(fields: Vec<FieldQuery>) -> Self {
        Self {
            query: Some(Query::Fields(fields)),
            ..Default::default()
        }
    }

    /// Create a lookup of explicit ids
    pub fn by_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id_list: Vec<String> = ids.into_iter().map(Into::into).collect();
        Self {
            max_results: id_list.len().max(1),
            id_list,
            ..Default::default()
        }
    }

    /// Set maximum results
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Set the result offset
    pub fn start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    /// Set the date window
    pub fn date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Add a category filter
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Add ids to the `id_list`
    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_list.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Set sort by
    pub fn sort_by(mut self, sort: SortBy) -> Self {
        self.sort_by = sort;
        self
    }

    /// Set sort order
    pub fn sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }

    /// Whether a non-blank query is present
    pub fn has_query(&self) -> bool {
        self.query.as_ref().is_some_and(|q| !q.is_blank())
    }

    /// Whether any category is set
    pub fn has_categories(&self) -> bool {
        self.categories.iter().any(|c| !c.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = SearchRequest::new("cat:cs.AI");
        assert_eq!(request.max_results, 10);
        assert_eq!(request.start, 0);
        assert_eq!(request.sort_by, SortBy::Relevance);
        assert_eq!(request.sort_order, SortOrder::Descending);
        assert!(request.has_query());
    }

    #[test]
    fn test_blank_query_is_not_a_query() {
        assert!(!SearchRequest::new("   ").has_query());
        assert!(!SearchRequest::fields(vec![FieldQuery::new(SearchField::Title, [""])]).has_query());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("2024-2-9").is_err());
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("20240101").is_err());
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn test_date_range_parse() {
        let range = DateRange::parse(Some("2024-01-01"), None).unwrap();
        assert!(range.start.is_some());
        assert!(range.end.is_none());
        assert!(!range.is_unbounded());
        assert!(DateRange::parse(None, Some("01/02/2024")).is_err());
    }

    #[test]
    fn test_shortcut_windows() {
        let week = DateRange::last_days(7);
        let (start, end) = (week.start.unwrap(), week.end.unwrap());
        assert_eq!((end - start).num_days(), 7);

        let none = DateRange::last_days(0);
        assert_eq!(none.start, none.end);

        let forever = DateRange::last_days(u32::MAX);
        assert_eq!(forever.start, Some(NaiveDate::MIN));
        assert!(forever.start <= forever.end);

        let today = DateRange::today();
        assert_eq!(today.start, today.end);
        assert!(DateRange::yesterday().end.unwrap() < today.end.unwrap());
    }

    #[test]
    fn test_by_ids_sizes_max_results() {
        let request = SearchRequest::by_ids(["2301.00001", "2301.00002"]);
        assert_eq!(request.max_results, 2);
        assert!(!request.has_query());
    }
}

//! Translation of [`SearchRequest`]s into arXiv API query parameters.

use crate::arxiv::id::validate_id;
use crate::error::ArxivError;
use crate::models::{DateRange, FieldQuery, Query, SearchField, SearchRequest};

/// Query parameters for one arXiv API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    /// `search_query`, absent for pure id lookups
    pub search_query: Option<String>,
    /// Comma-joined `id_list`
    pub id_list: Option<String>,
    pub start: usize,
    pub max_results: usize,
    pub sort_by: &'static str,
    pub sort_order: &'static str,
}

impl QueryParams {
    /// Key/value pairs in the order they are sent
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(6);
        if let Some(q) = &self.search_query {
            pairs.push(("search_query", q.clone()));
        }
        if let Some(ids) = &self.id_list {
            pairs.push(("id_list", ids.clone()));
        }
        pairs.push(("start", self.start.to_string()));
        pairs.push(("max_results", self.max_results.to_string()));
        pairs.push(("sortBy", self.sort_by.to_string()));
        pairs.push(("sortOrder", self.sort_order.to_string()));
        pairs
    }

    /// Stable md5 key for the search-result cache
    pub fn cache_key(&self) -> String {
        let input = format!(
            "{}|{}|{}|{}|{}|{}",
            self.search_query.as_deref().unwrap_or_default(),
            self.id_list.as_deref().unwrap_or_default(),
            self.start,
            self.max_results,
            self.sort_by,
            self.sort_order
        );
        format!("{:x}", md5::compute(input.as_bytes()))
    }
}

/// Validate a request and build its query parameters
pub fn build(request: &SearchRequest) -> Result<QueryParams, ArxivError> {
    validate(request)?;

    let mut clauses = Vec::new();

    match &request.query {
        Some(Query::Text(text)) if !text.trim().is_empty() => {
            clauses.push(text.trim().to_string());
        }
        Some(Query::Fields(fields)) => {
            clauses.extend(fields.iter().filter_map(field_clause));
        }
        _ => {}
    }

    if let Some(clause) = request.date_range.as_ref().and_then(date_clause) {
        clauses.push(clause);
    }

    if let Some(clause) = category_clause(&request.categories) {
        clauses.push(clause);
    }

    let search_query = (!clauses.is_empty()).then(|| clauses.join(" AND "));
    let id_list = (!request.id_list.is_empty()).then(|| request.id_list.join(","));

    Ok(QueryParams {
        search_query,
        id_list,
        start: request.start,
        max_results: request.max_results,
        sort_by: request.sort_by.as_str(),
        sort_order: request.sort_order.as_str(),
    })
}

fn validate(request: &SearchRequest) -> Result<(), ArxivError> {
    if !request.has_query() && request.id_list.is_empty() && !request.has_categories() {
        return Err(ArxivError::Validation(
            "Either query, id_list, or categories must be provided".to_string(),
        ));
    }
    if request.max_results == 0 {
        return Err(ArxivError::Validation(
            "max_results must be positive: 0".to_string(),
        ));
    }
    for id in &request.id_list {
        validate_id(id)?;
    }
    Ok(())
}

fn quote(term: &str) -> String {
    if term.contains(char::is_whitespace) {
        format!("\"{}\"", term)
    } else {
        term.to_string()
    }
}

/// `ti:foo`, `au:"Jane Doe"`, `abs:(a OR b)`; `None` when every term is blank
pub fn field_clause(query: &FieldQuery) -> Option<String> {
    let terms: Vec<String> = query
        .terms
        .iter()
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .map(|t| quote(&t))
        .collect();

    let prefix = match query.field {
        SearchField::All => String::new(),
        field => format!("{}:", field.code()),
    };

    match terms.len() {
        0 => None,
        1 => Some(format!("{}{}", prefix, terms[0])),
        _ => {
            let joiner = format!(" {} ", query.operator.as_str());
            Some(format!("{}({})", prefix, terms.join(&joiner)))
        }
    }
}

/// `submittedDate:[YYYYMMDD0000 TO YYYYMMDD2359]`, open bounds as `*`
pub fn date_clause(range: &DateRange) -> Option<String> {
    if range.is_unbounded() {
        return None;
    }
    let start = range
        .start
        .map(|d| format!("{}0000", d.format("%Y%m%d")))
        .unwrap_or_else(|| "*".to_string());
    let end = range
        .end
        .map(|d| format!("{}2359", d.format("%Y%m%d")))
        .unwrap_or_else(|| "*".to_string());
    Some(format!("{}:[{} TO {}]", range.field.code(), start, end))
}

/// `cat:X`, or `(cat:X OR cat:Y)` for several
pub fn category_clause(categories: &[String]) -> Option<String> {
    let cats: Vec<String> = categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| format!("cat:{}", c))
        .collect();

    match cats.len() {
        0 => None,
        1 => cats.into_iter().next(),
        _ => Some(format!("({})", cats.join(" OR "))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoolOp, DateField, SortBy, SortOrder};

    #[test]
    fn test_text_query_passthrough() {
        let params = build(&SearchRequest::new("cat:cs.AI").max_results(5)).unwrap();
        assert_eq!(params.search_query.as_deref(), Some("cat:cs.AI"));
        assert_eq!(params.id_list, None);
        assert_eq!(params.max_results, 5);
        assert_eq!(params.sort_by, "relevance");
        assert_eq!(params.sort_order, "descending");
    }

    #[test]
    fn test_field_clauses() {
        let single = FieldQuery::new(SearchField::Title, ["transformer"]);
        assert_eq!(field_clause(&single).unwrap(), "ti:transformer");

        let multi_word = FieldQuery::new(SearchField::Author, ["Geoffrey   Hinton"]);
        assert_eq!(field_clause(&multi_word).unwrap(), "au:\"Geoffrey Hinton\"");

        let several = FieldQuery::new(SearchField::Abstract, ["graph neural", "gnn"])
            .operator(BoolOp::Or);
        assert_eq!(field_clause(&several).unwrap(), "abs:(\"graph neural\" OR gnn)");

        let all = FieldQuery::new(SearchField::All, ["deep", "learning"]);
        assert_eq!(field_clause(&all).unwrap(), "(deep AND learning)");

        let andnot = FieldQuery::new(SearchField::Title, ["vision", "survey"])
            .operator(BoolOp::AndNot);
        assert_eq!(field_clause(&andnot).unwrap(), "ti:(vision ANDNOT survey)");

        assert!(field_clause(&FieldQuery::new(SearchField::Title, ["  "])).is_none());
    }

    #[test]
    fn test_date_clause_bounds() {
        let both = DateRange::parse(Some("2024-01-01"), Some("2024-01-31")).unwrap();
        assert_eq!(
            date_clause(&both).unwrap(),
            "submittedDate:[202401010000 TO 202401312359]"
        );

        let start_only = DateRange::parse(Some("2024-01-01"), None).unwrap();
        assert!(date_clause(&start_only).unwrap().ends_with("TO *]"));

        let end_only = DateRange::parse(None, Some("2024-01-31")).unwrap();
        assert!(date_clause(&end_only)
            .unwrap()
            .starts_with("submittedDate:[* TO "));

        let updated = start_only.on_field(DateField::LastUpdatedDate);
        assert!(date_clause(&updated).unwrap().starts_with("lastUpdatedDate:["));

        assert!(date_clause(&DateRange::default()).is_none());
    }

    #[test]
    fn test_category_clause() {
        assert_eq!(category_clause(&["cs.AI".into()]).unwrap(), "cat:cs.AI");
        assert_eq!(
            category_clause(&["cs.AI".into(), "cs.LG".into()]).unwrap(),
            "(cat:cs.AI OR cat:cs.LG)"
        );
        assert!(category_clause(&[]).is_none());
    }

    #[test]
    fn test_clauses_joined_with_and() {
        let request = SearchRequest::fields(vec![FieldQuery::new(SearchField::Title, ["llm"])])
            .date_range(DateRange::parse(Some("2024-03-01"), None).unwrap())
            .category("cs.CL")
            .category("cs.AI");
        let params = build(&request).unwrap();
        assert_eq!(
            params.search_query.as_deref(),
            Some("ti:llm AND submittedDate:[202403010000 TO *] AND (cat:cs.CL OR cat:cs.AI)")
        );
    }

    #[test]
    fn test_categories_alone_are_enough() {
        let request = SearchRequest {
            categories: vec!["cs.AI".into()],
            ..Default::default()
        };
        assert_eq!(build(&request).unwrap().search_query.as_deref(), Some("cat:cs.AI"));
    }

    #[test]
    fn test_id_list_kept_separate() {
        let request = SearchRequest::new("attention").ids(["2301.00001", "hep-th/9901001v2"]);
        let params = build(&request).unwrap();
        assert_eq!(params.search_query.as_deref(), Some("attention"));
        assert_eq!(params.id_list.as_deref(), Some("2301.00001,hep-th/9901001v2"));

        let pairs = params.to_pairs();
        assert_eq!(pairs[0].0, "search_query");
        assert_eq!(pairs[1], ("id_list", "2301.00001,hep-th/9901001v2".to_string()));
    }

    #[test]
    fn test_validation_failures() {
        let empty = SearchRequest::default();
        assert!(matches!(build(&empty), Err(ArxivError::Validation(_))));

        let blank = SearchRequest::new("  ");
        assert!(matches!(build(&blank), Err(ArxivError::Validation(_))));

        let zero = SearchRequest::new("cat:cs.AI").max_results(0);
        assert!(matches!(build(&zero), Err(ArxivError::Validation(_))));

        let bad_id = SearchRequest::by_ids(["2301.00001", "not-an-id"]);
        let err = build(&bad_id).unwrap_err();
        assert!(err.to_string().contains("not-an-id"));
    }

    #[test]
    fn test_cache_key_normalisation() {
        let a = build(&SearchRequest::new("cat:cs.AI")).unwrap();
        let b = build(&SearchRequest::new("  cat:cs.AI ")).unwrap();
        assert_eq!(a.cache_key(), b.cache_key());

        let c = build(&SearchRequest::new("cat:cs.AI").sort_by(SortBy::SubmittedDate)).unwrap();
        assert_ne!(a.cache_key(), c.cache_key());

        let d = build(&SearchRequest::new("cat:cs.AI").sort_order(SortOrder::Ascending)).unwrap();
        assert_ne!(a.cache_key(), d.cache_key());
        assert_eq!(a.cache_key().len(), 32);
    }
}

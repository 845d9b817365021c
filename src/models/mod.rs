//! Core data models for arXiv papers and search requests.

mod paper;
mod search;

pub use paper::{is_valid_http_url, Paper, PaperBuilder};
pub use search::{
    parse_date, BoolOp, DateField, DateRange, FieldQuery, Query, SearchField, SearchRequest,
    SortBy, SortOrder,
};

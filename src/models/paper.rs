//! Paper model representing a single arXiv record.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ArxivError;

/// An arXiv paper
///
/// Papers are validated on construction and read-only afterwards: the id and
/// title are non-empty and the PDF URL is an absolute http(s) URL. Use
/// [`PaperBuilder`] to create one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PaperData")]
pub struct Paper {
    id: String,
    title: String,
    authors: Vec<String>,
    r#abstract: String,
    pdf_url: String,
    published: String,
    #[serde(default)]
    updated: String,
    categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    journal_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    doi: Option<String>,
}

/// Unvalidated wire shape of a [`Paper`], used when reading cached JSON
#[derive(Debug, Clone, Deserialize)]
struct PaperData {
    id: String,
    title: String,
    authors: Vec<String>,
    r#abstract: String,
    pdf_url: String,
    #[serde(default)]
    published: String,
    #[serde(default)]
    updated: String,
    categories: Vec<String>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    journal_ref: Option<String>,
    #[serde(default)]
    doi: Option<String>,
}

impl TryFrom<PaperData> for Paper {
    type Error = ArxivError;

    fn try_from(data: PaperData) -> Result<Self, Self::Error> {
        let paper = Paper {
            id: data.id,
            title: data.title,
            authors: data.authors,
            r#abstract: data.r#abstract,
            pdf_url: data.pdf_url,
            published: data.published,
            updated: data.updated,
            categories: data.categories,
            comment: data.comment,
            journal_ref: data.journal_ref,
            doi: data.doi,
        };
        paper.validate()?;
        Ok(paper)
    }
}

impl Paper {
    fn validate(&self) -> Result<(), ArxivError> {
        if self.id.trim().is_empty() || self.title.trim().is_empty() {
            return Err(ArxivError::Validation(
                "Paper ID and title cannot be empty".to_string(),
            ));
        }
        if !is_valid_http_url(&self.pdf_url) {
            return Err(ArxivError::Validation(format!(
                "Invalid PDF URL for {}: '{}'",
                self.id, self.pdf_url
            )));
        }
        Ok(())
    }

    /// arXiv identifier, version suffix included when upstream sent one
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier with any `vN` version suffix removed
    pub fn base_id(&self) -> &str {
        crate::arxiv::strip_version(&self.id)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Author display names in upstream order
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn r#abstract(&self) -> &str {
        &self.r#abstract
    }

    pub fn pdf_url(&self) -> &str {
        &self.pdf_url
    }

    /// Publication timestamp (ISO-8601), empty when upstream omitted it
    pub fn published(&self) -> &str {
        &self.published
    }

    /// Last-updated timestamp (ISO-8601), empty when upstream omitted it
    pub fn updated(&self) -> &str {
        &self.updated
    }

    /// Category codes in upstream order
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn journal_ref(&self) -> Option<&str> {
        self.journal_ref.as_deref()
    }

    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref()
    }

    /// Abstract page URL on arxiv.org
    pub fn abs_url(&self) -> String {
        format!("https://arxiv.org/abs/{}", self.id)
    }

    /// Authors joined for display
    pub fn authors_str(&self) -> String {
        self.authors.join(", ")
    }

    /// Categories joined for display
    pub fn categories_str(&self) -> String {
        self.categories.join(", ")
    }

    /// Abstract truncated to `max_chars` characters, with an ellipsis when cut
    pub fn short_abstract(&self, max_chars: usize) -> String {
        if self.r#abstract.chars().count() <= max_chars {
            return self.r#abstract.clone();
        }
        let cut: String = self.r#abstract.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }

    /// Publication year, if the published timestamp carries one
    pub fn year(&self) -> Option<&str> {
        self.published
            .get(..4)
            .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
    }
}

/// Check that a string is an absolute http(s) URL with a host
pub fn is_valid_http_url(candidate: &str) -> bool {
    match Url::parse(candidate.trim()) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// Builder for constructing validated Paper objects
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    data: PaperData,
}

impl PaperBuilder {
    /// Create a new builder with required fields
    pub fn new(id: impl Into<String>, title: impl Into<String>, pdf_url: impl Into<String>) -> Self {
        Self {
            data: PaperData {
                id: id.into(),
                title: title.into(),
                authors: Vec::new(),
                r#abstract: String::new(),
                pdf_url: pdf_url.into(),
                published: String::new(),
                updated: String::new(),
                categories: Vec::new(),
                comment: None,
                journal_ref: None,
                doi: None,
            },
        }
    }

    /// Set authors
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    /// Set abstract
    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.data.r#abstract = abstract_text.into();
        self
    }

    /// Set publication date
    pub fn published(mut self, date: impl Into<String>) -> Self {
        self.data.published = date.into();
        self
    }

    /// Set updated date
    pub fn updated(mut self, date: impl Into<String>) -> Self {
        self.data.updated = date.into();
        self
    }

    /// Set categories
    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.data.comment = Some(comment.into());
        self
    }

    pub fn journal_ref(mut self, journal_ref: impl Into<String>) -> Self {
        self.data.journal_ref = Some(journal_ref.into());
        self
    }

    /// Set DOI
    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.data.doi = Some(doi.into());
        self
    }

    /// Validate and build the Paper
    pub fn build(self) -> Result<Paper, ArxivError> {
        Paper::try_from(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PaperBuilder {
        PaperBuilder::new(
            "2301.00001v2",
            "Attention Is Not All You Need",
            "https://arxiv.org/pdf/2301.00001v2",
        )
    }

    #[test]
    fn test_paper_builder() {
        let paper = sample()
            .authors(["Jane Doe", "John Smith"])
            .abstract_text("We revisit attention.")
            .categories(["cs.AI", "cs.LG"])
            .published("2023-01-01T00:00:00Z")
            .doi("10.1234/test")
            .build()
            .unwrap();

        assert_eq!(paper.id(), "2301.00001v2");
        assert_eq!(paper.base_id(), "2301.00001");
        assert_eq!(paper.authors(), ["Jane Doe", "John Smith"]);
        assert_eq!(paper.categories_str(), "cs.AI, cs.LG");
        assert_eq!(paper.doi(), Some("10.1234/test"));
        assert_eq!(paper.year(), Some("2023"));
        assert_eq!(paper.abs_url(), "https://arxiv.org/abs/2301.00001v2");
        assert!(paper.comment().is_none());
    }

    #[test]
    fn test_empty_id_or_title_rejected() {
        let err = PaperBuilder::new("", "Title", "https://arxiv.org/pdf/1")
            .build()
            .unwrap_err();
        assert!(matches!(err, ArxivError::Validation(_)));

        let err = PaperBuilder::new("2301.00001", "   ", "https://arxiv.org/pdf/1")
            .build()
            .unwrap_err();
        assert!(matches!(err, ArxivError::Validation(_)));
    }

    #[test]
    fn test_invalid_pdf_url_rejected() {
        for url in ["", "ftp://arxiv.org/pdf/1", "arxiv.org/pdf/1", "http://", "not a url"] {
            let result = PaperBuilder::new("2301.00001", "Title", url).build();
            assert!(result.is_err(), "expected {url:?} to be rejected");
        }
    }

    #[test]
    fn test_short_abstract() {
        let paper = sample()
            .abstract_text("one two three four five")
            .build()
            .unwrap();
        assert_eq!(paper.short_abstract(100), "one two three four five");
        assert_eq!(paper.short_abstract(7), "one two...");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok = r#"{"id":"2301.00001","title":"T","authors":["A"],"abstract":"",
            "pdf_url":"http://arxiv.org/pdf/2301.00001","published":"","categories":[]}"#;
        let paper: Paper = serde_json::from_str(ok).unwrap();
        assert_eq!(paper.title(), "T");

        let bad_url = r#"{"id":"2301.00001","title":"T","authors":[],"abstract":"",
            "pdf_url":"/pdf/2301.00001","published":"","categories":[]}"#;
        assert!(serde_json::from_str::<Paper>(bad_url).is_err());

        let authors_not_list = r#"{"id":"2301.00001","title":"T","authors":"A, B","abstract":"",
            "pdf_url":"http://arxiv.org/pdf/2301.00001","published":"","categories":[]}"#;
        assert!(serde_json::from_str::<Paper>(authors_not_list).is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let paper = sample().authors(["A"]).journal_ref("JMLR 1").build().unwrap();
        let json = serde_json::to_string(&paper).unwrap();
        let back: Paper = serde_json::from_str(&json).unwrap();
        assert_eq!(paper, back);
    }
}

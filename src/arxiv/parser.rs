//! Atom feed parsing for arXiv API responses.
//!
//! The document as a whole must be well-formed with an Atom `<feed>` root,
//! otherwise parsing fails. Individual `<entry>` elements are converted
//! independently: an entry that is missing required data or fails [`Paper`]
//! validation is logged and skipped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::{debug, warn};

use crate::error::ArxivError;
use crate::models::{Paper, PaperBuilder};

/// Papers plus the OpenSearch paging fields of one feed
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    /// Successfully parsed entries, in document order
    pub papers: Vec<Paper>,
    pub total_results: Option<usize>,
    pub start_index: Option<usize>,
    pub items_per_page: Option<usize>,
    /// Number of entries dropped as malformed
    pub skipped: usize,
}

/// Parse a feed into papers, discarding paging metadata
pub fn parse(xml: &str) -> Result<Vec<Paper>, ArxivError> {
    parse_feed(xml).map(|feed| feed.papers)
}

/// Parse a feed, keeping paging metadata and the skip count
pub fn parse_feed(xml: &str) -> Result<ParsedFeed, ArxivError> {
    let mut reader = Reader::from_str(xml);

    let mut feed = ParsedFeed::default();
    let mut stack: Vec<String> = Vec::new();
    let mut seen_root = false;
    let mut entry: Option<EntryFields> = None;
    let mut feed_text = String::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            ArxivError::Parse(format!(
                "XML error at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(ref e) => {
                let name = local_name(e);
                if stack.is_empty() {
                    check_root(&name, seen_root)?;
                    seen_root = true;
                } else if stack.len() == 1 && name == "entry" {
                    entry = Some(EntryFields::default());
                } else if let Some(fields) = entry.as_mut() {
                    fields.open(&stack[2..], &name, e);
                }
                feed_text.clear();
                stack.push(name);
            }
            Event::Empty(ref e) => {
                let name = local_name(e);
                if stack.is_empty() {
                    check_root(&name, seen_root)?;
                    seen_root = true;
                    // Self-closing root: a feed with nothing in it.
                    continue;
                }
                if let Some(fields) = entry.as_mut() {
                    fields.open(&stack[2..], &name, e);
                }
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                handle_text(&stack, &mut entry, &mut feed_text, &text)?;
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                handle_text(&stack, &mut entry, &mut feed_text, &text)?;
            }
            Event::End(_) => {
                let name = stack.pop().unwrap_or_default();
                if stack.len() == 1 && name == "entry" {
                    if let Some(fields) = entry.take() {
                        match fields.finish() {
                            Ok(paper) => feed.papers.push(paper),
                            Err(reason) => {
                                warn!(reason = %reason, "Skipping malformed feed entry");
                                feed.skipped += 1;
                            }
                        }
                    }
                } else if stack.len() == 1 {
                    let value = feed_text.trim().parse::<usize>().ok();
                    match name.as_str() {
                        "totalResults" => feed.total_results = value,
                        "startIndex" => feed.start_index = value,
                        "itemsPerPage" => feed.items_per_page = value,
                        _ => {}
                    }
                }
                feed_text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(ArxivError::Parse("Document has no root element".to_string()));
    }
    if !stack.is_empty() {
        return Err(ArxivError::Parse(format!(
            "Unexpected end of document inside <{}>",
            stack.join("/")
        )));
    }

    debug!(
        parsed = feed.papers.len(),
        skipped = feed.skipped,
        total = ?feed.total_results,
        "Parsed arXiv feed"
    );
    Ok(feed)
}

fn check_root(name: &str, seen_root: bool) -> Result<(), ArxivError> {
    if seen_root {
        return Err(ArxivError::Parse("Multiple root elements".to_string()));
    }
    if name != "feed" {
        return Err(ArxivError::Parse(format!(
            "Expected Atom <feed> root, found <{}>",
            name
        )));
    }
    Ok(())
}

fn handle_text(
    stack: &[String],
    entry: &mut Option<EntryFields>,
    feed_text: &mut String,
    text: &str,
) -> Result<(), ArxivError> {
    if stack.is_empty() {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(ArxivError::Parse(
            "Text content outside of the root element".to_string(),
        ));
    }
    match entry.as_mut() {
        Some(fields) if stack.len() > 2 => fields.text(&stack[2..], text),
        Some(_) => {}
        None => feed_text.push_str(text),
    }
    Ok(())
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Raw values collected while walking one `<entry>`
#[derive(Debug, Default)]
struct EntryFields {
    id: Option<String>,
    title: String,
    summary: String,
    published: String,
    updated: String,
    authors: Vec<String>,
    categories: Vec<String>,
    pdf_url: Option<String>,
    comment: Option<String>,
    journal_ref: Option<String>,
    doi: Option<String>,
}

impl EntryFields {
    /// Element opened at `path` (relative to the entry) named `name`
    fn open(&mut self, path: &[String], name: &str, e: &BytesStart<'_>) {
        match (path, name) {
            ([], "category") => {
                if let Some(term) = attr(e, "term").filter(|t| !t.trim().is_empty()) {
                    self.categories.push(term);
                }
            }
            ([], "link") => {
                let is_pdf = attr(e, "type").as_deref() == Some("application/pdf");
                if is_pdf && self.pdf_url.is_none() {
                    self.pdf_url = attr(e, "href");
                }
            }
            ([], "id") => {
                self.id.get_or_insert_with(String::new);
            }
            ([parent], "name") if parent == "author" => self.authors.push(String::new()),
            _ => {}
        }
    }

    /// Text found under `path`, innermost element last
    fn text(&mut self, path: &[String], text: &str) {
        let names: Vec<&str> = path.iter().map(String::as_str).collect();
        let slot = match names.as_slice() {
            ["id"] => self.id.get_or_insert_with(String::new),
            ["title"] => &mut self.title,
            ["summary"] => &mut self.summary,
            ["published"] => &mut self.published,
            ["updated"] => &mut self.updated,
            ["author", "name"] => match self.authors.last_mut() {
                Some(name) => name,
                None => return,
            },
            ["comment"] => self.comment.get_or_insert_with(String::new),
            ["journal_ref"] => self.journal_ref.get_or_insert_with(String::new),
            ["doi"] => self.doi.get_or_insert_with(String::new),
            _ => return,
        };
        slot.push_str(text);
    }

    fn finish(self) -> Result<Paper, String> {
        let raw_id = self
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "entry has no <id>".to_string())?;
        let id = id_from_url(&raw_id);

        let pdf_url = self
            .pdf_url
            .map(|u| u.trim().to_string())
            .ok_or_else(|| format!("entry {} has no application/pdf link", id))?;

        let mut builder = PaperBuilder::new(id, collapse_whitespace(&self.title), pdf_url)
            .authors(
                self.authors
                    .iter()
                    .map(|a| collapse_whitespace(a))
                    .filter(|a| !a.is_empty()),
            )
            .abstract_text(collapse_whitespace(&self.summary))
            .published(self.published.trim())
            .updated(self.updated.trim())
            .categories(self.categories);

        if let Some(comment) = non_empty(self.comment) {
            builder = builder.comment(comment);
        }
        if let Some(journal_ref) = non_empty(self.journal_ref) {
            builder = builder.journal_ref(journal_ref);
        }
        if let Some(doi) = non_empty(self.doi) {
            builder = builder.doi(doi);
        }

        builder.build().map_err(|e| e.to_string())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| collapse_whitespace(&v))
        .filter(|v| !v.is_empty())
}

/// Identifier from an entry `<id>` URL
///
/// `http://arxiv.org/abs/hep-th/9901001v1` keeps its archive prefix, other
/// URLs yield their last path segment.
fn id_from_url(url: &str) -> String {
    if let Some(pos) = url.find("/abs/") {
        return url[pos + 5..].trim_end_matches('/').to_string();
    }
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}

/// Drop newlines and collapse whitespace runs to single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

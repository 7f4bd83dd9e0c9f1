//! Page record serialization
//!
//! Turns one page's extraction into the bytes each sink receives: an
//! `<article>` XML record for the text stream and tab-separated lines for
//! the link/category/redirect edge files.

use anyhow::Result;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::config::ExtractOptions;
use crate::extract::Extraction;
use crate::repair::repair_name;

/// Everything one page contributes to the output sinks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    /// Serialized `<article>` element plus trailing newline
    pub article: Option<Vec<u8>>,
    /// `SOURCE\tTARGET\n` lines for the links file
    pub links: Option<String>,
    /// `ARTICLE\tCATEGORY\n` lines for the categories file
    pub categories: Option<String>,
    /// `FROM\tTO\n` line for the redirects file
    pub redirect: Option<String>,
}

impl RecordSet {
    /// True when the page produced nothing for any sink.
    pub fn is_empty(&self) -> bool {
        self.article.is_none()
            && self.links.is_none()
            && self.categories.is_none()
            && self.redirect.is_none()
    }
}

/// Build the full record set for one extracted page.
pub fn page_records(
    id: &str,
    title: &str,
    extraction: &Extraction,
    options: ExtractOptions,
) -> Result<RecordSet> {
    let repaired_title = repair_name(title);
    let mut records = RecordSet::default();

    if options.links && !extraction.links.is_empty() {
        records.links = Some(edge_lines(&repaired_title, &extraction.links));
    }
    if options.categories && !extraction.categories.is_empty() {
        records.categories = Some(edge_lines(&repaired_title, &extraction.categories));
    }
    if options.redirects {
        if let Some(redirect) = &extraction.redirect {
            records.redirect = Some(format!("{repaired_title}\t{redirect}\n"));
        }
    }
    if options.text {
        if let Some(plain) = extraction.plain_text.as_deref() {
            let categories = options
                .references
                .then_some(extraction.categories.as_slice());
            records.article = Some(article_record(id, title, plain, categories)?);
        }
    }

    Ok(records)
}

/// Serialize one `<article>` element followed by a newline byte.
///
/// The optional `categories` child carries `<category target="..."/>`
/// fragments as escaped text content, not as nested elements.
pub fn article_record(
    id: &str,
    title: &str,
    text: &str,
    categories: Option<&[String]>,
) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Start(BytesStart::new("article")))?;
    write_text_element(&mut writer, "id", id)?;
    write_text_element(&mut writer, "title", title)?;
    write_text_element(&mut writer, "text", text)?;
    if let Some(categories) = categories.filter(|c| !c.is_empty()) {
        let fragments: String = categories
            .iter()
            .map(|name| format!("<category target=\"{name}\"/>"))
            .collect();
        write_text_element(&mut writer, "categories", &fragments)?;
    }
    writer.write_event(Event::End(BytesEnd::new("article")))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn edge_lines(source: &str, targets: &[String]) -> String {
    let mut lines = String::new();
    for target in targets {
        lines.push_str(source);
        lines.push('\t');
        lines.push_str(target);
        lines.push('\n');
    }
    lines
}

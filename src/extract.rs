//! MediaWiki markup extraction
//!
//! The rewrite cascade that turns one article body into plain text while
//! harvesting its links, categories and a possible redirect target. Rule
//! order is load-bearing: most patterns are only correct against a string the
//! earlier rules have already partially stripped.
//!
//! The four self-nesting constructs (templates, tables, image links, paired
//! tags) are handled by explicit scanners that peel one nesting level per
//! pass instead of regexes, so a malformed page cannot send the matcher into
//! catastrophic backtracking. A per-article deadline remains as a safety net.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::config::ExtractOptions;
use crate::languages::is_language_prefix;
use crate::repair::repair_name;

/// Default budget for the self-nesting rules, per article.
pub const RULE_BUDGET: Duration = Duration::from_secs(30);

/// Extraction failure. Handlers never surface errors for bad markup; the only
/// way extraction fails is by running out of its time budget.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The rewrite rules ran past the per-article deadline.
    #[error("rewrite rules exceeded their time budget")]
    RuleBudgetExceeded,
}

/// What one article body yielded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Plain text, present when text extraction is enabled
    pub plain_text: Option<String>,
    /// Repaired redirect target for `#REDIRECT` pages
    pub redirect: Option<String>,
    /// Repaired link targets, in order of appearance (duplicates kept)
    pub links: Vec<String>,
    /// Repaired category names, in order of appearance
    pub categories: Vec<String>,
}

// Comments, i.e. <!-- ... --> (the dump may carry either angle form)
static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(?:<|(?:&lt;))!--.*?--(?:>|(?:&gt;))").unwrap());

// Line break tags in all their spellings: <br>, </br>, <br />, &lt;BR&gt;
static BR_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)(?:<|(?:&lt;))/?(?:(?:br)|(?:BR)).*?/?\s*(?:>|(?:&gt;))").unwrap()
});

static BLOCKQUOTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)(?:<|(?:&lt;))blockquote(?:>|(?:&gt;))(.*?)(?:<|(?:&lt;))/blockquote(?:>|(?:&gt;))",
    )
    .unwrap()
});

// Html ascii decimal character references that survived the dump encoding
static DECIMAL_CHAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"&amp;#[0-9]+;").unwrap());

static TT_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)(?:<|(?:&lt;))(?:[tT]{2})(?:>|(?:&gt;))(.*?)(?:<|(?:&lt;))/(?:[tT]{2})(?:>|(?:&gt;))",
    )
    .unwrap()
});

// Self-closing tags, i.e. <abc asdaaa="aa" />
static SELF_CLOSING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(?:<|(?:&lt;))(.*?)/(?:>|(?:&gt;))").unwrap());

// Leftover tag soup after the paired and self-closing tags are gone
static TAG_SOUP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)(?:<|(?:&lt;))\s*/?\s*(?:div|center|p|small|b|sub|s|blockquote|font|ref|i|gallery|del|sicsic|sup|div\s.*?|noinclude|table|tr|tr\s.*?|li|hr|td|math)\s*/?\s*(?:>|(?:&gt;))",
    )
    .unwrap()
});

static CATEGORY_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\[\[(category:[^\[]*?)\]\]").unwrap());

// [[(http|https|ftp)://...] ...] or [(http|https|ftp)://...]
static HTTP_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)(?:\[\[(?:(?:http[s]?)|(?:ftp))://.*?\].*?\])|(?:\[(?:(?:http[s]?)|(?:ftp))://.*?\])",
    )
    .unwrap()
});

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[\[([^\[]*?)\]\]").unwrap());

// Leading whitespace/underscore/colon junk inside a reference
static REFERENCE_JUNK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s_]*:?[\s_]*").unwrap());

static REDIRECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)#redirect\s*\[\[(.*?)\]\]").unwrap());

static SPECIAL_MARK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"&(?:lt|gt|amp|quot);").unwrap());

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)'''.*?'''").unwrap());

static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)''.*?''").unwrap());

// Item list markers: "* ..." or "# ..." or ":; ..." or ":# ..."
static LIST_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[*#;:]+[ ]*").unwrap());

// Clusters of 2 or more whitespace characters
static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

static EMPTY_PARENS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\)").unwrap());

static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)={2,4}.*?={2,4}").unwrap());

static HEADING_MARKS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"=+[ ]*").unwrap());

/// Applies the rewrite cascade to article bodies.
///
/// Construction is cheap; the pattern table itself is compiled once per
/// process and shared read-only, so workers can each hold their own
/// `Extractor` without duplicating compiled state.
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    options: ExtractOptions,
    rule_budget: Duration,
}

impl Extractor {
    /// Create an extractor for the given harvest options.
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            rule_budget: RULE_BUDGET,
        }
    }

    /// Override the per-article rule budget.
    pub fn with_rule_budget(mut self, budget: Duration) -> Self {
        self.rule_budget = budget;
        self
    }

    /// The harvest options this extractor was built with.
    pub fn options(&self) -> ExtractOptions {
        self.options
    }

    /// Run the cascade over one article body.
    pub fn extract(&self, body: &str) -> Result<Extraction, ExtractError> {
        let opts = self.options;
        let mut result = Extraction::default();

        if starts_with_redirect(body) {
            if opts.redirects {
                result.redirect = Some(repair_name(redirect_target(body)));
                return Ok(result);
            }
            if opts.references {
                result.plain_text = Some(format!(
                    "<redirect target=\"{}\"/>",
                    redirect_target(body)
                ));
                return Ok(result);
            }
            // Neither sink wants it; the marker is stripped like any markup.
        }

        let deadline = Deadline::after(self.rule_budget);

        let mut text = COMMENT_RE.replace_all(body, "").into_owned();
        text = BR_TAG_RE.replace_all(&text, "").into_owned();
        text = rewrite_templates(&text, &deadline)?;
        text = rewrite_tables(&text, &deadline)?;
        text = rewrite_image_links(&text, &deadline)?;
        text = BLOCKQUOTE_RE.replace_all(&text, "$1").into_owned();
        text = decode_decimal_chars(&text);
        text = TT_TAG_RE.replace_all(&text, "$1").into_owned();
        text = rewrite_paired_tags(&text, &deadline)?;
        text = SELF_CLOSING_RE.replace_all(&text, "").into_owned();
        text = TAG_SOUP_RE.replace_all(&text, "").into_owned();

        if opts.text || opts.categories {
            text = self.collect_categories(&text, &mut result);
        }
        text = HTTP_LINK_RE
            .replace_all(&text, |caps: &Captures| external_link_text(&caps[0]))
            .into_owned();
        text = self.rewrite_references(&text, &mut result);

        if !opts.text {
            return Ok(result);
        }

        text = SPECIAL_MARK_RE
            .replace_all(&text, |caps: &Captures| decode_special_mark(&caps[0]))
            .into_owned();
        text = BOLD_RE
            .replace_all(&text, |caps: &Captures| {
                let m = &caps[0];
                m[3..m.len() - 3].to_string()
            })
            .into_owned();
        text = ITALIC_RE
            .replace_all(&text, |caps: &Captures| {
                let m = &caps[0];
                m[2..m.len() - 2].to_string()
            })
            .into_owned();
        text = LIST_MARKER_RE
            .replace_all(&text, |caps: &Captures| rewrite_list_markers(&caps[0]))
            .into_owned();
        text = WHITESPACE_RUN_RE.replace_all(&text, " ").into_owned();
        text = EMPTY_PARENS_RE.replace_all(&text, "").into_owned();
        text = HEADING_RE
            .replace_all(&text, |caps: &Captures| {
                HEADING_MARKS_RE.replace_all(&caps[0], "\n").into_owned()
            })
            .into_owned();

        result.plain_text = Some(text);
        Ok(result)
    }

    /// Cut `[[Category:...]]` links out of the text, collecting the repaired
    /// names when categories or inline references are wanted.
    fn collect_categories(&self, text: &str, result: &mut Extraction) -> String {
        let collect = self.options.references || self.options.categories;
        CATEGORY_LINK_RE
            .replace_all(text, |caps: &Captures| {
                if collect {
                    let inner = &caps[1];
                    let name = match inner.find('|') {
                        Some(pipe) => &inner[..pipe],
                        None => inner,
                    };
                    result.categories.push(repair_name(name));
                }
                String::new()
            })
            .into_owned()
    }

    /// Rewrite `[[target]]` / `[[target|label]]` references, collecting link
    /// targets and optionally keeping them inline as annotations.
    fn rewrite_references(&self, text: &str, result: &mut Extraction) -> String {
        let opts = self.options;
        REFERENCE_RE
            .replace_all(text, |caps: &Captures| {
                let raw = caps.get(1).map_or("", |m| m.as_str());
                // Categories are not references; leave them for the category
                // rule (which may be disabled on purpose).
                if raw
                    .get(..9)
                    .is_some_and(|p| p.eq_ignore_ascii_case("category:"))
                {
                    return caps[0].to_string();
                }
                let annotation = REFERENCE_JUNK_RE.replace(raw, "");
                let annotation = annotation.as_ref();

                if annotation.starts_with("http://") {
                    return String::new();
                }
                if let Some(colon) = annotation.find(':') {
                    if is_language_prefix(&annotation[..colon]) {
                        return String::new();
                    }
                }

                match annotation.find('|') {
                    None => {
                        if opts.links || opts.references {
                            result.links.push(repair_name(annotation));
                        }
                        if opts.references {
                            format!("<annotation target=\"{annotation}\">{annotation}</annotation>")
                        } else {
                            annotation.to_string()
                        }
                    }
                    Some(pipe) => {
                        let label = &annotation[pipe + 1..];
                        let link = repair_name(&annotation[..pipe]);
                        if opts.links || opts.references {
                            result.links.push(link.clone());
                        }
                        if opts.references {
                            format!("<annotation target=\"{link}\">{label}</annotation>")
                        } else {
                            label.to_string()
                        }
                    }
                }
            })
            .into_owned()
    }
}

/// True when the body opens with the case-insensitive `#REDIRECT` marker.
fn starts_with_redirect(body: &str) -> bool {
    body.get(..9)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("#redirect"))
}

/// The raw (unrepaired) redirect target; the whole body stands in when the
/// link is malformed.
fn redirect_target(body: &str) -> &str {
    REDIRECT_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map_or(body, |m| m.as_str())
}

/// Deadline shared by the self-nesting rules of one article.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    end: Instant,
}

impl Deadline {
    fn after(budget: Duration) -> Self {
        Self {
            end: Instant::now() + budget,
        }
    }

    fn check(&self) -> Result<(), ExtractError> {
        if Instant::now() >= self.end {
            Err(ExtractError::RuleBudgetExceeded)
        } else {
            Ok(())
        }
    }
}

/// Rewrite `{{ ... }}` templates, innermost first, until none remain.
///
/// Each pass rewrites every `{{`-to-`}}` span once; a span containing a
/// nested `{{` keeps its prefix so the next pass sees the now-innermost
/// template. `cquote`, `lang` and `main` templates contribute text, all
/// others are dropped.
fn rewrite_templates(text: &str, deadline: &Deadline) -> Result<String, ExtractError> {
    let mut text = text.to_string();
    loop {
        deadline.check()?;
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        let mut matched = false;
        while let Some(found) = text[pos..].find("{{") {
            let start = pos + found;
            let Some(close) = text[start + 2..].find("}}") else {
                break;
            };
            let end = start + 2 + close + 2;
            out.push_str(&text[pos..start]);
            out.push_str(&expand_template(&text[start..end]));
            matched = true;
            pos = end;
        }
        if !matched {
            return Ok(text);
        }
        out.push_str(&text[pos..]);
        text = out;
    }
}

/// Expand one matched `{{ ... }}` span (which may open with an outer template
/// and contain the start of a nested one).
fn expand_template(span: &str) -> String {
    // Offset of the deepest nested opener; 0 when the span is the template.
    let deepest = span.rfind("{{").unwrap_or(0);
    let prefix = &span[..deepest];
    let Some(pipe) = span[deepest..].find('|').map(|i| deepest + i) else {
        return prefix.to_string();
    };
    let name = &span[deepest + 2..pipe];
    let payload = &span[pipe + 1..span.len() - 2];
    match name {
        "cquote" => format!("{prefix}{payload}"),
        "lang" => match payload.rfind('|') {
            Some(sep) => format!("{prefix}{}", &payload[sep + 1..]),
            None => format!("{prefix}{payload}"),
        },
        "main" => format!("{prefix}Main article: {payload}"),
        _ => prefix.to_string(),
    }
}

/// Delete `{| ... |}` tables, peeling one nesting level per pass.
fn rewrite_tables(text: &str, deadline: &Deadline) -> Result<String, ExtractError> {
    let mut text = text.to_string();
    loop {
        deadline.check()?;
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        let mut nested = false;
        while let Some(found) = text[pos..].find("{|") {
            let start = pos + found;
            let Some(close) = text[start + 2..].find("|}") else {
                break;
            };
            let end = start + 2 + close + 2;
            let span = &text[start..end];
            out.push_str(&text[pos..start]);
            if let Some(inner) = span[2..].rfind("{|") {
                // Keep everything before the nested opener and go again.
                out.push_str(&span[..inner + 2]);
                nested = true;
            }
            pos = end;
        }
        out.push_str(&text[pos..]);
        if !nested {
            return Ok(out);
        }
        text = out;
    }
}

/// Delete `[[Image:...]]` / `[[File:...]]` links, peeling nested `[[...]]`
/// annotations one level per pass.
fn rewrite_image_links(text: &str, deadline: &Deadline) -> Result<String, ExtractError> {
    let mut text = text.to_string();
    loop {
        deadline.check()?;
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        let mut nested = false;
        while let Some(found) = text[pos..].find("[[") {
            let start = pos + found;
            let inner_start = start + 2;
            let Some(prefix_len) = image_prefix_len(&text[inner_start..]) else {
                // Not an image link; step past the first bracket and rescan.
                out.push_str(&text[pos..start + 1]);
                pos = start + 1;
                continue;
            };
            let Some(close) = text[inner_start + prefix_len..].find("]]") else {
                break;
            };
            let end = inner_start + prefix_len + close + 2;
            let span = &text[start..end];
            out.push_str(&text[pos..start]);
            if let Some(inner) = span[2..].rfind("[[") {
                out.push_str(&span[..inner + 2]);
                nested = true;
            }
            pos = end;
        }
        out.push_str(&text[pos..]);
        if !nested {
            return Ok(out);
        }
        text = out;
    }
}

/// Length of an `:?(Image|File):` prefix at the start of `rest`, if present.
fn image_prefix_len(rest: &str) -> Option<usize> {
    let (colon, rest) = match rest.strip_prefix(':') {
        Some(stripped) => (1, stripped),
        None => (0, rest),
    };
    for prefix in ["Image:", "File:"] {
        if rest.starts_with(prefix) {
            return Some(colon + prefix.len());
        }
    }
    None
}

/// Decode `&amp;#NNN;` decimal character references, except inside a `<tt>`
/// pair (which displays the mark as text and is handled later). Undecodable
/// references are deleted.
fn decode_decimal_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in DECIMAL_CHAR_RE.find_iter(text) {
        out.push_str(&text[last..found.start()]);
        if enclosed_in_tt(text, found.start(), found.end()) {
            out.push_str(found.as_str());
        } else {
            let digits = &found.as_str()["&amp;#".len()..found.as_str().len() - 1];
            if let Some(decoded) = digits.parse::<u32>().ok().and_then(char::from_u32) {
                out.push(decoded);
            }
        }
        last = found.end();
    }
    out.push_str(&text[last..]);
    out
}

fn enclosed_in_tt(text: &str, start: usize, end: usize) -> bool {
    let before = &text[..start];
    let after = &text[end..];
    ["<tt>", "<TT>", "&lt;tt&gt;", "&lt;TT&gt;"]
        .iter()
        .any(|tag| before.ends_with(tag))
        && ["</tt>", "</TT>", "&lt;/tt&gt;", "&lt;/TT&gt;"]
            .iter()
            .any(|tag| after.starts_with(tag))
}

/// Delete matched `<name ...>body</name>` pairs, peeling one nesting level
/// per pass: a pair whose body contains further openers of the same name is
/// replaced by that many copies of the opening tag, so the next pass sees
/// the now-innermost pair.
fn rewrite_paired_tags(text: &str, deadline: &Deadline) -> Result<String, ExtractError> {
    let mut text = text.to_string();
    loop {
        deadline.check()?;
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        let mut nested = false;
        let mut i = 0;
        while i < text.len() {
            let Some((open_end, name)) = match_opening_tag(&text, i) else {
                i += 1;
                continue;
            };
            deadline.check()?;
            let Some((close_start, close_end)) = find_closing_tag(&text, open_end, name) else {
                i += 1;
                continue;
            };
            let name = name.to_string();
            let opener = text[i..open_end].to_string();
            let inner_openers = count_openers(&text[open_end..close_start], &name);
            out.push_str(&text[pos..i]);
            for _ in 0..inner_openers {
                out.push_str(&opener);
                nested = true;
            }
            pos = close_end;
            i = close_end;
        }
        out.push_str(&text[pos..]);
        if !nested {
            return Ok(out);
        }
        text = out;
    }
}

/// `<` or `&lt;` at byte offset `i`; returns the token length.
fn open_angle(bytes: &[u8], i: usize) -> Option<usize> {
    match bytes.get(i)? {
        b'<' => Some(1),
        b'&' if bytes[i..].starts_with(b"&lt;") => Some(4),
        _ => None,
    }
}

/// `>` or `&gt;` at byte offset `i`; returns the token length.
fn close_angle(bytes: &[u8], i: usize) -> Option<usize> {
    match bytes.get(i)? {
        b'>' => Some(1),
        b'&' if bytes[i..].starts_with(b"&gt;") => Some(4),
        _ => None,
    }
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Try to match an opening tag (`<` junk-free attrs `>`) at `start`.
/// Self-closing tags never match because `/` may not appear before the
/// closing angle. Returns the end offset and the tag name.
fn match_opening_tag(text: &str, start: usize) -> Option<(usize, &str)> {
    let bytes = text.as_bytes();
    let mut i = start + open_angle(bytes, start)?;
    i = skip_whitespace(bytes, i);
    let name_start = i;
    let mut name_end = i;
    for c in text[i..].chars() {
        if c.is_alphanumeric() || c == '_' {
            name_end += c.len_utf8();
        } else {
            break;
        }
    }
    if name_end == name_start {
        return None;
    }
    let mut j = name_end;
    loop {
        if let Some(len) = close_angle(bytes, j) {
            return Some((j + len, &text[name_start..name_end]));
        }
        match bytes.get(j) {
            None | Some(&b'/') => return None,
            Some(_) => j += 1,
        }
    }
}

/// Case-insensitive match of `name` at byte offset `at`; returns the offset
/// past it.
fn eat_name_ci(text: &str, at: usize, name: &str) -> Option<usize> {
    let mut pos = at;
    for expected in name.chars() {
        let actual = text.get(pos..)?.chars().next()?;
        if !actual.eq_ignore_ascii_case(&expected) {
            return None;
        }
        pos += actual.len_utf8();
    }
    Some(pos)
}

/// Find the first `</ name >` closing tag for `name` at or after `from`.
/// Returns the (start, end) offsets of the closing tag.
fn find_closing_tag(text: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if let Some(open_len) = open_angle(bytes, i) {
            let mut j = skip_whitespace(bytes, i + open_len);
            if bytes.get(j) == Some(&b'/') {
                j = skip_whitespace(bytes, j + 1);
                if let Some(after_name) = eat_name_ci(text, j, name) {
                    let k = skip_whitespace(bytes, after_name);
                    if let Some(close_len) = close_angle(bytes, k) {
                        return Some((i, k + close_len));
                    }
                }
            }
        }
        i += 1;
    }
    None
}

/// Count non-self-closing `<name ...>` openers inside `body`.
fn count_openers(body: &str, name: &str) -> usize {
    let bytes = body.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        let Some(open_len) = open_angle(bytes, i) else {
            i += 1;
            continue;
        };
        let j = skip_whitespace(bytes, i + open_len);
        let Some(after_name) = eat_name_ci(body, j, name) else {
            i += 1;
            continue;
        };
        // First closing angle not directly preceded by '/', so that
        // self-closing openers don't count.
        let mut k = skip_whitespace(bytes, after_name);
        let mut matched = None;
        while k < bytes.len() {
            if let Some(close_len) = close_angle(bytes, k) {
                if k == 0 || bytes[k - 1] != b'/' {
                    matched = Some(k + close_len);
                    break;
                }
            }
            k += 1;
        }
        match matched {
            Some(end) => {
                count += 1;
                i = end;
            }
            None => i += 1,
        }
    }
    count
}

/// Keep the display text of an external `[http://... text]` reference
/// (and the tail of the `[[http://...] ...]` double form).
fn external_link_text(span: &str) -> String {
    let Some(space) = span.find(' ') else {
        return String::new();
    };
    let bracket = span.find(']').unwrap_or(span.len() - 1);
    let mut out = String::new();
    if space + 1 <= bracket {
        out.push_str(&span[space + 1..bracket]);
    }
    if bracket + 1 < span.len() {
        out.push_str(&span[bracket + 1..span.len() - 1]);
    }
    out
}

fn decode_special_mark(mark: &str) -> String {
    match mark {
        "&lt;" => "<",
        "&gt;" => ">",
        "&amp;" => "&",
        "&quot;" => "\"",
        _ => "",
    }
    .to_string()
}

/// Replace item-list markers: `*` and `#` become tabs, spaces and `:`/`;`
/// are dropped, the leading newline stays.
fn rewrite_list_markers(span: &str) -> String {
    span.chars()
        .filter_map(|c| match c {
            '*' | '#' => Some('\t'),
            ' ' | ':' | ';' => None,
            other => Some(other),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_only() -> Extractor {
        Extractor::new(ExtractOptions::default())
    }

    fn with_links() -> Extractor {
        Extractor::new(ExtractOptions::default().with_links(true))
    }

    fn plain(extractor: &Extractor, body: &str) -> String {
        extractor
            .extract(body)
            .expect("extraction failed")
            .plain_text
            .expect("no plain text")
    }

    #[test]
    fn test_empty_body() {
        let result = text_only().extract("").unwrap();
        assert_eq!(result.plain_text.as_deref(), Some(""));
        assert!(result.links.is_empty());
        assert!(result.categories.is_empty());
        assert!(result.redirect.is_none());
    }

    #[test]
    fn test_bold_stripped() {
        assert_eq!(plain(&text_only(), "Hello '''world'''."), "Hello world.");
    }

    #[test]
    fn test_italic_stripped() {
        assert_eq!(plain(&text_only(), "an ''italic'' word"), "an italic word");
    }

    #[test]
    fn test_piped_link_keeps_label_and_collects_target() {
        let result = with_links().extract("See [[Foo|foos]].").unwrap();
        assert_eq!(result.plain_text.as_deref(), Some("See foos."));
        assert_eq!(result.links, vec!["Foo"]);
    }

    #[test]
    fn test_self_link_with_references() {
        let extractor = Extractor::new(ExtractOptions::default().with_references(true));
        let result = extractor.extract("See [[Foo]].").unwrap();
        assert_eq!(
            result.plain_text.as_deref(),
            Some("See <annotation target=\"Foo\">Foo</annotation>.")
        );
        assert_eq!(result.links, vec!["Foo"]);
    }

    #[test]
    fn test_piped_link_with_references_repairs_target() {
        let extractor = Extractor::new(ExtractOptions::default().with_references(true));
        let result = extractor.extract("[[Some page|text]]").unwrap();
        assert_eq!(
            result.plain_text.as_deref(),
            Some("<annotation target=\"Some_page\">text</annotation>")
        );
        assert_eq!(result.links, vec!["Some_page"]);
    }

    #[test]
    fn test_interwiki_link_elided() {
        let result = with_links().extract("[[de:Berlin]] Start.").unwrap();
        assert_eq!(result.plain_text.as_deref(), Some(" Start."));
        assert!(result.links.is_empty());
    }

    #[test]
    fn test_http_self_reference_deleted() {
        assert_eq!(plain(&text_only(), "[[http://x.org/page]]"), "");
    }

    #[test]
    fn test_lang_template() {
        assert_eq!(
            plain(&text_only(), "{{lang|de|Berlin}} is a city."),
            "Berlin is a city."
        );
    }

    #[test]
    fn test_main_template() {
        assert_eq!(
            plain(&text_only(), "{{main|History of anarchism}}"),
            "Main article: History of anarchism"
        );
    }

    #[test]
    fn test_cquote_template() {
        assert_eq!(plain(&text_only(), "{{cquote|Kant is real}}"), "Kant is real");
    }

    #[test]
    fn test_unknown_template_dropped() {
        assert_eq!(plain(&text_only(), "x{{Infobox|a=1|b=2}}y"), "xy");
        assert_eq!(plain(&text_only(), "x{{reflist}}y"), "xy");
    }

    #[test]
    fn test_nested_templates_terminate() {
        assert_eq!(plain(&text_only(), "{{a|{{b|{{c|x}}}}}}"), "");
    }

    #[test]
    fn test_tables_deleted_including_nested() {
        assert_eq!(plain(&text_only(), "a{|bad table|}b"), "ab");
        assert_eq!(plain(&text_only(), "a{|x{|inner|}y|}b"), "ab");
    }

    #[test]
    fn test_image_links_deleted() {
        assert_eq!(plain(&text_only(), "a[[Image:pic.jpg|thumb]]b"), "ab");
        assert_eq!(plain(&text_only(), "a[[:File:x.png]]b"), "ab");
    }

    #[test]
    fn test_image_with_nested_link() {
        let result = with_links()
            .extract("[[File:p.jpg|A [[house]] here]] end")
            .unwrap();
        // The nested annotation is consumed with the image, link and all.
        assert_eq!(result.plain_text.as_deref(), Some(" end"));
        assert!(result.links.is_empty());
    }

    #[test]
    fn test_comments_deleted_both_angle_forms() {
        assert_eq!(plain(&text_only(), "a<!-- hidden -->b"), "ab");
        assert_eq!(plain(&text_only(), "a&lt;!-- hidden --&gt;b"), "ab");
    }

    #[test]
    fn test_br_tags_deleted() {
        assert_eq!(plain(&text_only(), "a<br>b</br>c<br />d&lt;BR&gt;e"), "abcde");
    }

    #[test]
    fn test_blockquote_keeps_content() {
        assert_eq!(
            plain(&text_only(), "a <blockquote>quote</blockquote> b"),
            "a quote b"
        );
    }

    #[test]
    fn test_decimal_char_decoded() {
        assert_eq!(plain(&text_only(), "x&amp;#65;y"), "xAy");
    }

    #[test]
    fn test_bad_decimal_char_deleted() {
        assert_eq!(plain(&text_only(), "x&amp;#99999999;y"), "xy");
    }

    #[test]
    fn test_decimal_char_kept_inside_tt() {
        // The tt pair protects the mark from decoding; the later entity rule
        // still turns &amp; into a bare ampersand.
        assert_eq!(plain(&text_only(), "<tt>&amp;#65;</tt>"), "&#65;");
    }

    #[test]
    fn test_paired_tags_deleted() {
        assert_eq!(plain(&text_only(), "a<ref name=\"n\">cite</ref>b"), "ab");
        assert_eq!(plain(&text_only(), "a<div>x<div>y</div>z</div>b"), "ab");
        assert_eq!(plain(&text_only(), "a&lt;span&gt;x&lt;/span&gt;b"), "ab");
    }

    #[test]
    fn test_self_closing_tag_deleted() {
        assert_eq!(plain(&text_only(), "a<ref name=\"x\" />b"), "ab");
    }

    #[test]
    fn test_tag_soup_swept() {
        assert_eq!(plain(&text_only(), "a</i>b<hr>c"), "abc");
    }

    #[test]
    fn test_category_collected_and_cut() {
        let extractor = Extractor::new(ExtractOptions::default().with_categories(true));
        let result = extractor.extract("[[Category:Foo| ]]").unwrap();
        assert_eq!(result.plain_text.as_deref(), Some(""));
        assert_eq!(result.categories, vec!["Category:Foo"]);
    }

    #[test]
    fn test_category_ignored_without_sinks() {
        // Text wanted but categories not collected anywhere.
        let result = text_only().extract("x[[Category:Foo]]y").unwrap();
        assert_eq!(result.plain_text.as_deref(), Some("xy"));
        assert!(result.categories.is_empty());
    }

    #[test]
    fn test_external_link_keeps_text() {
        assert_eq!(
            plain(&text_only(), "see [http://example.org an example] ok"),
            "see an example ok"
        );
        assert_eq!(plain(&text_only(), "see [http://example.org] ok"), "see ok");
    }

    #[test]
    fn test_headings_become_newlines() {
        // Heading marks are rewritten after whitespace collapsing, so the
        // emitted newline is not folded into the one already following.
        assert_eq!(
            plain(&text_only(), "== History ==\nStuff"),
            "\nHistory \n\nStuff"
        );
    }

    #[test]
    fn test_list_markers_and_whitespace() {
        // Markers turn into tabs, which the whitespace rule then folds into
        // the surrounding newline.
        assert_eq!(plain(&text_only(), "Items:\n* one\n* two"), "Items: one two");
    }

    #[test]
    fn test_whitespace_clusters_collapse() {
        assert_eq!(plain(&text_only(), "a  b\n\n\nc"), "a b c");
    }

    #[test]
    fn test_empty_parens_deleted() {
        // Parens are cut after whitespace collapsing, so the seam keeps both
        // surrounding spaces.
        assert_eq!(plain(&text_only(), "Paris () is big"), "Paris  is big");
    }

    #[test]
    fn test_special_marks_decoded() {
        assert_eq!(plain(&text_only(), "a &lt;tag&gt; &amp; &quot;q&quot;"), "a <tag> & \"q\"");
    }

    #[test]
    fn test_redirect_captured() {
        let extractor = Extractor::new(
            ExtractOptions::default()
                .with_text(false)
                .with_redirects(true),
        );
        let result = extractor.extract("#REDIRECT [[Other Page]]").unwrap();
        assert_eq!(result.redirect.as_deref(), Some("Other_Page"));
        assert!(result.plain_text.is_none());
        assert!(result.links.is_empty());
        assert!(result.categories.is_empty());
    }

    #[test]
    fn test_redirect_case_insensitive() {
        let extractor = Extractor::new(ExtractOptions::default().with_redirects(true));
        let result = extractor.extract("#redirect [[target]]").unwrap();
        assert_eq!(result.redirect.as_deref(), Some("Target"));
    }

    #[test]
    fn test_redirect_annotation_with_references() {
        let extractor = Extractor::new(ExtractOptions::default().with_references(true));
        let result = extractor.extract("#REDIRECT [[Other Page]]").unwrap();
        assert_eq!(
            result.plain_text.as_deref(),
            Some("<redirect target=\"Other Page\"/>")
        );
        assert!(result.redirect.is_none());
    }

    #[test]
    fn test_redirect_sink_beats_references() {
        let extractor = Extractor::new(
            ExtractOptions::default()
                .with_redirects(true)
                .with_references(true),
        );
        let result = extractor.extract("#REDIRECT [[Other Page]]").unwrap();
        assert_eq!(result.redirect.as_deref(), Some("Other_Page"));
        assert!(result.plain_text.is_none());
    }

    #[test]
    fn test_redirect_marker_stripped_when_unwanted() {
        let result = text_only().extract("#REDIRECT [[Other Page]]").unwrap();
        assert_eq!(result.plain_text.as_deref(), Some("#REDIRECT Other Page"));
        assert!(result.redirect.is_none());
    }

    #[test]
    fn test_no_text_wanted_still_collects_links() {
        let extractor = Extractor::new(
            ExtractOptions::default()
                .with_text(false)
                .with_links(true),
        );
        let result = extractor.extract("See [[Foo]] and [[Bar|b]].").unwrap();
        assert!(result.plain_text.is_none());
        assert_eq!(result.links, vec!["Foo", "Bar"]);
    }

    #[test]
    fn test_duplicate_links_kept_in_order() {
        let result = with_links().extract("[[A]] [[B]] [[A]]").unwrap();
        assert_eq!(result.links, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_rule_budget_enforced() {
        let extractor = text_only().with_rule_budget(Duration::ZERO);
        let err = extractor.extract("{{a|{{b|x}}}}").unwrap_err();
        assert!(matches!(err, ExtractError::RuleBudgetExceeded));
    }

    #[test]
    fn test_deep_nesting_terminates() {
        let mut body = String::new();
        for _ in 0..100 {
            body.push_str("{{t|");
        }
        body.push('x');
        for _ in 0..100 {
            body.push_str("}}");
        }
        let result = text_only().extract(&body).unwrap();
        assert!(result.plain_text.is_some());
    }
}

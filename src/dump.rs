//! Dump driver
//!
//! Streams `<page>` elements out of a MediaWiki XML export, dispatches the
//! bodies to the extractor (inline, or across the worker pool) and sequences
//! the resulting records onto the output sinks in input order. Subtrees are
//! released as soon as their page is handled, so dumps orders of magnitude
//! larger than memory stream through.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Context, Result};
use bzip2::read::BzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use quick_xml::events::Event;
use quick_xml::Reader;
use unicode_normalization::UnicodeNormalization;

use crate::config::DriverConfig;
use crate::emit::RecordSet;
use crate::extract::Extractor;
use crate::pool::{process_page, PageJob, WorkerPool};

/// Set by the interrupt handler; the driver checks it at event boundaries
/// and shuts down cleanly.
pub static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// What a dump run accomplished.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    /// `<page>` elements consumed, including ones skipped in resume mode
    pub pages: u64,
    /// Articles extracted and written this run
    pub processed: u64,
    /// Articles skipped over in resume mode
    pub skipped: u64,
    /// True when the run ended on an interrupt
    pub interrupted: bool,
}

/// Stream the configured dump through extraction to the sinks.
pub fn run(config: &DriverConfig) -> Result<RunSummary> {
    let options = config.extract_options();
    let (input, input_size) = open_input(config)?;
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::with_capacity(1 << 20);

    if let Some(namespace) = read_root(&mut reader, &mut buf)? {
        tracing::debug!("dump namespace: {namespace}");
    }

    let mut sinks = Sinks::open(config)?;
    let extractor = Extractor::new(options);
    let pool = (config.jobs > 1).then(|| WorkerPool::new(config.jobs, options));
    let progress = make_progress(config, input_size);

    let mut summary = RunSummary::default();
    let mut batch: Vec<PageJob> = Vec::new();
    let mut in_page = false;
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut page = PageBuilder::default();

    loop {
        if INTERRUPTED.load(Ordering::SeqCst) {
            summary.interrupted = true;
            break;
        }
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if !in_page {
                    if local == b"page" {
                        in_page = true;
                        stack.clear();
                        page.reset();
                    }
                } else {
                    if stack.is_empty() {
                        // Only direct children count towards the
                        // single-title / single-id rule.
                        if local == b"title" {
                            page.title_count += 1;
                        } else if local == b"id" {
                            page.id_count += 1;
                        }
                    }
                    stack.push(local.to_vec());
                }
            }
            Ok(Event::End(e)) => {
                if in_page {
                    if stack.is_empty() {
                        let name = e.name();
                        if local_name(name.as_ref()) == b"page" {
                            in_page = false;
                            summary.pages += 1;
                            if summary.pages <= config.skip {
                                summary.skipped += 1;
                            } else if page.is_wellformed() {
                                let job = page.take_job();
                                match &pool {
                                    Some(pool) => {
                                        batch.push(job);
                                        if batch.len() >= pool.batch_capacity() {
                                            summary.processed += flush_batch(
                                                pool,
                                                &mut batch,
                                                &mut sinks,
                                                summary.pages,
                                            )?;
                                        }
                                    }
                                    None => {
                                        let records = process_page(&extractor, &job);
                                        sinks.write_records(&records).with_context(|| {
                                            sink_error_advice(summary.pages)
                                        })?;
                                        summary.processed += 1;
                                    }
                                }
                            }
                            if let Some(pb) = &progress {
                                if summary.pages % 1000 == 0 {
                                    pb.set_message(format!("{} articles", summary.pages));
                                }
                            }
                        }
                    } else {
                        stack.pop();
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if in_page {
                    if let Some(slot) = page.capture_slot(&stack) {
                        let text = e
                            .unescape()
                            .context("bad input file (malformed text content)")?;
                        slot.push_str(&text);
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if in_page {
                    if let Some(slot) = page.capture_slot(&stack) {
                        slot.push_str(&String::from_utf8_lossy(&e));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => bail!(
                "bad input file (not a wikidump): {error} at byte {}",
                reader.buffer_position()
            ),
        }
        if let Some(pb) = &progress {
            pb.set_position(reader.buffer_position() as u64);
        }
    }

    // Drain whatever was already enqueued, interrupt or not.
    if let Some(pool) = &pool {
        summary.processed += flush_batch(pool, &mut batch, &mut sinks, summary.pages)?;
    }
    sinks
        .flush()
        .with_context(|| sink_error_advice(summary.pages))?;

    if let Some(pb) = &progress {
        pb.finish_with_message(format!("{} articles", summary.processed));
    }

    if summary.interrupted {
        tracing::warn!(
            "prematurely aborted parsing; resume with -s {}",
            summary.pages
        );
    } else if config.skip > 0 && summary.pages <= config.skip {
        tracing::info!("whole wikidump skipped");
    }

    Ok(summary)
}

fn sink_error_advice(pages: u64) -> String {
    format!("I/O error on output sink (resume with -s {pages})")
}

/// Open the input stream, decompressing `.bz2` files transparently.
/// Returns the byte size when it is meaningful for progress reporting.
fn open_input(config: &DriverConfig) -> Result<(Box<dyn BufRead>, Option<u64>)> {
    match &config.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open input file {}", path.display()))?;
            let size = file.metadata().map(|m| m.len()).ok();
            let reader = BufReader::with_capacity(1 << 20, file);
            if path.extension().is_some_and(|ext| ext == "bz2") {
                // Positions reported by the reader are decompressed offsets,
                // useless against the compressed size.
                Ok((Box::new(BufReader::new(BzDecoder::new(reader))), None))
            } else {
                Ok((Box::new(reader), size))
            }
        }
        None => Ok((Box::new(BufReader::new(io::stdin())), None)),
    }
}

/// Consume events up to the root element, reject anything that is not a
/// `<mediawiki>` export and return its default namespace URI.
fn read_root<R: BufRead>(reader: &mut Reader<R>, buf: &mut Vec<u8>) -> Result<Option<String>> {
    loop {
        buf.clear();
        match reader.read_event_into(buf) {
            Ok(Event::Start(e)) => {
                let name = e.name();
                if local_name(name.as_ref()) != b"mediawiki" {
                    bail!("bad input file (not a wikidump), try -T for testing purposes");
                }
                let mut namespace = None;
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"xmlns" {
                        namespace = Some(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                }
                return Ok(namespace);
            }
            Ok(Event::Empty(_)) | Ok(Event::Eof) => {
                bail!("bad input file (not a wikidump), try -T for testing purposes")
            }
            Ok(_) => {}
            Err(error) => bail!("bad input file (not a wikidump): {error}"),
        }
    }
}

/// The element name with any namespace prefix stripped, which keeps the
/// driver agnostic to the dump's schema version and prefix choice.
fn local_name(qname: &[u8]) -> &[u8] {
    match qname.iter().rposition(|&b| b == b':') {
        Some(colon) => &qname[colon + 1..],
        None => qname,
    }
}

fn make_progress(config: &DriverConfig, input_size: Option<u64>) -> Option<ProgressBar> {
    let output_is_stdout = config.text && config.output.is_none();
    if config.quiet || config.input.is_none() || output_is_stdout {
        return None;
    }
    let pb = match input_size {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} bytes ({msg})",
                    )
                    .unwrap()
                    .progress_chars("█▉▊▋▌▍▎▏  "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap(),
            );
            pb
        }
    };
    pb.set_message("0 articles");
    Some(pb)
}

/// Ship one batch through the pool and write the records in order.
fn flush_batch(
    pool: &WorkerPool,
    batch: &mut Vec<PageJob>,
    sinks: &mut Sinks,
    pages: u64,
) -> Result<u64> {
    if batch.is_empty() {
        return Ok(0);
    }
    let jobs = std::mem::take(batch);
    let count = jobs.len() as u64;
    for records in pool.process_batch(jobs)? {
        sinks
            .write_records(&records)
            .with_context(|| sink_error_advice(pages))?;
    }
    Ok(count)
}

/// Accumulates one `<page>` subtree's worth of data.
#[derive(Debug, Default)]
struct PageBuilder {
    title: String,
    title_count: usize,
    id: String,
    id_count: usize,
    body: String,
}

impl PageBuilder {
    fn reset(&mut self) {
        self.title.clear();
        self.title_count = 0;
        self.id.clear();
        self.id_count = 0;
        self.body.clear();
    }

    /// Where text content at the current element path belongs, if anywhere:
    /// a direct `<title>` or `<id>` child, or `<revision>/<text>`.
    fn capture_slot(&mut self, stack: &[Vec<u8>]) -> Option<&mut String> {
        match stack.len() {
            1 if stack[0] == b"title" => Some(&mut self.title),
            1 if stack[0] == b"id" => Some(&mut self.id),
            2 if stack[0] == b"revision" && stack[1] == b"text" => Some(&mut self.body),
            _ => None,
        }
    }

    /// Pages must carry exactly one title and one id to be processed.
    fn is_wellformed(&self) -> bool {
        self.title_count == 1 && self.id_count == 1
    }

    /// Drain into a work item, normalizing the body to NFKD.
    fn take_job(&mut self) -> PageJob {
        let body: String = self.body.nfkd().collect();
        PageJob {
            title: std::mem::take(&mut self.title),
            id: std::mem::take(&mut self.id),
            body,
        }
    }
}

/// The output sinks, owned exclusively by the driver. Records are written in
/// a fixed order per page: links, categories, redirect, article.
struct Sinks {
    text: Option<Box<dyn Write>>,
    links: Option<BufWriter<File>>,
    categories: Option<BufWriter<File>>,
    redirects: Option<BufWriter<File>>,
}

impl Sinks {
    fn open(config: &DriverConfig) -> Result<Self> {
        let append = config.skip > 0;
        let text: Option<Box<dyn Write>> = if config.text {
            Some(match &config.output {
                Some(path) => Box::new(BufWriter::new(open_sink(path, append)?)),
                None => Box::new(BufWriter::new(io::stdout())),
            })
        } else {
            None
        };
        Ok(Self {
            text,
            links: open_edge_sink(config.links_file.as_deref(), append)?,
            categories: open_edge_sink(config.categories_file.as_deref(), append)?,
            redirects: open_edge_sink(config.redirects_file.as_deref(), append)?,
        })
    }

    fn write_records(&mut self, records: &RecordSet) -> io::Result<()> {
        if let (Some(sink), Some(lines)) = (self.links.as_mut(), records.links.as_ref()) {
            sink.write_all(lines.as_bytes())?;
        }
        if let (Some(sink), Some(lines)) = (self.categories.as_mut(), records.categories.as_ref())
        {
            sink.write_all(lines.as_bytes())?;
        }
        if let (Some(sink), Some(line)) = (self.redirects.as_mut(), records.redirect.as_ref()) {
            sink.write_all(line.as_bytes())?;
        }
        if let (Some(sink), Some(record)) = (self.text.as_mut(), records.article.as_ref()) {
            sink.write_all(record)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(sink) = self.text.as_mut() {
            sink.flush()?;
        }
        for sink in [&mut self.links, &mut self.categories, &mut self.redirects]
            .into_iter()
            .flatten()
        {
            sink.flush()?;
        }
        Ok(())
    }
}

fn open_sink(path: &Path, append: bool) -> Result<File> {
    let file = if append {
        OpenOptions::new().create(true).append(true).open(path)
    } else {
        File::create(path)
    };
    file.with_context(|| format!("failed to open output file {}", path.display()))
}

fn open_edge_sink(path: Option<&Path>, append: bool) -> Result<Option<BufWriter<File>>> {
    match path {
        Some(path) => Ok(Some(BufWriter::new(open_sink(path, append)?))),
        None => Ok(None),
    }
}

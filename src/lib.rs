//! # wikiplain
//!
//! Convert MediaWiki XML export dumps into plain text.
//!
//! This crate streams `<page>` records out of a dump (which can be orders of
//! magnitude larger than memory), strips the wiki markup from each article
//! body through an ordered cascade of rewrite rules, and writes one
//! `<article>` record per page, optionally alongside tab-separated edge
//! files of the links, category memberships and redirects it discovered on
//! the way.
//!
//! ## Quick Start
//!
//! ```bash
//! # Plain text from a dump, four workers
//! wikiplain -i enwiki-latest-pages-articles.xml.bz2 -o articles.xml -j 4
//!
//! # Just the link graph and the redirect map
//! wikiplain -i dump.xml -n -l links.edg -r redirects.edg
//! ```

pub mod config;
pub mod dump;
pub mod emit;
pub mod extract;
pub mod languages;
pub mod pool;
pub mod repair;

pub use config::{DriverConfig, ExtractOptions};
pub use extract::{ExtractError, Extraction, Extractor};
pub use repair::repair_name;

//! Run configuration

use std::path::PathBuf;

/// What the extractor should harvest from each article body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Produce plain text
    pub text: bool,
    /// Collect outgoing links
    pub links: bool,
    /// Collect category memberships
    pub categories: bool,
    /// Capture redirect targets
    pub redirects: bool,
    /// Keep links/categories/redirects inline as annotation markup
    pub references: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            text: true,
            links: false,
            categories: false,
            redirects: false,
            references: false,
        }
    }
}

impl ExtractOptions {
    /// Create options with defaults (text only)
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle plain text output
    pub fn with_text(mut self, text: bool) -> Self {
        self.text = text;
        self
    }

    /// Toggle link collection
    pub fn with_links(mut self, links: bool) -> Self {
        self.links = links;
        self
    }

    /// Toggle category collection
    pub fn with_categories(mut self, categories: bool) -> Self {
        self.categories = categories;
        self
    }

    /// Toggle redirect capture
    pub fn with_redirects(mut self, redirects: bool) -> Self {
        self.redirects = redirects;
        self
    }

    /// Toggle inline reference annotations
    pub fn with_references(mut self, references: bool) -> Self {
        self.references = references;
        self
    }
}

/// Configuration for one dump-processing run.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Input dump (None = stdin). Paths ending in `.bz2` are decompressed.
    pub input: Option<PathBuf>,
    /// Main output (None = stdout)
    pub output: Option<PathBuf>,
    /// Links edge file
    pub links_file: Option<PathBuf>,
    /// Categories edge file
    pub categories_file: Option<PathBuf>,
    /// Redirects edge file
    pub redirects_file: Option<PathBuf>,
    /// Skip this many leading articles and append to sinks
    pub skip: u64,
    /// Worker count (1 = sequential)
    pub jobs: usize,
    /// Suppress the progress meter
    pub quiet: bool,
    /// Produce plain text
    pub text: bool,
    /// Keep inline reference annotations
    pub references: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            links_file: None,
            categories_file: None,
            redirects_file: None,
            skip: 0,
            jobs: 1,
            quiet: false,
            text: true,
            references: false,
        }
    }
}

impl DriverConfig {
    /// Derive the extractor switches from the selected sinks.
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            text: self.text,
            links: self.links_file.is_some(),
            categories: self.categories_file.is_some(),
            redirects: self.redirects_file.is_some(),
            references: self.references,
        }
    }

    /// True when no output of any kind has been requested.
    pub fn nothing_to_do(&self) -> bool {
        !self.text
            && self.links_file.is_none()
            && self.categories_file.is_none()
            && self.redirects_file.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_text_only() {
        let opts = ExtractOptions::default();
        assert!(opts.text);
        assert!(!opts.links && !opts.categories && !opts.redirects && !opts.references);
    }

    #[test]
    fn test_extract_options_follow_sinks() {
        let config = DriverConfig {
            links_file: Some(PathBuf::from("links.edg")),
            text: false,
            ..Default::default()
        };
        let opts = config.extract_options();
        assert!(opts.links);
        assert!(!opts.text);
        assert!(!opts.categories);
    }

    #[test]
    fn test_nothing_to_do() {
        let config = DriverConfig {
            text: false,
            ..Default::default()
        };
        assert!(config.nothing_to_do());
        assert!(!DriverConfig::default().nothing_to_do());
    }
}

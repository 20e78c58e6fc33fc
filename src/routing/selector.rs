//! Field selector parsing.
//!
//! # Responsibilities
//! - Split the request path into `<name>[.<suffix>]`
//! - Decide the output format from the suffix
//!
//! # Design Decisions
//! - The lookup key is always the first dot-segment
//! - Only the literal suffixes `json` and `js` change the format; any other
//!   suffix is kept verbatim (it carries the port for `porttest`)

/// Output format requested through the path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Plain,
    Json,
    Js,
}

/// The parsed `<name>[.<suffix>]` path component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    name: String,
    suffix: Option<String>,
}

impl FieldSelector {
    /// Parse a request path such as `/ua.json` or `/porttest.22`.
    pub fn parse(path: &str) -> Self {
        let field = path.trim_start_matches('/');
        let mut segments = field.split('.');
        let name = segments.next().unwrap_or_default().to_string();
        let suffix = segments.next().map(str::to_string);
        Self { name, suffix }
    }

    /// The attribute or command key. Empty for the root path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The second dot-segment, verbatim.
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    pub fn format(&self) -> Format {
        match self.suffix() {
            Some("json") => Format::Json,
            Some("js") => Format::Js,
            _ => Format::Plain,
        }
    }

    /// Low-cardinality label for metrics: known names pass through.
    pub fn metric_label(&self) -> &'static str {
        const KNOWN: &[&str] = &[
            "ip",
            "port",
            "ua",
            "lang",
            "encoding",
            "method",
            "mime",
            "referer",
            "forwarded",
            "country_code",
            "host",
            "ifconfig_hostname",
            "all",
            "headers",
            "request",
            "porttest",
        ];
        if self.name.is_empty() {
            return "root";
        }
        KNOWN
            .iter()
            .find(|known| **known == self.name)
            .copied()
            .unwrap_or("unknown")
    }
}

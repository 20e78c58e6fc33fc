//! User-Agent classification.
//!
//! Command-line clients get terse plain-text answers; everything else is
//! treated as a browser and gets the HTML landing page.

/// Product tokens of known non-interactive clients. Matched case-sensitively.
const COMMAND_LINE_AGENTS: &[&str] = &[
    "curl",
    "HTTPie",
    "httpie-go",
    "Wget",
    "fetch libfetch",
    "Go",
    "Go-http-client",
    "ddclient",
    "Mikrotik",
    "xh",
    "WindowsPowerShell",
    "PowerShell",
];

/// Whether `user_agent` belongs to a command-line client.
///
/// Only the last space-separated segment is inspected, so agents that prefix
/// a browser-style product (PowerShell does) are still recognised by their
/// final `product/version` token.
pub fn is_command_line(user_agent: &str) -> bool {
    let last = match user_agent.rfind(' ') {
        Some(idx) => &user_agent[idx + 1..],
        None => user_agent,
    };
    let product = last.split_once('/').map_or(last, |(product, _)| product);

    !product.is_empty() && COMMAND_LINE_AGENTS.contains(&product)
}

//! The per-request attribute record and its bulk renderings.

use std::fmt;

use serde::{Serialize, Serializer};

/// Everything the service reports about one request.
///
/// Field order is the serialization order of the `all` views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestAttributes {
    pub ifconfig_hostname: String,
    pub ip: String,
    pub port: u16,
    pub ua: String,
    pub lang: String,
    pub encoding: String,
    pub method: String,
    pub mime: String,
    pub referer: String,
    pub forwarded: String,
    pub country_code: String,
    /// Reverse DNS name, or the IP string when no lookup ran or it failed.
    pub host: String,
}

/// A single attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeValue<'a> {
    Text(&'a str),
    Number(u16),
}

impl Serialize for AttributeValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttributeValue::Text(text) => serializer.serialize_str(text),
            AttributeValue::Number(number) => serializer.serialize_u16(*number),
        }
    }
}

impl fmt::Display for AttributeValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(text) => f.write_str(text),
            AttributeValue::Number(number) => write!(f, "{number}"),
        }
    }
}

impl RequestAttributes {
    /// Every attribute key, in serialization order.
    pub const KEYS: [&'static str; 12] = [
        "ifconfig_hostname",
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
    ];

    /// Look up one attribute by its key.
    pub fn get(&self, key: &str) -> Option<AttributeValue<'_>> {
        let text = match key {
            "ifconfig_hostname" => &self.ifconfig_hostname,
            "ip" => &self.ip,
            "port" => return Some(AttributeValue::Number(self.port)),
            "ua" => &self.ua,
            "lang" => &self.lang,
            "encoding" => &self.encoding,
            "method" => &self.method,
            "mime" => &self.mime,
            "referer" => &self.referer,
            "forwarded" => &self.forwarded,
            "country_code" => &self.country_code,
            "host" => &self.host,
            _ => return None,
        };
        Some(AttributeValue::Text(text))
    }

    /// Key/value pairs in serialization order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, AttributeValue<'_>)> {
        Self::KEYS
            .iter()
            .filter_map(move |key| self.get(key).map(|value| (*key, value)))
    }

    /// The plain-text `all` document: one `key: value` line per attribute.
    ///
    /// Values that would not survive as bare YAML scalars are emitted as
    /// double-quoted JSON strings, so the document stays machine readable.
    pub fn to_document(&self) -> String {
        let mut document = String::new();
        for (key, value) in self.entries() {
            document.push_str(key);
            document.push_str(": ");
            match value {
                AttributeValue::Text(text) if needs_quoting(text) => {
                    document.push_str(&quote(text));
                }
                other => document.push_str(&other.to_string()),
            }
            document.push('\n');
        }
        document
    }
}

fn needs_quoting(text: &str) -> bool {
    const INDICATORS: &[char] = &[
        '"', '\'', '{', '}', '[', ']', '*', '&', '!', '|', '>', '%', '@', '`', '#', '-', '?',
        ':', ',',
    ];

    text.is_empty()
        || text.trim() != text
        || text.starts_with(INDICATORS)
        || text.contains(": ")
        || text.contains(" #")
        || text.chars().any(char::is_control)
        || text.parse::<f64>().is_ok()
        || matches!(
            text.to_ascii_lowercase().as_str(),
            "true" | "false" | "null" | "yes" | "no" | "on" | "off" | "~"
        )
}

fn quote(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

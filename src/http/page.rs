//! Built-in HTML landing page for browsers.

use std::fmt::Write;

use crate::attributes::RequestAttributes;

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Render the landing page: one table row per attribute, each with the
/// `curl` command that fetches it.
pub fn landing(attributes: &RequestAttributes) -> String {
    let hostname = html_escape(&attributes.ifconfig_hostname);
    let ip = html_escape(&attributes.ip);

    let mut rows = String::new();
    for (key, value) in attributes.entries() {
        if key == "ifconfig_hostname" {
            continue;
        }
        let _ = write!(
            rows,
            "      <tr><th>{key}</th><td>{value}</td><td><code>curl {hostname}/{key}</code></td></tr>\n",
            value = html_escape(&value.to_string()),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>What is my IP address? | {hostname}</title>
  <style>
    body {{ font-family: sans-serif; max-width: 60em; margin: 2em auto; }}
    th {{ text-align: left; padding-right: 1em; }}
    td {{ padding-right: 1em; }}
    code {{ background: #f4f4f4; padding: 0 .3em; }}
  </style>
</head>
<body>
  <h1>{ip}</h1>
  <table>
{rows}  </table>
  <h2>Bulk</h2>
  <p><code>curl {hostname}/all</code> &middot; <code>curl {hostname}/all.json</code> &middot; <code>curl {hostname}/headers</code></p>
  <h2>Port test</h2>
  <p><code>curl {hostname}/porttest.&lt;port&gt;</code> checks whether this address accepts TCP connections on a port.</p>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes() -> RequestAttributes {
        RequestAttributes {
            ifconfig_hostname: "ifconfig.io".into(),
            ip: "198.51.100.4".into(),
            port: 51000,
            ua: "<script>alert(1)</script>".into(),
            lang: String::new(),
            encoding: String::new(),
            method: "GET".into(),
            mime: String::new(),
            referer: String::new(),
            forwarded: String::new(),
            country_code: String::new(),
            host: String::new(),
        }
    }

    #[test]
    fn lists_every_field_with_curl_example() {
        let page = landing(&attributes());
        assert!(page.contains("<h1>198.51.100.4</h1>"));
        for key in RequestAttributes::KEYS.iter().filter(|k| **k != "ifconfig_hostname") {
            assert!(page.contains(&format!("curl ifconfig.io/{key}")), "{key}");
        }
        assert!(page.contains("<td>51000</td>"));
    }

    #[test]
    fn values_are_escaped() {
        let page = landing(&attributes());
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }
}

//! Update-status XML rendering.

use std::fmt::Write as _;

/// Render the `gupdate` document advertising one hosted package.
///
/// `prodversionmin` is emitted only when `minimum_version` is given.
pub fn render_update_document(
    identifier: &str,
    codebase: &str,
    version: &str,
    minimum_version: Option<&str>,
) -> String {
    let mut xml = String::from("<?xml version='1.0' encoding='UTF-8'?>\n");
    xml.push_str("<gupdate protocol='2.0'>");
    let _ = write!(xml, "<app appid='{}'>", escape_attr(identifier));
    let _ = write!(
        xml,
        "<updatecheck codebase='{}' version='{}'",
        escape_attr(codebase),
        escape_attr(version)
    );
    if let Some(min) = minimum_version {
        let _ = write!(xml, " prodversionmin='{}'", escape_attr(min));
    }
    xml.push_str("/></app></gupdate>\n");
    xml
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

//! Naming downloaded files.
//!
//! Preference order: the `Content-Disposition` header (RFC 5987
//! `filename*` first, then `filename`), then the item title with an
//! extension inferred from the MIME type, then `template-{id}.bin`.
//! A header name without an extension gets one from the MIME type, or
//! `.bin`.

use std::path::Path;

use counsel_core::LineItem;

/// Characters that are not allowed in a saved file name.
const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Split a header value into `(name, value)` parameters, honouring quotes.
fn parameters(header: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = header.chars().peekable();

    // Skip the disposition type (`attachment`, `inline`).
    for c in chars.by_ref() {
        if c == ';' {
            break;
        }
    }

    loop {
        let mut name = String::new();
        for c in chars.by_ref() {
            if c == '=' {
                break;
            }
            name.push(c);
        }
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            break;
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
            }
        } else {
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
                value.push(c);
            }
            value = value.trim().to_string();
        }

        params.push((name, value));
        if chars.peek().is_none() {
            break;
        }
    }

    params
}

/// Decode an RFC 5987 extended value (`charset'lang'percent-encoded`).
fn decode_extended(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;

    if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("iso-8859-1") {
        return None;
    }
    urlencoding::decode(encoded).ok().map(|s| s.into_owned())
}

/// The file name a `Content-Disposition` header asks for, if any.
#[must_use]
pub fn from_content_disposition(header: &str) -> Option<String> {
    let params = parameters(header);

    let extended = params
        .iter()
        .find(|(name, _)| name == "filename*")
        .and_then(|(_, value)| decode_extended(value));

    extended
        .or_else(|| {
            params
                .iter()
                .find(|(name, _)| name == "filename")
                .map(|(_, value)| value.clone())
        })
        .and_then(|name| sanitize(&name))
}

/// A file extension for a MIME type, ignoring parameters such as `charset`.
#[must_use]
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let ext = match essence.as_str() {
        "application/pdf" => "pdf",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        "application/vnd.ms-powerpoint" => "ppt",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => "pptx",
        "application/vnd.oasis.opendocument.text" => "odt",
        "application/rtf" | "text/rtf" => "rtf",
        "application/zip" | "application/x-zip-compressed" => "zip",
        "application/json" => "json",
        "text/plain" => "txt",
        "text/csv" => "csv",
        "text/markdown" => "md",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        _ => return None,
    };
    Some(ext)
}

/// Reduce a suggested name to a safe single path component.
///
/// Returns `None` when nothing usable is left.
#[must_use]
pub fn sanitize(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_control() || FORBIDDEN.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').trim();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Pick the name to save a download under.
#[must_use]
pub fn resolve(
    item: &LineItem,
    content_disposition: Option<&str>,
    content_type: Option<&str>,
) -> String {
    if let Some(name) = content_disposition.and_then(from_content_disposition) {
        if Path::new(&name).extension().is_some() {
            return name;
        }
        let ext = content_type.and_then(extension_for_mime).unwrap_or("bin");
        return format!("{name}.{ext}");
    }

    let stem = sanitize(item.title()).unwrap_or_else(|| format!("template-{}", item.id()));
    match content_type.and_then(extension_for_mime) {
        Some(ext) => format!("{stem}.{ext}"),
        None => format!("template-{}.bin", item.id()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use counsel_core::{CurrencyCode, ItemId, Price};

    fn item(title: &str) -> LineItem {
        LineItem::standard(
            ItemId::parse("t1").unwrap(),
            title,
            "Contracts",
            Price::zero(CurrencyCode::INR),
        )
    }

    #[test]
    fn test_quoted_filename() {
        assert_eq!(
            from_content_disposition(r#"attachment; filename="Rental Agreement.docx""#).as_deref(),
            Some("Rental Agreement.docx")
        );
    }

    #[test]
    fn test_bare_filename() {
        assert_eq!(
            from_content_disposition("attachment; filename=nda.pdf").as_deref(),
            Some("nda.pdf")
        );
    }

    #[test]
    fn test_extended_filename_wins() {
        let header = r#"attachment; filename="fallback.pdf"; filename*=UTF-8''Vertrag%20%C3%BCber.pdf"#;
        assert_eq!(
            from_content_disposition(header).as_deref(),
            Some("Vertrag über.pdf")
        );
    }

    #[test]
    fn test_quoted_semicolon_and_escape() {
        assert_eq!(
            from_content_disposition(r#"attachment; filename="a;b \"c\".txt""#).as_deref(),
            Some("a;b _c_.txt")
        );
    }

    #[test]
    fn test_path_components_stripped() {
        assert_eq!(
            from_content_disposition(r#"attachment; filename="../../etc/passwd""#).as_deref(),
            Some("passwd")
        );
        assert_eq!(from_content_disposition("attachment; filename=\"..\""), None);
    }

    #[test]
    fn test_mime_fallback() {
        assert_eq!(
            resolve(&item("Rent Deed"), Some("attachment"), Some("application/pdf")),
            "Rent Deed.pdf"
        );
        assert_eq!(
            resolve(&item("Sheet"), None, Some("text/csv; charset=utf-8")),
            "Sheet.csv"
        );
    }

    #[test]
    fn test_generic_fallback() {
        assert_eq!(
            resolve(&item("Deed"), None, Some("application/octet-stream")),
            "template-t1.bin"
        );
        assert_eq!(resolve(&item(""), None, None), "template-t1.bin");
    }

    #[test]
    fn test_header_name_without_extension_gets_one() {
        let header = Some(r#"attachment; filename="contract""#);
        assert_eq!(
            resolve(&item("Contract"), header, Some("application/pdf")),
            "contract.pdf"
        );
        assert_eq!(resolve(&item("Contract"), header, None), "contract.bin");
        let named = Some("attachment; filename=nda.docx");
        assert_eq!(
            resolve(&item("Contract"), named, Some("application/pdf")),
            "nda.docx"
        );
    }
}

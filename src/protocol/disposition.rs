//! `Content-Disposition` values for document downloads (RFC 6266 with the
//! RFC 5987 `filename*` extension).

use crate::protocol::key_codec::encode_name;

/// ASCII filename used when nothing printable survives the fallback filter.
pub const FALLBACK_DOWNLOAD_NAME: &str = "download.pdf";

/// Build `attachment; filename="<ascii>"; filename*=UTF-8''<pct>`.
///
/// Agents that understand `filename*` show the real Unicode name, older ones
/// use the ASCII form. Non-ASCII characters are dropped from the ASCII form,
/// not transliterated.
pub fn build_content_disposition(original_name: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback(original_name),
        encode_name(original_name)
    )
}

fn ascii_fallback(original_name: &str) -> String {
    let mut fallback = String::with_capacity(original_name.len());
    for c in original_name.chars() {
        match c {
            '"' | '\\' => {
                fallback.push('\\');
                fallback.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => fallback.push(c),
            _ => {}
        }
    }

    if fallback.is_empty() {
        FALLBACK_DOWNLOAD_NAME.to_string()
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn ascii_names_pass_through() {
        assert_eq!(
            build_content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\"; filename*=UTF-8''report.pdf"
        );
    }

    #[test]
    fn accented_names_drop_non_ascii() {
        assert_eq!(
            build_content_disposition("résumé.pdf"),
            "attachment; filename=\"rsum.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
    }

    #[test]
    fn fully_non_ascii_names_use_fixed_fallback() {
        let value = build_content_disposition("报告");
        assert_eq!(
            value,
            "attachment; filename=\"download.pdf\"; filename*=UTF-8''%E6%8A%A5%E5%91%8A"
        );
    }

    #[test]
    fn quotes_and_controls_keep_header_valid() {
        let value = build_content_disposition("a\"b\tc\n.pdf");
        assert!(value.starts_with("attachment; filename=\"a\\\"bc.pdf\"; "));
        assert!(value.ends_with("filename*=UTF-8''a%22b%09c%0A.pdf"));
        assert!(HeaderValue::from_str(&value).is_ok());
    }

    #[test]
    fn spaces_are_encoded_in_extended_form() {
        let value = build_content_disposition("report 报告.pdf");
        assert!(value.contains("filename=\"report .pdf\""));
        assert!(value.contains("filename*=UTF-8''report%20%E6%8A%A5%E5%91%8A.pdf"));
        assert!(HeaderValue::from_str(&value).is_ok());
    }
}

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: &'static str,
    /// Invalid sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

/// Decode a fetched body to UTF-8 text.
///
/// Encoding is picked from the BOM, then the Content-Type charset, then
/// chardetng (with UTF-8 allowed as a guess). Decoding never fails; callers
/// decide whether `had_errors` is worth a warning.
pub fn decode_text(bytes: &[u8], content_type: Option<&str>) -> DecodedText {
    if bytes.is_empty() {
        return DecodedText {
            text: String::new(),
            encoding_label: encoding_rs::UTF_8.name(),
            had_errors: false,
        };
    }

    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(&bytes[bom_len..], encoding);
    }

    if let Some(enc) = content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, enc);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\''].as_ref()))
    })
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedText {
    let (text, had_errors) = enc.decode_without_bom_handling(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding_label: enc.name(),
        had_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_parameter_is_case_insensitive() {
        assert_eq!(charset_param("text/css; Charset=\"latin1\""), Some("latin1"));
        assert_eq!(charset_param("text/css"), None);
    }

    #[test]
    fn header_charset_drives_decoding() {
        let decoded = decode_text(b"caf\xe9", Some("text/css; charset=iso-8859-1"));
        assert_eq!(decoded.text, "café");
        assert_eq!(decoded.encoding_label, "windows-1252");
        assert!(!decoded.had_errors);
    }

    #[test]
    fn bom_is_stripped() {
        let decoded = decode_text(b"\xEF\xBB\xBFbody{}", None);
        assert_eq!(decoded.text, "body{}");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let decoded = decode_text(b"ok \xff!", Some("text/javascript; charset=utf-8"));
        assert_eq!(decoded.text, "ok \u{FFFD}!");
        assert!(decoded.had_errors);
    }
}

//! Canonical URL normalization for citation/registry/evidence equality.
//!
//! Cosmetic differences between two spellings of the same URL must not read
//! as a binding mismatch. Unparsable input passes through unchanged so two
//! identical malformed strings still compare equal; validity is judged
//! elsewhere.

use url::Url;

/// Best-effort canonical form. Never errors, never panics.
pub fn normalize(raw: &str) -> String {
    let parsed = match Url::parse(raw.trim()) {
        Ok(u) => u,
        Err(_) => return raw.to_string(),
    };

    // The url crate already lowercases scheme and host and drops default
    // ports for known schemes; rebuild the rest by hand.
    let mut out = String::new();
    out.push_str(parsed.scheme());
    out.push_str("://");

    if !parsed.username().is_empty() {
        out.push_str(parsed.username());
        if let Some(pass) = parsed.password() {
            out.push(':');
            out.push_str(pass);
        }
        out.push('@');
    }

    if let Some(host) = parsed.host_str() {
        out.push_str(host);
    }
    if let Some(port) = parsed.port() {
        // Non-default port only; default ports came back as None.
        out.push(':');
        out.push_str(&port.to_string());
    }

    out.push_str(&normalize_path(parsed.path()));

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !pairs.is_empty() {
        pairs.sort();
        out.push('?');
        for (i, (k, v)) in pairs.iter().enumerate() {
            if i > 0 {
                out.push('&');
            }
            out.push_str(k);
            if !v.is_empty() {
                out.push('=');
                out.push_str(v);
            }
        }
    }

    // Fragments never identify distinct captures.
    out
}

pub fn equal(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn normalize_path(path: &str) -> String {
    let decoded = decode_unreserved(path);
    if decoded.len() > 1 && decoded.ends_with('/') {
        decoded[..decoded.len() - 1].to_string()
    } else {
        decoded
    }
}

/// Decode only %XX escapes whose decoded byte is an unreserved character;
/// anything else keeps its escaped spelling.
fn decode_unreserved(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = String::with_capacity(path.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = &path[i + 1..i + 3];
            if let Ok(b) = u8::from_str_radix(hex, 16) {
                if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
                    out.push(b as char);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_default_port() {
        assert_eq!(
            normalize("HTTP://Example.com:80/x/"),
            normalize("http://example.com/x")
        );
    }

    #[test]
    fn keeps_non_default_port() {
        assert_eq!(normalize("http://example.com:8080/x"), "http://example.com:8080/x");
    }

    #[test]
    fn strips_trailing_slash_except_root() {
        assert_eq!(normalize("https://a.com/x/"), "https://a.com/x");
        assert_eq!(normalize("https://a.com/"), "https://a.com/");
        assert_eq!(normalize("https://a.com"), "https://a.com/");
    }

    #[test]
    fn empty_query_is_dropped() {
        assert!(equal("https://a.com/x?", "https://a.com/x"));
    }

    #[test]
    fn query_pairs_sort_by_key_then_value() {
        assert!(equal("https://a.com/x?b=2&a=1", "https://a.com/x?a=1&b=2"));
        assert!(equal("https://a.com/x?a=2&a=1", "https://a.com/x?a=1&a=2"));
    }

    #[test]
    fn fragment_is_discarded() {
        assert!(equal("https://a.com/x#top", "https://a.com/x"));
    }

    #[test]
    fn decodes_unreserved_escapes_only() {
        assert!(equal("https://a.com/%61bc", "https://a.com/abc"));
        // %2F is a reserved slash; decoding it would change structure.
        let kept = normalize("https://a.com/a%2Fb");
        assert!(kept.contains("%2F"));
    }

    #[test]
    fn idempotent() {
        for raw in [
            "HTTP://Example.com:80/x/",
            "https://a.com/x?b=2&a=1#frag",
            "not a url at all",
            "https://a.com/%61bc",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn unparsable_passes_through() {
        assert_eq!(normalize("::::"), "::::");
        assert!(equal("::::", "::::"));
        assert!(!equal("::::", ":::"));
    }

    #[test]
    fn binding_example_from_three_spellings() {
        let citation = "https://a.com/x/";
        let registry = "https://A.com/x";
        let metadata = "https://a.com/x?";
        assert!(equal(citation, registry));
        assert!(equal(registry, metadata));
        assert!(!equal(citation, "https://a.com/y"));
    }
}

use encoding_rs::{Encoding, GB18030, GBK, UTF_8};

pub(crate) const ROOT_DIR: &str = "/";

/// Encodings tried when spelling the target directory the way a confused
/// server listing might show it: gbk, utf-8, cp936 (the GBK code page), gb18030.
fn legacy_encodings() -> [&'static Encoding; 4] {
    [GBK, UTF_8, GBK, GB18030]
}

/// Builds the ordered, duplicate-free list of directory names the prober
/// tries. The root is always the last entry.
pub(crate) fn generate_candidates(target: &str, aliases: &[String]) -> Vec<String> {
    let mut raw = vec![target.to_string()];

    for encoding in legacy_encodings() {
        if let Some(spelling) = reinterpret_as_latin1(target, encoding) {
            raw.push(spelling);
        }
    }

    raw.extend(aliases.iter().cloned());
    if let Some(encoded) = percent_encoded(target) {
        raw.push(encoded);
    }

    let name = target.trim_matches('/');
    if !name.is_empty() {
        raw.push(format!("/{name}/"));
        raw.push(format!("/{name}"));
        raw.push(format!("{name}/"));
        raw.push(name.to_string());
    }

    let mut unique: Vec<String> = Vec::with_capacity(raw.len() + 1);
    for path in raw {
        if path.is_empty() || path == ROOT_DIR || unique.contains(&path) {
            continue;
        }
        unique.push(path);
    }
    unique.push(ROOT_DIR.to_string());
    unique
}

/// Encodes `value` and reads every resulting byte back as one Latin-1
/// character. Returns `None` when the encoding cannot represent `value`.
pub(crate) fn reinterpret_as_latin1(value: &str, encoding: &'static Encoding) -> Option<String> {
    let (bytes, _, had_errors) = encoding.encode(value);
    if had_errors {
        return None;
    }
    Some(bytes.iter().map(|&byte| char::from(byte)).collect())
}

fn percent_encoded(target: &str) -> Option<String> {
    let mut segments = Vec::new();
    for segment in target.split('/') {
        let (bytes, _, had_errors) = GBK.encode(segment);
        if had_errors {
            return None;
        }
        segments.push(urlencoding::encode_binary(&bytes).into_owned());
    }
    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_aliases() -> Vec<String> {
        ["/nanAn/", "/NanAn/", "/NANAN/", "/nan_an/"]
            .iter()
            .map(|alias| alias.to_string())
            .collect()
    }

    #[test]
    fn chinese_target_yields_expected_order() {
        let candidates = generate_candidates("/南安/", &default_aliases());
        assert_eq!(
            candidates,
            vec![
                "/南安/".to_string(),
                "/\u{C4}\u{CF}\u{B0}\u{B2}/".to_string(),
                "/\u{E5}\u{8D}\u{97}\u{E5}\u{AE}\u{89}/".to_string(),
                "/nanAn/".to_string(),
                "/NanAn/".to_string(),
                "/NANAN/".to_string(),
                "/nan_an/".to_string(),
                "/%C4%CF%B0%B2/".to_string(),
                "/南安".to_string(),
                "南安/".to_string(),
                "南安".to_string(),
                "/".to_string(),
            ]
        );
    }

    #[test]
    fn candidates_are_unique_and_end_with_root() {
        for target in ["/南安/", "plain", "/", "", "/a/b/", "/emoji😀/"] {
            let candidates = generate_candidates(target, &default_aliases());
            assert!(!candidates.is_empty());
            assert_eq!(candidates.last().map(String::as_str), Some(ROOT_DIR));
            assert_eq!(
                candidates.iter().filter(|path| path.as_str() == ROOT_DIR).count(),
                1
            );
            let mut seen = std::collections::HashSet::new();
            assert!(candidates.iter().all(|path| seen.insert(path.clone())));
        }
    }

    #[test]
    fn unencodable_target_keeps_remaining_order() {
        // GBK cannot represent the emoji, so only UTF-8 and GB18030 spellings appear.
        let target = "/emoji😀/";
        let candidates = generate_candidates(target, &[]);
        let utf8 = reinterpret_as_latin1(target, UTF_8).unwrap();
        let gb18030 = reinterpret_as_latin1(target, GB18030).unwrap();
        assert!(reinterpret_as_latin1(target, GBK).is_none());
        assert_eq!(candidates[0], target);
        assert_eq!(candidates[1], utf8);
        assert_eq!(candidates[2], gb18030);
        assert_eq!(candidates.last().map(String::as_str), Some(ROOT_DIR));
    }

    #[test]
    fn root_alias_is_kept_as_final_fallback_only() {
        let aliases = vec!["/".to_string(), "/other/".to_string()];
        let candidates = generate_candidates("/docs/", &aliases);
        assert_eq!(candidates, vec!["/docs/", "/other/", "/docs", "docs/", "docs", "/"]);
    }

    #[test]
    fn root_target_collapses_to_root() {
        assert_eq!(generate_candidates("/", &[]), vec!["/".to_string()]);
    }

    #[test]
    fn percent_encoding_keeps_separators() {
        assert_eq!(percent_encoded("/南安/").as_deref(), Some("/%C4%CF%B0%B2/"));
        assert_eq!(percent_encoded("/a b/c").as_deref(), Some("/a%20b/c"));
        assert_eq!(percent_encoded("/emoji😀/"), None);
    }
}

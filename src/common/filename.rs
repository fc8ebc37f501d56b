/// Reduces a client supplied filename to a safe, flat ASCII name.
///
/// Path separators become spaces, whitespace runs collapse to `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped and leading/trailing `.`/`_` are
/// stripped. May return an empty string.
pub fn secure_filename(name: &str) -> String {
    let flattened: String = name
        .chars()
        .filter(|c| c.is_ascii())
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Lowercased text after the last dot, if any.
pub fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Text before the last dot, or the whole name when there is none.
pub fn stem_of(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

//! Case conventions shared by the generators.

/// First character upper-cased, the rest lower-cased.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Capitalize every `separator`-delimited part, e.g. `my\app` to `My\App`.
pub fn capitalize_parts(value: &str, separator: char) -> String {
    value
        .split(separator)
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

/// Capitalize each part of a PHP namespace.
pub fn namespace(value: &str) -> String {
    capitalize_parts(value, '\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_words() {
        assert_eq!(capitalize("contract"), "Contract");
        assert_eq!(capitalize("CONTRACT_wfl_base"), "Contract_wfl_base");
        assert_eq!(capitalize("élan"), "Élan");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn capitalizes_namespace_parts() {
        assert_eq!(namespace("acme\\LEGAL\\contracts"), "Acme\\Legal\\Contracts");
        assert_eq!(namespace("\\acme"), "\\Acme");
    }
}

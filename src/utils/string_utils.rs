/// Pure string processing utilities (Discord-agnostic)
use std::collections::HashMap;

/// Replace literal \n with actual newlines
pub fn process_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}

/// Collapse every run of whitespace into a single space
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut a string to at most `max` characters
pub fn limit(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Split text into chunks of at most `max_len` characters, breaking on `delimiter`.
///
/// A single line longer than `max_len` is hard-split.
pub fn divide_string(max_len: usize, delimiter: char, text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for piece in text.split_inclusive(delimiter) {
        let piece_len = piece.chars().count();

        if current_len + piece_len > max_len && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if piece_len > max_len {
            let chars: Vec<char> = piece.chars().collect();
            for chunk in chars.chunks(max_len) {
                parts.push(chunk.iter().collect());
            }
            continue;
        }

        current.push_str(piece);
        current_len += piece_len;
    }

    if !current.trim().is_empty() {
        parts.push(current);
    }

    parts
}

/// Parse `-key value` style arguments.
///
/// Words before the first flag are stored under the empty key. A flag followed
/// by another flag (or nothing) maps to an empty string.
pub fn parse_arguments(args: &[&str]) -> HashMap<String, String> {
    let mut options = HashMap::new();
    let mut current_key = String::new();
    let mut current_value: Vec<&str> = Vec::new();

    for arg in args {
        if let Some(key) = arg.strip_prefix('-').filter(|k| !k.is_empty() && !is_number(k)) {
            if !current_key.is_empty() || !current_value.is_empty() {
                options.insert(current_key.clone(), current_value.join(" "));
            }
            current_key = key.to_lowercase();
            current_value.clear();
        } else {
            current_value.push(arg);
        }
    }

    if !current_key.is_empty() || !current_value.is_empty() {
        options.insert(current_key, current_value.join(" "));
    }

    options
}

fn is_number(text: &str) -> bool {
    text.parse::<f64>().is_ok()
}

/// Check if a string contains only ASCII letters
pub fn is_letters_only(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphabetic())
}

/// Replace typographic single quotes with plain apostrophes
pub fn normalize_quotes(text: &str) -> String {
    text.replace(['\u{2019}', '\u{2018}'], "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_newlines() {
        assert_eq!(process_newlines("Hello\\nWorld"), "Hello\nWorld");
        assert_eq!(process_newlines("No newlines"), "No newlines");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  hello   world  "), "hello world");
        assert_eq!(normalize_whitespace("a\t\nb"), "a b");
        assert_eq!(normalize_whitespace("  "), "");
    }

    #[test]
    fn test_limit() {
        assert_eq!(limit("Hello World", 5), "Hello");
        assert_eq!(limit("Short", 10), "Short");
        assert_eq!(limit("héllo", 2), "hé");
    }

    #[test]
    fn test_divide_string_keeps_lines_together() {
        let text = "aaaa\nbbbb\ncccc\n";
        let parts = divide_string(10, '\n', text);
        assert_eq!(parts, vec!["aaaa\nbbbb\n", "cccc\n"]);
    }

    #[test]
    fn test_divide_string_hard_splits_long_lines() {
        let parts = divide_string(3, '\n', "abcdefg");
        assert_eq!(parts, vec!["abc", "def", "g"]);
    }

    #[test]
    fn test_divide_string_empty() {
        assert!(divide_string(10, '\n', "").is_empty());
    }

    #[test]
    fn test_parse_arguments() {
        let opts = parse_arguments(&["-size", "20", "-amount", "3"]);
        assert_eq!(opts.get("size").map(String::as_str), Some("20"));
        assert_eq!(opts.get("amount").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_parse_arguments_leading_words() {
        let opts = parse_arguments(&["5", "-size", "8"]);
        assert_eq!(opts.get("").map(String::as_str), Some("5"));
        assert_eq!(opts.get("size").map(String::as_str), Some("8"));
    }

    #[test]
    fn test_parse_arguments_negative_number_is_value() {
        let opts = parse_arguments(&["-amount", "-3"]);
        assert_eq!(opts.get("amount").map(String::as_str), Some("-3"));
    }

    #[test]
    fn test_is_letters_only() {
        assert!(is_letters_only("Fluffy"));
        assert!(!is_letters_only("Fluffy2"));
        assert!(!is_letters_only("two words"));
        assert!(!is_letters_only(""));
    }

    #[test]
    fn test_normalize_quotes() {
        assert_eq!(normalize_quotes("it\u{2019}s \u{2018}ok"), "it's 'ok");
    }
}

//! Filesystem-safe folder component sanitization.

/// Longest component accepted by Linux (NAME_MAX, in bytes).
const NAME_MAX: usize = 255;

/// Sanitizes one folder component supplied by a client.
///
/// - Replaces NUL, path separators, control characters and the characters
///   reserved on FAT/NTFS (`<>:"|?*`) with `_`
/// - Collapses runs of `_` and of whitespace
/// - Trims leading/trailing whitespace and dots
/// - Limits length to 255 bytes
pub fn sanitize_path_component(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev: Option<char> = None;

    for c in name.chars() {
        let mapped = match c {
            '\0' | '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c if c.is_whitespace() => ' ',
            c => c,
        };
        if (mapped == '_' || mapped == ' ') && prev == Some(mapped) {
            continue;
        }
        out.push(mapped);
        prev = Some(mapped);
    }

    let trimmed = out.trim_matches(|c: char| c == ' ' || c == '.');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_reserved_characters() {
        assert_eq!(sanitize_path_component("a:b*c?"), "a_b_c_");
        assert_eq!(sanitize_path_component("x\\y"), "x_y");
    }

    #[test]
    fn keeps_single_spaces_and_trims_dots() {
        assert_eq!(sanitize_path_component("  ..live   sets.. "), "live sets");
    }

    #[test]
    fn collapses_underscores_and_control_chars() {
        assert_eq!(sanitize_path_component("a\x00\x01b"), "a_b");
        assert_eq!(sanitize_path_component("a___b"), "a_b");
    }

    #[test]
    fn truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize_path_component(&long);
        assert!(out.len() <= 255);
        assert!(out.chars().all(|c| c == 'é'));
    }
}

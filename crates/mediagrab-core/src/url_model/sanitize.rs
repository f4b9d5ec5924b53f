//! Filename sanitizing for names handed to a local directory.

/// Longest file name most Linux filesystems accept, in bytes.
const NAME_MAX: usize = 255;

/// Makes `name` safe to use as a single path component.
///
/// - Replaces `/`, `\`, NUL and control characters with `_`
/// - Trims surrounding whitespace
/// - Returns an empty string for `.` and `..`
/// - Truncates to 255 bytes on a char boundary
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim();
    if trimmed == "." || trimmed == ".." {
        return String::new();
    }

    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

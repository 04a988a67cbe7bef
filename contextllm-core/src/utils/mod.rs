//! Utility functions and helpers

use std::path::Path;

/// Marker appended to every derived session title
pub const TITLE_ELLIPSIS: &str = "...";

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> std::io::Result<std::path::PathBuf> {
    let path = path.as_ref();
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(path.to_path_buf())
}

/// Derive a session title from the first message of a session.
///
/// Takes the first `prefix_chars` characters of `content` and always appends
/// the ellipsis marker, even when the content is already shorter.
pub fn title_from_content(content: &str, prefix_chars: usize) -> String {
    let prefix: String = content.chars().take(prefix_chars).collect();
    format!("{}{}", prefix, TITLE_ELLIPSIS)
}

/// Shorten text for log lines and list views, counting characters
pub fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    }
}

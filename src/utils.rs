use anyhow::Result;
use url::Url;
use std::path::PathBuf;

/// Extract a usable filename from the last path segment of a URL.
/// Query strings never leak into the name; an empty or missing segment
/// (e.g. a bare host or a trailing slash) yields `None` so the caller can
/// pick a fallback.
pub fn filename_from_url(url_str: &str) -> Result<Option<String>> {
    let url = Url::parse(url_str)?;

    let name = url
        .path_segments()
        .and_then(|segments| segments.last().map(str::to_string))
        .filter(|name| !name.is_empty());

    Ok(name)
}

pub fn sanitize_filename(filename: &str) -> String {
    filename.replace(|c: char| !c.is_alphanumeric() && c != '.' && c != '-' && c != '_', "_")
}

/// Name to use when the URL has no usable path segment: the tool's name with
/// spaces collapsed plus a `.download` marker, or a generated name for raw
/// URLs fetched outside the catalog.
pub fn fallback_filename(tool_name: Option<&str>) -> String {
    match tool_name {
        Some(name) => format!("{}.download", sanitize_filename(&name.replace(' ', "_"))),
        None => format!("download_{}", uuid::Uuid::new_v4()),
    }
}

/// Default destination directory: the user's desktop, falling back to
/// `~/Desktop` when the platform does not report one.
pub fn default_download_dir() -> Option<PathBuf> {
    dirs::desktop_dir().or_else(|| dirs::home_dir().map(|home| home.join("Desktop")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_from_url_takes_last_segment() {
        let name = filename_from_url("https://example.com/dir/tool-1.2.zip").unwrap();
        assert_eq!(name.as_deref(), Some("tool-1.2.zip"));
    }

    #[test]
    fn filename_from_url_ignores_query_string() {
        let name = filename_from_url("https://example.com/a/setup.exe?sig=abc&x=1").unwrap();
        assert_eq!(name.as_deref(), Some("setup.exe"));
    }

    #[test]
    fn filename_from_url_rejects_empty_segment() {
        assert_eq!(filename_from_url("https://example.com/dir/").unwrap(), None);
        assert_eq!(filename_from_url("https://example.com").unwrap(), None);
    }

    #[test]
    fn filename_from_url_rejects_invalid_url() {
        assert!(filename_from_url("not a url").is_err());
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("a b/c:d.zip"), "a_b_c_d.zip");
        assert_eq!(sanitize_filename("ok-name_1.2.exe"), "ok-name_1.2.exe");
    }

    #[test]
    fn fallback_uses_tool_name_when_available() {
        assert_eq!(
            fallback_filename(Some("Previous File Recovery")),
            "Previous_File_Recovery.download"
        );
    }

    #[test]
    fn fallback_generates_unique_name_without_tool() {
        let a = fallback_filename(None);
        let b = fallback_filename(None);
        assert!(a.starts_with("download_"));
        assert_ne!(a, b);
    }
}

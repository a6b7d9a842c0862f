use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::domain::AppError;

const CANONICAL_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Video ids are URL-safe base64 characters; anything shorter than six is not an id.
static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{6,}").expect("video id pattern is valid"));

/// Validates a candidate link and rewrites shorts / short links to the watch-page form.
///
/// Returns an empty string when the input is not an http(s) YouTube link.
/// Other YouTube URLs are passed through unchanged.
pub fn normalize_youtube_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let Ok(parsed) = Url::parse(trimmed) else {
        return String::new();
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return String::new();
    }

    let Some(host) = parsed.host_str() else {
        return String::new();
    };

    let mut segments = parsed.path_segments().into_iter().flatten();

    if is_short_link_host(host) {
        if let Some(id) = segments.next().and_then(video_id) {
            return format!("{}{}", CANONICAL_WATCH_URL, id);
        }
        return trimmed.to_string();
    }

    if is_youtube_host(host) {
        let first = segments.next().unwrap_or_default();
        if first.eq_ignore_ascii_case("shorts") {
            if let Some(id) = segments.next().and_then(video_id) {
                return format!("{}{}", CANONICAL_WATCH_URL, id);
            }
        }
        return trimmed.to_string();
    }

    String::new()
}

fn is_youtube_host(host: &str) -> bool {
    host == "youtube.com" || host.ends_with(".youtube.com")
}

fn is_short_link_host(host: &str) -> bool {
    host == "youtu.be" || host == "www.youtu.be"
}

fn video_id(segment: &str) -> Option<&str> {
    VIDEO_ID.find(segment).map(|m| m.as_str())
}

/// Parses batch-file contents: one URL per line, `#` comments and blank lines skipped,
/// invalid lines dropped.
pub fn parse_batch_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(normalize_youtube_url)
        .filter(|url| !url.is_empty())
        .collect()
}

pub async fn read_batch_file(path: &Path) -> Result<Vec<String>, AppError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::BatchFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(parse_batch_lines(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_youtube_input() {
        assert_eq!(normalize_youtube_url("not a url"), "");
        assert_eq!(normalize_youtube_url("   "), "");
        assert_eq!(normalize_youtube_url("ftp://youtube.com/watch?v=abc123"), "");
        assert_eq!(normalize_youtube_url("https://vimeo.com/123456"), "");
        assert_eq!(normalize_youtube_url("youtube.com/watch?v=dQw4w9WgXcQ"), "");
    }

    #[test]
    fn test_rewrites_short_links() {
        assert_eq!(
            normalize_youtube_url("https://youtu.be/dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            normalize_youtube_url("  https://youtu.be/dQw4w9WgXcQ?t=42  "),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_rewrites_shorts() {
        assert_eq!(
            normalize_youtube_url("https://www.youtube.com/shorts/abcdEFghij"),
            "https://www.youtube.com/watch?v=abcdEFghij"
        );
        assert_eq!(
            normalize_youtube_url("HTTPS://WWW.YOUTUBE.COM/shorts/abc_-12345"),
            "https://www.youtube.com/watch?v=abc_-12345"
        );
    }

    #[test]
    fn test_passes_other_youtube_urls_through() {
        let watch = "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL123";
        assert_eq!(normalize_youtube_url(watch), watch);

        let playlist = "https://youtube.com/playlist?list=PLabc";
        assert_eq!(normalize_youtube_url(playlist), playlist);

        // Too short to be an id, left as-is.
        assert_eq!(normalize_youtube_url("https://youtu.be/abc"), "https://youtu.be/abc");
    }

    #[test]
    fn test_batch_lines() {
        let contents = "# comment\n\nhttps://youtu.be/abc123XYZ\ngarbage\n";
        assert_eq!(
            parse_batch_lines(contents),
            vec!["https://www.youtube.com/watch?v=abc123XYZ".to_string()]
        );
    }

    #[tokio::test]
    async fn test_read_batch_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(
            &path,
            "https://www.youtube.com/shorts/abcdEFghij\n  # skipped\nhttps://youtu.be/dQw4w9WgXcQ\n",
        )
        .unwrap();

        let urls = read_batch_file(&path).await.unwrap();
        assert_eq!(urls.len(), 2);

        let missing = read_batch_file(&dir.path().join("missing.txt")).await;
        assert!(matches!(missing, Err(AppError::BatchFile { .. })));
    }
}

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Every recognized URL shape, tried in order. The id is always the first capture.
    static ref VIDEO_URL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([A-Za-z0-9_-]{11})")
            .unwrap(),
        Regex::new(r"youtube\.com/v/([A-Za-z0-9_-]{11})").unwrap(),
        Regex::new(r"youtube\.com/shorts/([A-Za-z0-9_-]{11})").unwrap(),
        Regex::new(r"youtu\.be/shorts/([A-Za-z0-9_-]{11})").unwrap(),
    ];
}

/// Resolves an external video URL to its eleven character video id.
/// Recognizes canonical watch URLs, short links, embed URLs, and shorts in
/// both canonical and short-link form. Returns `None` for anything else.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_URL_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_recognized_shapes() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=JwRWf3ho4B8&list=PL23A657E4BD523733&index=45"),
            Some("JwRWf3ho4B8".to_string())
        );
        assert_eq!(
            extract_video_id("https://music.youtube.com/watch?v=z09GolEktUw"),
            Some("z09GolEktUw".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/z09GolEktUw"),
            Some("z09GolEktUw".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/z09GolEktUw"),
            Some("z09GolEktUw".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtube.com/v/z09GolEktUw"),
            Some("z09GolEktUw".to_string())
        );
    }

    #[test]
    fn test_shorts_shapes() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/aBcDeFgHiJk"),
            Some("aBcDeFgHiJk".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/shorts/aBcDeFgHiJk"),
            Some("aBcDeFgHiJk".to_string())
        );
    }

    #[test]
    fn test_unrecognized_shapes() {
        assert_eq!(extract_video_id("https://www.youtube.com/"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/@SomeChannel"), None);
        assert_eq!(extract_video_id("https://example.com/watch?v=dQw4w9WgXcQ"), None);
        // Ids are always eleven characters
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=tooShort"), None);
        assert_eq!(extract_video_id("not a url at all"), None);
    }
}

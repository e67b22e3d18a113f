/// Image URLs are composed from a fixed CDN base, a size token and the
/// relative path the catalog returns (e.g. "/pB8BM7.jpg").
pub const IMAGE_SIZES: &[&str] = &[
    "w92", "w154", "w185", "w342", "w500", "w780", "w1280", "original",
];

pub fn valid_size(size: &str) -> bool {
    IMAGE_SIZES.contains(&size)
}

pub fn image_url(base_url: &str, size: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let encoded = urlencoding::encode(path);
    format!("{}/{}/{}", base, size, encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_url() {
        assert_eq!(
            image_url("https://image.tmdb.org/t/p/", "w500", "/abc123.jpg"),
            "https://image.tmdb.org/t/p/w500/abc123.jpg"
        );
        assert_eq!(
            image_url("https://image.tmdb.org/t/p", "original", "abc123.jpg"),
            "https://image.tmdb.org/t/p/original/abc123.jpg"
        );
    }

    #[test]
    fn test_valid_size() {
        assert!(valid_size("w500"));
        assert!(valid_size("original"));
        assert!(!valid_size("w9999"));
        assert!(!valid_size(""));
    }
}

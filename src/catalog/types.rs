use serde::{Deserialize, Serialize};

/// One page of a paginated catalog listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

/// Movie summary as it appears in listings and as the value stored in a
/// favorites entry. Fields the UI does not render are carried through
/// untouched in `extra` so a favorite round-trips verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genre_ids: Vec<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreList {
    pub genres: Vec<Genre>,
}

/// Full movie record with the appended sub-resources requested in a single
/// details call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos: Option<VideoList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<Credits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<ImageList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_dates: Option<ReleaseDatesResult>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoList {
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    #[serde(default)]
    pub official: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageList {
    #[serde(default)]
    pub backdrops: Vec<ImageInfo>,
    #[serde(default)]
    pub posters: Vec<ImageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseDatesResult {
    pub results: Vec<CountryReleaseDates>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryReleaseDates {
    pub iso_3166_1: String,
    pub release_dates: Vec<ReleaseDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseDate {
    #[serde(default)]
    pub certification: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(rename = "type")]
    pub release_type: Option<u32>,
}

/// Watch-provider payload. Keyed by country code upstream; the client
/// extracts the requested region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchProvidersResult {
    #[serde(default)]
    pub results: std::collections::HashMap<String, RegionProviders>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionProviders {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flatrate: Vec<WatchProvider>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rent: Vec<WatchProvider>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buy: Vec<WatchProvider>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchProvider {
    pub provider_id: i64,
    pub provider_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_priority: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_roundtrip_keeps_unknown_fields() {
        let json = r#"{
            "id": 550,
            "title": "Fight Club",
            "poster_path": "/pB8BM7pdSp6B6Ih7QZ4DrQ3PmJK.jpg",
            "release_date": "1999-10-15",
            "vote_average": 8.4,
            "genre_ids": [18, 53],
            "original_language": "en",
            "popularity": 61.416
        }"#;

        let movie: Movie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.id, 550);
        assert_eq!(movie.title, "Fight Club");
        assert_eq!(movie.genre_ids, vec![18, 53]);

        let back = serde_json::to_value(&movie).unwrap();
        assert_eq!(back["original_language"], "en");
        assert_eq!(back["popularity"], 61.416);
    }

    #[test]
    fn test_page_deserialization() {
        let json = r#"{
            "page": 1,
            "results": [{"id": 5, "title": "X"}],
            "total_pages": 20,
            "total_results": 400
        }"#;

        let page: Page<Movie> = serde_json::from_str(json).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, 5);
        assert_eq!(page.total_pages, 20);
    }

    #[test]
    fn test_details_with_appended_resources() {
        let json = r#"{
            "id": 27205,
            "title": "Inception",
            "runtime": 148,
            "genres": [{"id": 28, "name": "Action"}],
            "videos": {"results": [
                {"key": "YoHD9XEInc0", "name": "Trailer", "site": "YouTube", "type": "Trailer"}
            ]},
            "credits": {"cast": [
                {"id": 6193, "name": "Leonardo DiCaprio", "character": "Cobb", "order": 0}
            ]},
            "release_dates": {"results": [
                {"iso_3166_1": "US", "release_dates": [{"certification": "PG-13", "type": 3}]}
            ]}
        }"#;

        let details: MovieDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.runtime, Some(148));
        assert_eq!(details.videos.unwrap().results[0].site, "YouTube");
        assert_eq!(details.credits.unwrap().cast[0].name, "Leonardo DiCaprio");
        let rd = details.release_dates.unwrap();
        assert_eq!(rd.results[0].release_dates[0].certification, "PG-13");
    }

    #[test]
    fn test_watch_providers_region_extraction() {
        let json = r#"{
            "results": {
                "US": {
                    "link": "https://www.themoviedb.org/movie/550/watch?locale=US",
                    "flatrate": [{"provider_id": 8, "provider_name": "Netflix"}]
                }
            }
        }"#;

        let providers: WatchProvidersResult = serde_json::from_str(json).unwrap();
        let us = providers.results.get("US").unwrap();
        assert_eq!(us.flatrate[0].provider_name, "Netflix");
        assert!(us.rent.is_empty());
    }
}

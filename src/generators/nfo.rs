//! NFO sidecar format (Kodi compatible).

use crate::models::media::{year_from_date, Art, MovieRecord};
use regex::Regex;
use std::path::PathBuf;

/// Generate movie NFO content (Kodi/Emby/Jellyfin compatible).
///
/// Local artwork paths take precedence over remote URLs.
pub fn generate_movie_nfo(movie: &MovieRecord) -> String {
    let mut nfo = String::new();

    nfo.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    nfo.push_str("<movie>\n");

    // Title
    nfo.push_str(&format!("  <title>{}</title>\n", escape_xml(&movie.title)));
    if let Some(ref original) = movie.original_title {
        nfo.push_str(&format!(
            "  <originaltitle>{}</originaltitle>\n",
            escape_xml(original)
        ));
    }
    nfo.push_str(&format!("  <sorttitle>{}</sorttitle>\n", escape_xml(&movie.title)));

    // Year and release date
    if let Some(year) = movie.year {
        nfo.push_str(&format!("  <year>{}</year>\n", year));
    }
    if let Some(ref premiered) = movie.premiered {
        nfo.push_str(&format!("  <premiered>{}</premiered>\n", escape_xml(premiered)));
    }

    // Rating
    if let Some(rating) = movie.rating {
        nfo.push_str("  <ratings>\n");
        nfo.push_str("    <rating name=\"themoviedb\" max=\"10\" default=\"true\">\n");
        nfo.push_str(&format!("      <value>{:.1}</value>\n", rating));
        if let Some(votes) = movie.votes {
            nfo.push_str(&format!("      <votes>{}</votes>\n", votes));
        }
        nfo.push_str("    </rating>\n");
        nfo.push_str("  </ratings>\n");
    }

    // IDs
    if let Some(tmdb_id) = movie.tmdb_id {
        nfo.push_str(&format!(
            "  <uniqueid type=\"tmdb\" default=\"true\">{}</uniqueid>\n",
            tmdb_id
        ));
    }

    // Plot
    if let Some(ref plot) = movie.plot {
        nfo.push_str(&format!("  <plot>{}</plot>\n", escape_xml(plot)));
    }

    for genre in &movie.genres {
        nfo.push_str(&format!("  <genre>{}</genre>\n", escape_xml(genre)));
    }

    for director in &movie.directors {
        nfo.push_str(&format!("  <director>{}</director>\n", escape_xml(director)));
    }

    // Poster
    let poster = movie
        .art
        .local_poster
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .or_else(|| movie.art.poster.clone());
    if let Some(poster) = poster {
        nfo.push_str(&format!("  <thumb aspect=\"poster\">{}</thumb>\n", escape_xml(&poster)));
    }

    // Fanart/Backdrop
    let fanart = movie
        .art
        .local_fanart
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .or_else(|| movie.art.fanart.clone());
    if let Some(fanart) = fanart {
        nfo.push_str("  <fanart>\n");
        nfo.push_str(&format!("    <thumb>{}</thumb>\n", escape_xml(&fanart)));
        nfo.push_str("  </fanart>\n");
    }

    nfo.push_str("</movie>\n");
    nfo
}

/// Parse movie NFO content.
///
/// Tag extraction rather than schema validation, so hand-edited files still
/// load. Returns `None` unless there is a `<movie>` root and a title.
pub fn parse_movie_nfo(content: &str) -> Option<MovieRecord> {
    let has_root = Regex::new(r"<movie[\s>]")
        .map(|re| re.is_match(content))
        .unwrap_or(false);
    if !has_root || !content.contains("</movie>") {
        return None;
    }

    let get_tag = |tag: &str| -> Option<String> {
        let pattern = format!(r"(?s)<{}>(.*?)</{}>", tag, tag);
        Regex::new(&pattern)
            .ok()?
            .captures(content)
            .and_then(|c| c.get(1))
            .map(|m| unescape_xml(m.as_str().trim()))
            .filter(|s| !s.is_empty())
    };

    let get_all_tags = |tag: &str| -> Vec<String> {
        let pattern = format!(r"(?s)<{}>(.*?)</{}>", tag, tag);
        Regex::new(&pattern)
            .map(|re| {
                re.captures_iter(content)
                    .filter_map(|c| c.get(1))
                    .map(|m| unescape_xml(m.as_str().trim()))
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    };

    let get_attr_tag = |pattern: &str| -> Option<String> {
        Regex::new(pattern)
            .ok()?
            .captures(content)
            .and_then(|c| c.get(1))
            .map(|m| unescape_xml(m.as_str().trim()))
            .filter(|s| !s.is_empty())
    };

    let title = get_tag("title")?;
    let premiered = get_tag("premiered");
    let year = get_tag("year")
        .and_then(|y| y.parse().ok())
        .or_else(|| premiered.as_deref().and_then(year_from_date));

    let tmdb_id = get_attr_tag(r#"<uniqueid[^>]*type="tmdb"[^>]*>(\d+)</uniqueid>"#)
        .or_else(|| get_tag("tmdbid"))
        .and_then(|id| id.parse().ok());

    let rating = get_tag("value")
        .or_else(|| get_tag("rating"))
        .and_then(|r| r.parse().ok());
    let votes = get_tag("votes").and_then(|v| v.parse().ok());

    let poster = get_attr_tag(r#"(?s)<thumb[^>]*aspect="poster"[^>]*>(.*?)</thumb>"#);
    let fanart = get_attr_tag(r"(?s)<fanart>\s*<thumb[^>]*>(.*?)</thumb>");

    Some(MovieRecord {
        tmdb_id,
        title,
        original_title: get_tag("originaltitle"),
        year,
        premiered,
        plot: get_tag("plot"),
        rating,
        votes,
        genres: get_all_tags("genre"),
        directors: get_all_tags("director"),
        art: split_art(poster, fanart),
    })
}

/// Sort artwork references into remote URLs and local paths.
fn split_art(poster: Option<String>, fanart: Option<String>) -> Art {
    let is_remote = |s: &str| s.starts_with("http://") || s.starts_with("https://");
    let mut art = Art::default();

    match poster {
        Some(p) if is_remote(&p) => art.poster = Some(p),
        Some(p) => art.local_poster = Some(PathBuf::from(p)),
        None => {}
    }
    match fanart {
        Some(f) if is_remote(&f) => art.fanart = Some(f),
        Some(f) => art.local_fanart = Some(PathBuf::from(f)),
        None => {}
    }

    art
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Reverse of [`escape_xml`]; `&amp;` goes last so it is not decoded twice.
fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inception() -> MovieRecord {
        MovieRecord {
            tmdb_id: Some(27205),
            title: "盗梦空间".to_string(),
            original_title: Some("Inception".to_string()),
            year: Some(2010),
            premiered: Some("2010-07-15".to_string()),
            plot: Some("Cobb & his team <enter> dreams".to_string()),
            rating: Some(8.4),
            votes: Some(35000),
            genres: vec!["Action".to_string(), "Science Fiction".to_string()],
            directors: vec!["Christopher Nolan".to_string()],
            art: Art {
                poster: Some("https://image.tmdb.org/t/p/original/p.jpg".to_string()),
                fanart: Some("https://image.tmdb.org/t/p/original/f.jpg".to_string()),
                local_poster: Some(PathBuf::from("/movies/Inception-poster.jpg")),
                local_fanart: None,
            },
        }
    }

    #[test]
    fn test_generate_movie_nfo() {
        let nfo = generate_movie_nfo(&inception());

        assert!(nfo.contains("<title>盗梦空间</title>"));
        assert!(nfo.contains("<originaltitle>Inception</originaltitle>"));
        assert!(nfo.contains("<year>2010</year>"));
        assert!(nfo.contains("<uniqueid type=\"tmdb\" default=\"true\">27205</uniqueid>"));
        assert!(nfo.contains("Cobb &amp; his team &lt;enter&gt; dreams"));
        // Local poster replaces the remote URL, remote fanart kept as-is.
        assert!(nfo.contains("<thumb aspect=\"poster\">/movies/Inception-poster.jpg</thumb>"));
        assert!(nfo.contains("<thumb>https://image.tmdb.org/t/p/original/f.jpg</thumb>"));
    }

    #[test]
    fn test_parse_generated_nfo() {
        let parsed = parse_movie_nfo(&generate_movie_nfo(&inception())).unwrap();

        assert_eq!(parsed.title, "盗梦空间");
        assert_eq!(parsed.year, Some(2010));
        assert_eq!(parsed.tmdb_id, Some(27205));
        assert_eq!(parsed.plot.as_deref(), Some("Cobb & his team <enter> dreams"));
        assert_eq!(parsed.genres, vec!["Action", "Science Fiction"]);
        assert_eq!(
            parsed.art.local_poster,
            Some(PathBuf::from("/movies/Inception-poster.jpg"))
        );
        assert_eq!(
            parsed.art.fanart.as_deref(),
            Some("https://image.tmdb.org/t/p/original/f.jpg")
        );
    }

    #[test]
    fn test_parse_year_from_premiered() {
        let nfo = "<movie><title>Heat</title><premiered>1995-12-15</premiered></movie>";
        let parsed = parse_movie_nfo(nfo).unwrap();
        assert_eq!(parsed.year, Some(1995));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_movie_nfo("").is_none());
        assert!(parse_movie_nfo("not xml at all").is_none());
        assert!(parse_movie_nfo("<tvshow><title>X</title></tvshow>").is_none());
        assert!(parse_movie_nfo("<movie><title>  </title></movie>").is_none());
        assert!(parse_movie_nfo("<movie><title>Truncated").is_none());
        assert!(parse_movie_nfo("<movies><title>X</title></movies>").is_none());
    }

    #[test]
    fn test_parse_root_with_attributes() {
        let nfo = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<movie xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <title>Heat</title>
  <year>1995</year>
</movie>"#;
        let parsed = parse_movie_nfo(nfo).unwrap();
        assert_eq!(parsed.title, "Heat");
        assert_eq!(parsed.year, Some(1995));
    }
}

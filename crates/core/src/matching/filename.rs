//! Parsing of filename-like match queries.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static SEASON_EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[\s._\-\[\(]*S(\d{1,3})\s*E(\d{1,4})").unwrap());
static PLATFORM_HINT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@([A-Za-z0-9_]+)\s*$").unwrap());
static EXTENSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(mkv|mp4|avi|ts|flv|wmv|mov|webm)$").unwrap());

/// A parsed match query: title, optional season/episode, optional platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFileName {
    pub title: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub platform: Option<String>,
}

/// Parse `title [S<season>E<episode>] [@platform]` out of a filename.
///
/// Dots, underscores and dashes in the title part are treated as spaces; a
/// trailing media extension is dropped.
pub fn parse_file_name(input: &str) -> ParsedFileName {
    let mut rest = input.trim().to_string();

    let platform = PLATFORM_HINT_RE
        .captures(&rest)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_lowercase()));
    if let Some(start) = PLATFORM_HINT_RE.find(&rest).map(|m| m.start()) {
        rest.truncate(start);
    }

    if let Some(start) = EXTENSION_RE.find(&rest).map(|m| m.start()) {
        rest.truncate(start);
    }

    let (title_part, season, episode) = match SEASON_EPISODE_RE.captures(&rest) {
        Some(caps) => {
            let full = caps.get(0).map(|m| m.start()).unwrap_or(0);
            let season = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let episode = caps.get(2).and_then(|m| m.as_str().parse().ok());
            (rest[..full].to_string(), season, episode)
        }
        None => (rest, None, None),
    };

    ParsedFileName {
        title: clean_title(&title_part),
        season,
        episode,
        platform,
    }
}

fn clean_title(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '.' | '_' => ' ',
            other => other,
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_form() {
        let parsed = parse_file_name("Foo.S01E05.mkv");
        assert_eq!(parsed.title, "Foo");
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episode, Some(5));
        assert_eq!(parsed.platform, None);
    }

    #[test]
    fn test_parse_with_platform_hint() {
        let parsed = parse_file_name("某剧 S02E10 @qq");
        assert_eq!(parsed.title, "某剧");
        assert_eq!(parsed.season, Some(2));
        assert_eq!(parsed.episode, Some(10));
        assert_eq!(parsed.platform, Some("qq".to_string()));
    }

    #[test]
    fn test_parse_platform_hint_lowercased() {
        let parsed = parse_file_name("Foo S01E01 @Bilibili1");
        assert_eq!(parsed.platform, Some("bilibili1".to_string()));
    }

    #[test]
    fn test_parse_movie_no_season_episode() {
        let parsed = parse_file_name("流浪地球 (2019).mp4");
        assert_eq!(parsed.title, "流浪地球 (2019)");
        assert_eq!(parsed.season, None);
        assert_eq!(parsed.episode, None);
    }

    #[test]
    fn test_parse_dots_and_underscores_become_spaces() {
        let parsed = parse_file_name("Some_Long.Show.Name.S03E12.1080p");
        assert_eq!(parsed.title, "Some Long Show Name");
        assert_eq!(parsed.season, Some(3));
        assert_eq!(parsed.episode, Some(12));
    }

    #[test]
    fn test_parse_lowercase_marker() {
        let parsed = parse_file_name("show s01e02");
        assert_eq!(parsed.title, "show");
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.episode, Some(2));
    }

    #[test]
    fn test_parse_empty_input() {
        let parsed = parse_file_name("  ");
        assert_eq!(parsed.title, "");
        assert_eq!(parsed.season, None);
    }
}

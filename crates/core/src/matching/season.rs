//! Season disambiguation: CJK numeral parsing and title-suffix matching.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static SEASON_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^第?\s*([0-9零一二两三四五六七八九十百千壹贰叁肆伍陆柒捌玖拾佰仟]+)\s*[季部]?$").unwrap());

/// Parse an Arabic or CJK numeral (simplified or traditional) into a number.
pub fn parse_numeral(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse().ok();
    }

    let mut result: u32 = 0;
    let mut current: u32 = 0;
    let mut saw_digit = false;
    for c in s.chars() {
        if let Some(d) = cjk_digit(c) {
            current = d;
            saw_digit = true;
        } else if let Some(unit) = cjk_unit(c) {
            // A bare unit means one of it: 十 is 10, 百 is 100.
            if current == 0 {
                current = 1;
            }
            result = result.checked_add(current.checked_mul(unit)?)?;
            current = 0;
            saw_digit = true;
        } else if c == '零' {
            current = 0;
        } else {
            return None;
        }
    }
    if !saw_digit {
        return None;
    }
    result.checked_add(current)
}

fn cjk_digit(c: char) -> Option<u32> {
    match c {
        '一' | '壹' => Some(1),
        '二' | '两' | '贰' => Some(2),
        '三' | '叁' => Some(3),
        '四' | '肆' => Some(4),
        '五' | '伍' => Some(5),
        '六' | '陆' => Some(6),
        '七' | '柒' => Some(7),
        '八' | '捌' => Some(8),
        '九' | '玖' => Some(9),
        _ => None,
    }
}

fn cjk_unit(c: char) -> Option<u32> {
    match c {
        '十' | '拾' => Some(10),
        '百' | '佰' => Some(100),
        '千' | '仟' => Some(1000),
        _ => None,
    }
}

/// Whether a display title names the requested season of `query_title`.
///
/// The display title must start with the query; the remaining suffix either
/// is empty (season 1) or carries a numeral equal to `season`, optionally
/// wrapped as `第N季`/`第N部`.
pub fn match_season(display_title: &str, query_title: &str, season: u32) -> bool {
    let Some(suffix) = display_title.strip_prefix(query_title) else {
        return false;
    };
    let suffix = suffix.trim();
    if suffix.is_empty() {
        return season == 1;
    }
    let Some(caps) = SEASON_SUFFIX_RE.captures(suffix) else {
        return false;
    };
    caps.get(1)
        .and_then(|m| parse_numeral(m.as_str()))
        .map(|n| n == season)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arabic() {
        assert_eq!(parse_numeral("2"), Some(2));
        assert_eq!(parse_numeral("15"), Some(15));
    }

    #[test]
    fn test_parse_simplified_cjk() {
        assert_eq!(parse_numeral("一"), Some(1));
        assert_eq!(parse_numeral("两"), Some(2));
        assert_eq!(parse_numeral("十"), Some(10));
        assert_eq!(parse_numeral("十五"), Some(15));
        assert_eq!(parse_numeral("二十"), Some(20));
        assert_eq!(parse_numeral("二十三"), Some(23));
        assert_eq!(parse_numeral("一百零五"), Some(105));
        assert_eq!(parse_numeral("三千"), Some(3000));
    }

    #[test]
    fn test_parse_traditional_cjk() {
        assert_eq!(parse_numeral("壹"), Some(1));
        assert_eq!(parse_numeral("拾"), Some(10));
        assert_eq!(parse_numeral("贰拾叁"), Some(23));
        assert_eq!(parse_numeral("伍佰"), Some(500));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_numeral(""), None);
        assert_eq!(parse_numeral("abc"), None);
        assert_eq!(parse_numeral("第"), None);
    }

    #[test]
    fn test_match_season_bare_title_is_season_one() {
        assert!(match_season("Show", "Show", 1));
        assert!(!match_season("Show", "Show", 2));
    }

    #[test]
    fn test_match_season_cjk_suffix() {
        assert!(match_season("Show 第二季", "Show", 2));
        assert!(match_season("Show第2季", "Show", 2));
        assert!(match_season("Show 第贰季", "Show", 2));
        assert!(!match_season("Show 第二季", "Show", 3));
    }

    #[test]
    fn test_match_season_bare_numeral_suffix() {
        assert!(match_season("Show 2", "Show", 2));
        assert!(match_season("Show 三", "Show", 3));
    }

    #[test]
    fn test_match_season_part_suffix() {
        assert!(match_season("Show 第三部", "Show", 3));
    }

    #[test]
    fn test_match_season_wrong_prefix() {
        assert!(!match_season("Other Show 第二季", "Show", 2));
        assert!(!match_season("Show extended edition", "Show", 1));
    }
}

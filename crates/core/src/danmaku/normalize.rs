//! The normalization pipeline: shape detection and field extraction,
//! blocked-word filtering, time-window dedup/grouping, style conversion and
//! final id assignment.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::types::{
    CanonicalComment, NormalizeError, RawComments, WireComment, COLOR_WHITE, MODE_BOTTOM,
    MODE_SCROLL, MODE_TOP,
};
use crate::codec::DanmakuRecord;
use crate::config::CompiledFilter;

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<d\s+p="([^"]*)"\s*>([^<]*)</d>"#).unwrap());
static GROUP_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*) x \d+$").unwrap());

/// Pipeline settings, borrowed from the compiled configuration.
pub struct NormalizeOptions<'a> {
    pub blocked: &'a CompiledFilter,
    /// Dedup window in minutes; 0 bypasses grouping.
    pub window_minutes: u32,
    /// Convert top/bottom-anchored comments to scrolling.
    pub to_scroll: bool,
    /// Force all colors to white.
    pub force_white: bool,
}

/// Run the full pipeline over one raw collection.
///
/// An empty or unrecognizable input is a hard error so callers can tell "no
/// comments" apart from "adapter returned garbage".
pub fn normalize(
    raw: RawComments,
    platform: &str,
    opts: &NormalizeOptions<'_>,
) -> Result<Vec<WireComment>, NormalizeError> {
    if raw.is_empty() {
        return Err(NormalizeError::EmptyInput);
    }

    let extracted = extract(raw, platform)?;
    let total = extracted.len();

    let mut kept: Vec<CanonicalComment> = extracted
        .into_iter()
        .filter(|c| !opts.blocked.matches(&c.text))
        .collect();
    if kept.len() < total {
        debug!(dropped = total - kept.len(), "blocked words filtered comments");
    }

    kept = group_by_window(kept, opts.window_minutes);

    for comment in &mut kept {
        if opts.to_scroll && (comment.mode == MODE_TOP || comment.mode == MODE_BOTTOM) {
            comment.mode = MODE_SCROLL;
        }
        if opts.force_white {
            comment.color = COLOR_WHITE;
        }
    }

    Ok(kept
        .iter()
        .enumerate()
        .map(|(i, c)| c.to_wire(i as u64 + 1))
        .collect())
}

/// Shape detection and field extraction with defined fallbacks.
fn extract(raw: RawComments, platform: &str) -> Result<Vec<CanonicalComment>, NormalizeError> {
    let comments = match raw {
        RawComments::TagDelimited(markup) => extract_tag_delimited(&markup, platform),
        RawComments::Tuples(rows) => rows
            .iter()
            .filter_map(|row| extract_tuple(row, platform))
            .collect(),
        RawComments::Objects(objects) => objects
            .iter()
            .filter_map(|obj| extract_object(obj, platform))
            .collect(),
        RawComments::Records(records) => records
            .into_iter()
            .map(|r| extract_record(r, platform))
            .collect(),
    };
    if comments.is_empty() {
        return Err(NormalizeError::UnrecognizedShape);
    }
    Ok(comments)
}

fn extract_tag_delimited(markup: &str, platform: &str) -> Vec<CanonicalComment> {
    TAG_RE
        .captures_iter(markup)
        .filter_map(|caps| {
            let fields: Vec<&str> = caps.get(1)?.as_str().split(',').collect();
            let text = unescape_xml(caps.get(2)?.as_str());
            if text.is_empty() {
                return None;
            }
            let time = fields.first().and_then(|s| s.parse::<f64>().ok())?;
            // XML p-fields are time,mode,fontsize,color,...
            let mode = fields
                .get(1)
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(MODE_SCROLL);
            let color = fields
                .get(3)
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(COLOR_WHITE);
            Some(CanonicalComment {
                time,
                mode,
                color,
                platform: platform.to_string(),
                text,
            })
        })
        .collect()
}

fn extract_tuple(row: &[Value], platform: &str) -> Option<CanonicalComment> {
    let time = row.first().and_then(value_as_f64)?;
    let text = row.get(4).and_then(|v| v.as_str())?.to_string();
    if text.is_empty() {
        return None;
    }
    Some(CanonicalComment {
        time,
        mode: row.get(1).and_then(value_as_u32).unwrap_or(MODE_SCROLL),
        color: row.get(2).and_then(value_as_u32).unwrap_or(COLOR_WHITE),
        platform: platform.to_string(),
        text,
    })
}

fn extract_object(obj: &Map<String, Value>, platform: &str) -> Option<CanonicalComment> {
    // Seconds under "time"/"playTime", milliseconds under "progress".
    let time = if let Some(t) = pick(obj, &["time", "playTime"]).and_then(value_as_f64) {
        t
    } else {
        pick(obj, &["progress"]).and_then(value_as_f64)? / 1000.0
    };
    let text = pick(obj, &["content", "text", "message", "m"])
        .and_then(|v| v.as_str())?
        .to_string();
    if text.is_empty() {
        return None;
    }
    Some(CanonicalComment {
        time,
        mode: pick(obj, &["mode", "type"])
            .and_then(value_as_u32)
            .unwrap_or(MODE_SCROLL),
        color: pick(obj, &["color"]).and_then(value_as_u32).unwrap_or(COLOR_WHITE),
        platform: platform.to_string(),
        text,
    })
}

fn extract_record(record: DanmakuRecord, platform: &str) -> CanonicalComment {
    CanonicalComment {
        time: record.progress_ms as f64 / 1000.0,
        mode: if record.mode == 0 { MODE_SCROLL } else { record.mode },
        color: record.color,
        platform: platform.to_string(),
        text: record.content,
    }
}

/// Bucket comments into `floor(time / (window_minutes * 60))` groups and
/// collapse identical texts within a bucket to one record carrying the
/// earliest time and an `" x N"` count suffix.
fn group_by_window(comments: Vec<CanonicalComment>, window_minutes: u32) -> Vec<CanonicalComment> {
    if window_minutes == 0 {
        return comments;
    }
    let window_secs = f64::from(window_minutes) * 60.0;

    struct Group {
        representative: CanonicalComment,
        count: u64,
    }

    let mut groups: HashMap<(i64, String), Group> = HashMap::new();
    for comment in comments {
        let bucket = (comment.time / window_secs).floor() as i64;
        let base = GROUP_SUFFIX_RE
            .captures(&comment.text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| comment.text.clone());
        groups
            .entry((bucket, base.clone()))
            .and_modify(|group| {
                group.count += 1;
                if comment.time < group.representative.time {
                    group.representative.time = comment.time;
                }
            })
            .or_insert_with(|| {
                let mut representative = comment;
                representative.text = base;
                Group {
                    representative,
                    count: 1,
                }
            });
    }

    let mut out: Vec<CanonicalComment> = groups
        .into_values()
        .map(|group| {
            let mut c = group.representative;
            if group.count > 1 {
                c.text = format!("{} x {}", c.text, group.count);
            }
            c
        })
        .collect();
    out.sort_by(|a, b| a.time.total_cmp(&b.time).then_with(|| a.text.cmp(&b.text)));
    out
}

fn pick<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn value_as_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().map(|n| n as u32),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

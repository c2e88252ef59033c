//! Comment types shared by the pipeline and the API surface.

use crate::codec::DanmakuRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Scrolling comment, the default display mode.
pub const MODE_SCROLL: u32 = 1;
/// Bottom-anchored.
pub const MODE_BOTTOM: u32 = 4;
/// Top-anchored.
pub const MODE_TOP: u32 = 5;

/// White, the default comment color.
pub const COLOR_WHITE: u32 = 0xFFFFFF;

/// One comment in canonical form, before wire encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalComment {
    /// Playback position in seconds.
    pub time: f64,
    pub mode: u32,
    /// 24-bit RGB.
    pub color: u32,
    /// Which platform produced it.
    pub platform: String,
    pub text: String,
}

/// One comment as served to clients.
///
/// `p` is `"time,mode,color,[platform]"` with time fixed to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireComment {
    pub cid: u64,
    pub p: String,
    pub m: String,
}

impl CanonicalComment {
    pub fn to_wire(&self, cid: u64) -> WireComment {
        WireComment {
            cid,
            p: format!(
                "{:.2},{},{},[{}]",
                self.time, self.mode, self.color, self.platform
            ),
            m: self.text.clone(),
        }
    }
}

/// A raw comment collection as returned by a source adapter, in one of the
/// shapes upstream platforms actually produce.
#[derive(Debug, Clone)]
pub enum RawComments {
    /// Flat `<d p="...">text</d>` markup.
    TagDelimited(String),
    /// Arrays with per-index semantics (0 time, 1 mode, 2 color, 4 text).
    Tuples(Vec<Vec<Value>>),
    /// Objects with named (aliased) fields.
    Objects(Vec<Map<String, Value>>),
    /// Pre-decoded binary records.
    Records(Vec<DanmakuRecord>),
}

impl RawComments {
    pub fn is_empty(&self) -> bool {
        match self {
            RawComments::TagDelimited(s) => s.trim().is_empty(),
            RawComments::Tuples(v) => v.is_empty(),
            RawComments::Objects(v) => v.is_empty(),
            RawComments::Records(v) => v.is_empty(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("empty comment input")]
    EmptyInput,

    #[error("unrecognized comment input shape")]
    UnrecognizedShape,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_encoding_two_decimals() {
        let comment = CanonicalComment {
            time: 12.3456,
            mode: MODE_SCROLL,
            color: COLOR_WHITE,
            platform: "qq".to_string(),
            text: "前方高能".to_string(),
        };
        let wire = comment.to_wire(1);
        assert_eq!(wire.p, "12.35,1,16777215,[qq]");
        assert_eq!(wire.m, "前方高能");
    }

    #[test]
    fn test_wire_encoding_whole_seconds() {
        let comment = CanonicalComment {
            time: 5.0,
            mode: MODE_TOP,
            color: 0xFF0000,
            platform: "bilibili1".to_string(),
            text: "hi".to_string(),
        };
        assert_eq!(comment.to_wire(9).p, "5.00,5,16711680,[bilibili1]");
    }

    #[test]
    fn test_raw_comments_is_empty() {
        assert!(RawComments::TagDelimited("  ".to_string()).is_empty());
        assert!(RawComments::Tuples(vec![]).is_empty());
        assert!(!RawComments::Records(vec![DanmakuRecord::default()]).is_empty());
    }
}

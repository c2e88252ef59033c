//! Length-delimited binary record decoder for upstream danmaku segments.
//!
//! The wire format is the usual tag/varint layout: each outer field 1 entry
//! is one comment record, and inside a record field 2 carries the playback
//! progress in milliseconds, field 3 the display mode, field 5 the color and
//! field 7 the UTF-8 content. Everything else is skipped by wire type.
//!
//! Varints are decoded into native u64 with explicit overflow rejection; a
//! value that does not fit 64 bits is an error, never a silent truncation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("varint does not fit in 64 bits")]
    VarintOverflow,

    #[error("truncated varint at offset {0}")]
    TruncatedVarint(usize),

    #[error("field truncated at offset {0}")]
    Truncated(usize),

    #[error("unsupported wire type {wire_type} at offset {offset}")]
    UnsupportedWireType { wire_type: u8, offset: usize },

    #[error("content field is not valid UTF-8")]
    InvalidUtf8,
}

/// One decoded comment record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DanmakuRecord {
    /// Playback position in milliseconds.
    pub progress_ms: u64,
    /// Display mode (1 scroll, 4 bottom, 5 top).
    pub mode: u32,
    /// 24-bit RGB color.
    pub color: u32,
    /// Comment text.
    pub content: String,
}

/// Decode a base-128 varint at `*pos`, advancing it past the value.
pub fn read_varint(buf: &[u8], pos: &mut usize) -> Result<u64, DecodeError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let byte = match buf.get(*pos) {
            Some(&b) => b,
            None => return Err(DecodeError::TruncatedVarint(*pos)),
        };
        *pos += 1;
        let low = (byte & 0x7f) as u64;
        if shift > 63 || (shift == 63 && low > 1) {
            return Err(DecodeError::VarintOverflow);
        }
        value |= low << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Decode a full comment segment into records.
///
/// Unknown fields are skipped at both levels; malformed data anywhere in the
/// buffer fails the whole decode so callers can tell garbage from empty.
pub fn decode_comment_segment(buf: &[u8]) -> Result<Vec<DanmakuRecord>, DecodeError> {
    let mut records = Vec::new();
    let mut pos = 0;
    while pos < buf.len() {
        let tag = read_varint(buf, &mut pos)?;
        let field = tag >> 3;
        let wire_type = (tag & 0x07) as u8;
        if field == 1 && wire_type == 2 {
            let body = read_length_delimited(buf, &mut pos)?;
            records.push(decode_record(body)?);
        } else {
            skip_field(buf, &mut pos, wire_type)?;
        }
    }
    Ok(records)
}

fn decode_record(buf: &[u8]) -> Result<DanmakuRecord, DecodeError> {
    let mut record = DanmakuRecord::default();
    let mut pos = 0;
    while pos < buf.len() {
        let tag = read_varint(buf, &mut pos)?;
        let field = tag >> 3;
        let wire_type = (tag & 0x07) as u8;
        match (field, wire_type) {
            (2, 0) => record.progress_ms = read_varint(buf, &mut pos)?,
            (3, 0) => record.mode = read_varint(buf, &mut pos)? as u32,
            (5, 0) => record.color = read_varint(buf, &mut pos)? as u32,
            (7, 2) => {
                let body = read_length_delimited(buf, &mut pos)?;
                record.content = std::str::from_utf8(body)
                    .map_err(|_| DecodeError::InvalidUtf8)?
                    .to_string();
            }
            _ => skip_field(buf, &mut pos, wire_type)?,
        }
    }
    Ok(record)
}

fn read_length_delimited<'a>(buf: &'a [u8], pos: &mut usize) -> Result<&'a [u8], DecodeError> {
    let start = *pos;
    let len = read_varint(buf, pos)? as usize;
    let end = pos.checked_add(len).ok_or(DecodeError::Truncated(start))?;
    if end > buf.len() {
        return Err(DecodeError::Truncated(start));
    }
    let body = &buf[*pos..end];
    *pos = end;
    Ok(body)
}

fn skip_field(buf: &[u8], pos: &mut usize, wire_type: u8) -> Result<(), DecodeError> {
    match wire_type {
        0 => {
            read_varint(buf, pos)?;
        }
        1 => advance(buf, pos, 8)?,
        2 => {
            read_length_delimited(buf, pos)?;
        }
        5 => advance(buf, pos, 4)?,
        other => {
            return Err(DecodeError::UnsupportedWireType {
                wire_type: other,
                offset: *pos,
            })
        }
    }
    Ok(())
}

fn advance(buf: &[u8], pos: &mut usize, by: usize) -> Result<(), DecodeError> {
    let end = pos.checked_add(by).ok_or(DecodeError::Truncated(*pos))?;
    if end > buf.len() {
        return Err(DecodeError::Truncated(*pos));
    }
    *pos = end;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_varint(out: &mut Vec<u8>, mut value: u64) {
        loop {
            let mut byte = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if value == 0 {
                return;
            }
        }
    }

    fn encode_record(progress_ms: u64, mode: u32, color: u32, content: &str) -> Vec<u8> {
        let mut body = Vec::new();
        put_varint(&mut body, 2 << 3);
        put_varint(&mut body, progress_ms);
        put_varint(&mut body, 3 << 3);
        put_varint(&mut body, mode as u64);
        put_varint(&mut body, 5 << 3);
        put_varint(&mut body, color as u64);
        put_varint(&mut body, (7 << 3) | 2);
        put_varint(&mut body, content.len() as u64);
        body.extend_from_slice(content.as_bytes());

        let mut out = Vec::new();
        put_varint(&mut out, (1 << 3) | 2);
        put_varint(&mut out, body.len() as u64);
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn test_read_varint_single_byte() {
        let mut pos = 0;
        assert_eq!(read_varint(&[0x07], &mut pos).unwrap(), 7);
        assert_eq!(pos, 1);
    }

    #[test]
    fn test_read_varint_multi_byte() {
        let mut pos = 0;
        assert_eq!(read_varint(&[0xac, 0x02], &mut pos).unwrap(), 300);
        assert_eq!(pos, 2);
    }

    #[test]
    fn test_read_varint_max_u64() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        let mut pos = 0;
        assert_eq!(read_varint(&bytes, &mut pos).unwrap(), u64::MAX);
    }

    #[test]
    fn test_read_varint_rejects_overflow() {
        // 10th byte carrying more than one significant bit overflows u64.
        let bytes = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02];
        let mut pos = 0;
        assert!(matches!(
            read_varint(&bytes, &mut pos),
            Err(DecodeError::VarintOverflow)
        ));

        // An 11th continuation byte overflows regardless of its value.
        let bytes = [0xff; 11];
        let mut pos = 0;
        assert!(matches!(
            read_varint(&bytes, &mut pos),
            Err(DecodeError::VarintOverflow)
        ));
    }

    #[test]
    fn test_read_varint_truncated() {
        let mut pos = 0;
        assert!(matches!(
            read_varint(&[0x80], &mut pos),
            Err(DecodeError::TruncatedVarint(1))
        ));
    }

    #[test]
    fn test_decode_single_record() {
        let buf = encode_record(12340, 1, 0xffffff, "前方高能");
        let records = decode_comment_segment(&buf).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].progress_ms, 12340);
        assert_eq!(records[0].mode, 1);
        assert_eq!(records[0].color, 0xffffff);
        assert_eq!(records[0].content, "前方高能");
    }

    #[test]
    fn test_decode_multiple_records() {
        let mut buf = encode_record(1000, 1, 0xffffff, "one");
        buf.extend(encode_record(2000, 5, 0xff0000, "two"));
        let records = decode_comment_segment(&buf).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].progress_ms, 2000);
        assert_eq!(records[1].mode, 5);
    }

    #[test]
    fn test_decode_skips_unknown_fields() {
        let mut body = Vec::new();
        // Unknown varint field 4.
        put_varint(&mut body, 4 << 3);
        put_varint(&mut body, 99);
        // Unknown fixed64 field 8.
        put_varint(&mut body, (8 << 3) | 1);
        body.extend_from_slice(&[0u8; 8]);
        put_varint(&mut body, 2 << 3);
        put_varint(&mut body, 500);

        let mut buf = Vec::new();
        put_varint(&mut buf, (1 << 3) | 2);
        put_varint(&mut buf, body.len() as u64);
        buf.extend_from_slice(&body);

        let records = decode_comment_segment(&buf).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].progress_ms, 500);
    }

    #[test]
    fn test_decode_empty_segment() {
        assert!(decode_comment_segment(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_decode_truncated_record_fails() {
        let mut buf = Vec::new();
        put_varint(&mut buf, (1 << 3) | 2);
        put_varint(&mut buf, 100); // claims 100 bytes, provides none
        assert!(matches!(
            decode_comment_segment(&buf),
            Err(DecodeError::Truncated(_))
        ));
    }

    #[test]
    fn test_decode_invalid_utf8_content_fails() {
        let mut body = Vec::new();
        put_varint(&mut body, (7 << 3) | 2);
        put_varint(&mut body, 2);
        body.extend_from_slice(&[0xff, 0xfe]);

        let mut buf = Vec::new();
        put_varint(&mut buf, (1 << 3) | 2);
        put_varint(&mut buf, body.len() as u64);
        buf.extend_from_slice(&body);

        assert!(matches!(
            decode_comment_segment(&buf),
            Err(DecodeError::InvalidUtf8)
        ));
    }
}

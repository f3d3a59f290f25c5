//! Character-set codecs
//!
//! One tagged enum covers the fixed codec set; the variant is selected once
//! at construction from the encoding identifier, so the per-character hot
//! path is a direct match with no dispatch through pointers.
//!
//! Decoding works against a 4-byte scratch buffer owned by the text scanner:
//! the codec states how many bytes it needs, the scanner fills the buffer
//! from the byte source, and the codec turns the complete prefix into a
//! Unicode scalar. Scalar 0 is the end-of-data sentinel throughout.

use crate::core::source::{ByteSource, Fetch};
use crate::error::Error;

/// Upper-half mapping for an ISO-8859 codepage (bytes 0x80..=0xFF)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoPage(&'static [u32; 128]);

impl IsoPage {
    /// Build a page from a caller-supplied upper-half table
    pub const fn new(table: &'static [u32; 128]) -> Self {
        IsoPage(table)
    }

    #[inline]
    fn decode(self, byte: u8) -> u32 {
        self.0[(byte - 0x80) as usize]
    }

    fn encode(self, scalar: u32) -> Option<u8> {
        self.0
            .iter()
            .position(|&u| u == scalar)
            .map(|i| (i + 0x80) as u8)
    }
}

const LATIN1_TABLE: [u32; 128] = {
    let mut t = [0u32; 128];
    let mut i = 0;
    while i < 128 {
        t[i] = 0x80 + i as u32;
        i += 1;
    }
    t
};

/// ISO-8859-1: the upper half maps straight onto U+0080..U+00FF
pub const LATIN1: IsoPage = IsoPage::new(&LATIN1_TABLE);

/// A character-set codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Utf16Be,
    Utf16Le,
    Ucs2Be,
    Ucs2Le,
    Ucs4Be,
    Ucs4Le,
    IsoLatin(IsoPage),
}

/// Outcome of analyzing the scratch buffer prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Analysis {
    /// Need this many bytes in total before the character is complete
    More(u8),
    /// Complete character: scalar value and encoded length
    Done(u32, u8),
    /// The bytes cannot form a character in this codec
    Bad,
}

/// Result of fetching one character through a codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decoded {
    Scalar(u32),
    End,
    Pending,
    Malformed,
}

impl Charset {
    /// Resolve an encoding identifier
    ///
    /// Matching is case-insensitive and ignores spaces, hyphens and
    /// underscores: `UTF-8`, `utf8` and `UTF 8` are all equivalent. The
    /// empty string selects UTF-8.
    pub fn from_name(name: &str) -> Result<Charset, Error> {
        let norm: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let charset = match norm.as_str() {
            "" | "utf8" => Charset::Utf8,
            "utf16" | "utf16be" => Charset::Utf16Be,
            "utf16le" => Charset::Utf16Le,
            "ucs2" | "ucs2be" => Charset::Ucs2Be,
            "ucs2le" => Charset::Ucs2Le,
            "ucs4" | "ucs4be" => Charset::Ucs4Be,
            "ucs4le" => Charset::Ucs4Le,
            _ => {
                let page = norm
                    .strip_prefix("isolatin")
                    .or_else(|| norm.strip_prefix("iso8859"));
                match page {
                    Some("") | Some("1") => Charset::IsoLatin(LATIN1),
                    _ => return Err(Error::UnsupportedEncoding(name.to_string())),
                }
            }
        };
        tracing::debug!(encoding = name, ?charset, "resolved encoding identifier");
        Ok(charset)
    }

    /// Maximum encoded length of one character, in bytes
    pub fn max_char_len(self) -> usize {
        match self {
            Charset::Utf8 | Charset::Ucs4Be | Charset::Ucs4Le => 4,
            Charset::Utf16Be | Charset::Utf16Le => 4,
            Charset::Ucs2Be | Charset::Ucs2Le => 2,
            Charset::IsoLatin(_) => 1,
        }
    }

    /// Classify the scratch-buffer prefix `buf[..fill]`
    pub(crate) fn analyze(self, buf: &[u8; 4], fill: u8) -> Analysis {
        let fill = fill as usize;
        match self {
            Charset::Utf8 => analyze_utf8(buf, fill),
            Charset::Utf16Be => analyze_utf16(buf, fill, false),
            Charset::Utf16Le => analyze_utf16(buf, fill, true),
            Charset::Ucs2Be | Charset::Ucs2Le => {
                if fill < 2 {
                    return Analysis::More(2);
                }
                let u = if self == Charset::Ucs2Le {
                    u16::from_le_bytes([buf[0], buf[1]])
                } else {
                    u16::from_be_bytes([buf[0], buf[1]])
                } as u32;
                if is_surrogate(u) {
                    Analysis::Bad
                } else {
                    Analysis::Done(u, 2)
                }
            }
            Charset::Ucs4Be | Charset::Ucs4Le => {
                if fill < 4 {
                    return Analysis::More(4);
                }
                let u = if self == Charset::Ucs4Le {
                    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
                } else {
                    u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
                };
                if u > 0x10FFFF || is_surrogate(u) {
                    Analysis::Bad
                } else {
                    Analysis::Done(u, 4)
                }
            }
            Charset::IsoLatin(page) => {
                if fill < 1 {
                    return Analysis::More(1);
                }
                let b = buf[0];
                if b < 0x80 {
                    Analysis::Done(b as u32, 1)
                } else {
                    Analysis::Done(page.decode(b), 1)
                }
            }
        }
    }

    /// Pull bytes from `src` into the scratch buffer until the current
    /// character is complete, then decode it.
    ///
    /// Partial trailing bytes at end of data decode as end-of-text, never as
    /// a malformed scalar. `Pending` leaves the partial fill in place so a
    /// later call resumes where this one stopped.
    pub(crate) fn fetch<S: ByteSource>(
        self,
        buf: &mut [u8; 4],
        fill: &mut u8,
        src: &mut S,
    ) -> Decoded {
        loop {
            match self.analyze(buf, *fill) {
                Analysis::Done(0, _) => return Decoded::End,
                Analysis::Done(u, _) => return Decoded::Scalar(u),
                Analysis::Bad => return Decoded::Malformed,
                Analysis::More(_) => match src.peek() {
                    Fetch::Byte(b) => {
                        buf[*fill as usize] = b;
                        *fill += 1;
                        src.advance();
                    }
                    Fetch::End => return Decoded::End,
                    Fetch::Pending => return Decoded::Pending,
                },
            }
        }
    }

    /// Append one Unicode scalar to `out` in this codec's canonical form
    ///
    /// Scalars a fixed-width codec cannot represent print as `?`.
    pub fn print(self, scalar: u32, out: &mut Vec<u8>) {
        match self {
            Charset::Utf8 => match char::from_u32(scalar) {
                Some(c) => {
                    let mut b = [0u8; 4];
                    out.extend_from_slice(c.encode_utf8(&mut b).as_bytes());
                }
                None => out.push(b'?'),
            },
            Charset::Utf16Be | Charset::Utf16Le => {
                let le = self == Charset::Utf16Le;
                if scalar > 0x10FFFF || is_surrogate(scalar) {
                    push_u16(b'?' as u16, le, out);
                } else if scalar < 0x10000 {
                    push_u16(scalar as u16, le, out);
                } else {
                    let v = scalar - 0x10000;
                    push_u16((0xD800 + (v >> 10)) as u16, le, out);
                    push_u16((0xDC00 + (v & 0x3FF)) as u16, le, out);
                }
            }
            Charset::Ucs2Be | Charset::Ucs2Le => {
                let le = self == Charset::Ucs2Le;
                if scalar < 0x10000 && !is_surrogate(scalar) {
                    push_u16(scalar as u16, le, out);
                } else {
                    push_u16(b'?' as u16, le, out);
                }
            }
            Charset::Ucs4Be | Charset::Ucs4Le => {
                let v = if scalar > 0x10FFFF || is_surrogate(scalar) {
                    b'?' as u32
                } else {
                    scalar
                };
                if self == Charset::Ucs4Le {
                    out.extend_from_slice(&v.to_le_bytes());
                } else {
                    out.extend_from_slice(&v.to_be_bytes());
                }
            }
            Charset::IsoLatin(page) => {
                if scalar < 0x80 {
                    out.push(scalar as u8);
                } else {
                    out.push(page.encode(scalar).unwrap_or(b'?'));
                }
            }
        }
    }
}

fn analyze_utf8(buf: &[u8; 4], fill: usize) -> Analysis {
    if fill < 1 {
        return Analysis::More(1);
    }
    let b0 = buf[0];
    let len = match b0 {
        0x00..=0x7F => return Analysis::Done(b0 as u32, 1),
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => return Analysis::Bad,
    };
    if fill < len {
        return Analysis::More(len as u8);
    }
    let mut scalar = (b0 as u32) & (0x7Fu32 >> len);
    for &b in &buf[1..len] {
        if b & 0xC0 != 0x80 {
            return Analysis::Bad;
        }
        scalar = (scalar << 6) | (b as u32 & 0x3F);
    }
    if scalar > 0x10FFFF || is_surrogate(scalar) {
        return Analysis::Bad;
    }
    Analysis::Done(scalar, len as u8)
}

fn analyze_utf16(buf: &[u8; 4], fill: usize, le: bool) -> Analysis {
    if fill < 2 {
        return Analysis::More(2);
    }
    let unit = |hi: u8, lo: u8| -> u32 {
        if le {
            u16::from_le_bytes([hi, lo]) as u32
        } else {
            u16::from_be_bytes([hi, lo]) as u32
        }
    };
    let u0 = unit(buf[0], buf[1]);
    match u0 {
        0xD800..=0xDBFF => {
            if fill < 4 {
                return Analysis::More(4);
            }
            let u1 = unit(buf[2], buf[3]);
            if !(0xDC00..=0xDFFF).contains(&u1) {
                return Analysis::Bad;
            }
            Analysis::Done(0x10000 + ((u0 - 0xD800) << 10) + (u1 - 0xDC00), 4)
        }
        0xDC00..=0xDFFF => Analysis::Bad,
        _ => Analysis::Done(u0, 2),
    }
}

#[inline]
fn is_surrogate(u: u32) -> bool {
    (0xD800..=0xDFFF).contains(&u)
}

#[inline]
fn push_u16(v: u16, le: bool, out: &mut Vec<u8>) {
    if le {
        out.extend_from_slice(&v.to_le_bytes());
    } else {
        out.extend_from_slice(&v.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::SliceSource;

    fn fetch_all(charset: Charset, data: &[u8]) -> Vec<u32> {
        let mut src = SliceSource::new(data);
        let mut buf = [0u8; 4];
        let mut fill = 0u8;
        let mut out = Vec::new();
        loop {
            match charset.fetch(&mut buf, &mut fill, &mut src) {
                Decoded::Scalar(u) => {
                    out.push(u);
                    fill = 0;
                }
                Decoded::End => break,
                other => panic!("unexpected decode result: {:?}", other),
            }
        }
        out
    }

    #[test]
    fn test_encoding_identifier_equivalences() {
        let a = Charset::from_name("UTF-8").unwrap();
        let b = Charset::from_name("utf8").unwrap();
        let c = Charset::from_name("UTF 8").unwrap();
        assert_eq!(a, Charset::Utf8);
        assert_eq!(a, b);
        assert_eq!(b, c);

        assert_eq!(Charset::from_name("UTF-16").unwrap(), Charset::Utf16Be);
        assert_eq!(Charset::from_name("ucs-2le").unwrap(), Charset::Ucs2Le);
        assert_eq!(
            Charset::from_name("ISO-8859-1").unwrap(),
            Charset::IsoLatin(LATIN1)
        );
        assert_eq!(
            Charset::from_name("isolatin").unwrap(),
            Charset::IsoLatin(LATIN1)
        );
    }

    #[test]
    fn test_scratch_buffer_covers_max_char_len() {
        assert_eq!(Charset::Utf8.max_char_len(), 4);
        assert_eq!(Charset::Utf16Le.max_char_len(), 4);
        assert_eq!(Charset::Ucs2Be.max_char_len(), 2);
        assert_eq!(Charset::IsoLatin(LATIN1).max_char_len(), 1);
    }

    #[test]
    fn test_unknown_encoding_fails_construction() {
        assert!(matches!(
            Charset::from_name("ebcdic"),
            Err(Error::UnsupportedEncoding(_))
        ));
        assert!(Charset::from_name("iso8859-5").is_err());
    }

    #[test]
    fn test_utf8_multibyte_decode() {
        // "aé€𝄞"
        let data = "a\u{e9}\u{20ac}\u{1d11e}".as_bytes();
        assert_eq!(fetch_all(Charset::Utf8, data), vec![0x61, 0xE9, 0x20AC, 0x1D11E]);
    }

    #[test]
    fn test_utf16be_surrogate_pair_decode() {
        // U+1D11E = D834 DD1E
        let data = [0x00, 0x61, 0xD8, 0x34, 0xDD, 0x1E];
        assert_eq!(fetch_all(Charset::Utf16Be, &data), vec![0x61, 0x1D11E]);
    }

    #[test]
    fn test_utf16le_decode() {
        let data = [0x3C, 0x00, 0x61, 0x00];
        assert_eq!(fetch_all(Charset::Utf16Le, &data), vec![b'<' as u32, b'a' as u32]);
    }

    #[test]
    fn test_latin1_upper_half() {
        assert_eq!(fetch_all(Charset::IsoLatin(LATIN1), &[0xE9]), vec![0xE9]);
    }

    #[test]
    fn test_partial_trailing_bytes_yield_end() {
        // Lead byte of a 3-byte sequence with nothing after it.
        let mut src = SliceSource::new(&[0xE2]);
        let mut buf = [0u8; 4];
        let mut fill = 0u8;
        assert_eq!(
            Charset::Utf8.fetch(&mut buf, &mut fill, &mut src),
            Decoded::End
        );
    }

    #[test]
    fn test_invalid_continuation_is_malformed() {
        let mut src = SliceSource::new(&[0xC3, 0x2F]);
        let mut buf = [0u8; 4];
        let mut fill = 0u8;
        assert_eq!(
            Charset::Utf8.fetch(&mut buf, &mut fill, &mut src),
            Decoded::Malformed
        );
    }

    #[test]
    fn test_ucs2_print_falls_back_to_question_mark() {
        let mut out = Vec::new();
        Charset::Ucs2Be.print(0x1D11E, &mut out);
        assert_eq!(out, vec![0x00, b'?']);
    }

    #[test]
    fn test_utf16_print_surrogate_pair() {
        let mut out = Vec::new();
        Charset::Utf16Be.print(0x1D11E, &mut out);
        assert_eq!(out, vec![0xD8, 0x34, 0xDD, 0x1E]);
    }

    #[test]
    fn test_latin1_print() {
        let mut out = Vec::new();
        Charset::IsoLatin(LATIN1).print(0xE9, &mut out);
        Charset::IsoLatin(LATIN1).print(0x20AC, &mut out);
        assert_eq!(out, vec![0xE9, b'?']);
    }

    #[test]
    fn test_ucs4_roundtrip() {
        let mut out = Vec::new();
        Charset::Ucs4Le.print(0x1D11E, &mut out);
        assert_eq!(fetch_all(Charset::Ucs4Le, &out), vec![0x1D11E]);
    }
}

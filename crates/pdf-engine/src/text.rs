//! Standard-font metrics, line wrapping and single-byte text encoding.
//!
//! Widths are in 1/1000 em, as published in the Adobe core font metrics.

use crate::edit::StandardFont;

/// Helvetica advance widths for the printable ASCII range (0x20..=0x7E).
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const HELVETICA_FALLBACK: u16 = 556;

/// ZapfDingbats "a20" (check mark) and "a21" (heavy check mark).
const ZAPF_CHECK: u8 = 0x34;
const ZAPF_HEAVY_CHECK: u8 = 0x35;
const ZAPF_CHECK_WIDTH: u16 = 760;

fn glyph_width(font: StandardFont, ch: char) -> u16 {
    match font {
        StandardFont::Helvetica => match ch {
            ' '..='~' => HELVETICA_ASCII[ch as usize - 0x20],
            _ => HELVETICA_FALLBACK,
        },
        StandardFont::ZapfDingbats => ZAPF_CHECK_WIDTH,
    }
}

/// Width of `text` in points when set in `font` at `size`.
pub fn text_width(font: StandardFont, text: &str, size: f32) -> f32 {
    let units: u32 = text.chars().map(|ch| u32::from(glyph_width(font, ch))).sum();
    units as f32 * size / 1000.0
}

/// Breaks `text` into lines no wider than `max_width`.
///
/// Explicit newlines always break. Words are packed greedily; a single word
/// wider than `max_width` keeps a line to itself rather than being split.
pub fn wrap_text(font: StandardFont, text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut current = String::new();

        for word in paragraph.split(' ') {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }

            let candidate_width = text_width(font, &current, size)
                + text_width(font, " ", size)
                + text_width(font, word, size);

            if candidate_width <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }

        lines.push(current);
    }

    lines
}

/// Encodes `text` into the single-byte encoding declared for `font`.
///
/// Helvetica uses WinAnsiEncoding; characters outside it become `?`.
/// ZapfDingbats maps the Unicode check marks onto their built-in codes.
pub fn encode(font: StandardFont, text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match font {
            StandardFont::Helvetica => encode_win_ansi(ch),
            StandardFont::ZapfDingbats => match ch {
                '\u{2713}' => ZAPF_CHECK,
                '\u{2714}' => ZAPF_HEAVY_CHECK,
                ' '..='~' => ch as u8,
                _ => ZAPF_CHECK,
            },
        })
        .collect()
}

fn encode_win_ansi(ch: char) -> u8 {
    match ch {
        '\t' => b' ',
        ' '..='~' => ch as u8,
        '\u{a0}'..='\u{ff}' => ch as u32 as u8,
        '\u{20ac}' => 0x80,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        _ => b'?',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_helvetica_text() {
        // H=722, e=556, l=222, l=222, o=556 -> 2278 units
        let width = text_width(StandardFont::Helvetica, "Hello", 10.0);
        assert!((width - 22.78).abs() < 1e-4);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_text(StandardFont::Helvetica, "one two three four", 12.0, 50.0);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }

    #[test]
    fn keeps_overlong_word_on_its_own_line() {
        let lines = wrap_text(StandardFont::Helvetica, "a incomprehensibilities b", 12.0, 40.0);
        assert_eq!(lines, vec!["a", "incomprehensibilities", "b"]);
    }

    #[test]
    fn explicit_newlines_always_break() {
        let lines = wrap_text(StandardFont::Helvetica, "first\nsecond", 12.0, 500.0);
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        assert_eq!(wrap_text(StandardFont::Helvetica, "", 12.0, 100.0), vec![String::new()]);
    }

    #[test]
    fn encodes_check_mark_for_zapf_dingbats() {
        assert_eq!(encode(StandardFont::ZapfDingbats, "\u{2713}"), vec![0x34]);
    }

    #[test]
    fn encodes_latin1_and_replaces_unknown() {
        assert_eq!(encode(StandardFont::Helvetica, "é€\u{4e2d}"), vec![0xe9, 0x80, b'?']);
    }
}

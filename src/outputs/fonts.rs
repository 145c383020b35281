//! Metrics and encoding for the standard Helvetica faces.
//!
//! The digest only uses the PDF base-14 Helvetica family, so nothing is
//! embedded. Text is encoded as WinAnsi; glyph widths come from the Adobe AFM
//! tables (units per 1000 em) and drive line wrapping and right alignment.

/// The three faces the layout uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Font {
    Regular,
    Bold,
    Italic,
}

impl Font {
    pub const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Italic];

    /// Name of the font in the page resource dictionary.
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Italic => "Helvetica-Oblique",
        }
    }
}

/// Helvetica widths for ' ' through '~'. Helvetica-Oblique shares them.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold widths for ' ' through '~'.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Map a character to its WinAnsi code, or `None` if the encoding lacks it.
fn win_ansi(c: char) -> Option<u8> {
    let code = match c {
        ' '..='~' => c as u8,
        '\u{a0}'..='\u{ff}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        '\t' => b' ',
        _ => return None,
    };
    Some(code)
}

/// Encode text for a `Tj` operand. Unsupported characters become `?`,
/// control characters are dropped.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .map(|c| win_ansi(c).unwrap_or(b'?'))
        .collect()
}

/// Advance width of a character in 1/1000 em.
fn glyph_width(c: char, font: Font) -> u16 {
    let table = match font {
        Font::Bold => &HELVETICA_BOLD,
        Font::Regular | Font::Italic => &HELVETICA,
    };
    let code = win_ansi(c).unwrap_or(b'?');
    match code {
        0x20..=0x7e => table[(code - 0x20) as usize],
        // Typographic punctuation and Latin-1 letters: close enough to a digit
        0x91 | 0x92 | 0x82 => 222,
        0x93 | 0x94 | 0x84 => 333,
        0x95 | 0xb7 => 350,
        0x96 => 556,
        0x97 | 0x85 | 0x89 => 1000,
        _ => 556,
    }
}

/// Width of `text` set in `font` at `size` points.
pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| glyph_width(c, font) as u32)
        .sum();
    units as f32 * size / 1000.0
}

/// Greedy word wrap into lines no wider than `max_width`.
///
/// Words wider than a full line are broken between characters.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let space = text_width(" ", font, size);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0.0_f32;

    for word in text.split_whitespace() {
        let word_width = text_width(word, font, size);

        if word_width > max_width {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line_width = 0.0;
            }
            for c in word.chars() {
                let w = text_width(c.encode_utf8(&mut [0; 4]), font, size);
                if line_width + w > max_width && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0.0;
                }
                line.push(c);
                line_width += w;
            }
            continue;
        }

        if line.is_empty() {
            line.push_str(word);
            line_width = word_width;
        } else if line_width + space + word_width <= max_width {
            line.push(' ');
            line.push_str(word);
            line_width += space + word_width;
        } else {
            lines.push(std::mem::replace(&mut line, word.to_string()));
            line_width = word_width;
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

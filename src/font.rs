use lopdf::{dictionary, Dictionary};

/// Standard 14 fonts, so nothing needs embedding. Text is WinAnsi encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

// AFM advance widths for 0x20..=0x7E, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const WIN_ANSI_BULLET: u8 = 0x95;
const WIN_ANSI_EN_DASH: u8 = 0x96;
const WIN_ANSI_EM_DASH: u8 = 0x97;

impl StandardFont {
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Resource name used in content streams. Prefixed so it cannot clash
    /// with font names already present on copied pages.
    pub fn resource_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "PvHelv",
            StandardFont::HelveticaBold => "PvHelvB",
        }
    }

    pub fn cap_height(self) -> f32 {
        0.718
    }

    pub fn dictionary(self) -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.base_font(),
            "Encoding" => "WinAnsiEncoding",
        }
    }

    fn glyph_width(self, byte: u8) -> u16 {
        let table = match self {
            StandardFont::Helvetica => &HELVETICA_WIDTHS,
            StandardFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        match byte {
            0x20..=0x7E => table[(byte - 0x20) as usize],
            WIN_ANSI_BULLET => 350,
            WIN_ANSI_EN_DASH => 556,
            WIN_ANSI_EM_DASH => 1000,
            _ => 556,
        }
    }

    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|b| self.glyph_width(b) as u32)
            .sum();
        units as f32 * size / 1000.0
    }
}

pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{2022}' => WIN_ANSI_BULLET,
            '\u{2013}' => WIN_ANSI_EN_DASH,
            '\u{2014}' => WIN_ANSI_EM_DASH,
            '\u{00A0}'..='\u{00FF}' => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Font resource dictionary for both fonts, keyed by resource name.
pub fn font_resources() -> Dictionary {
    let mut fonts = Dictionary::new();
    for font in [StandardFont::Helvetica, StandardFont::HelveticaBold] {
        fonts.set(font.resource_name(), font.dictionary());
    }
    fonts
}

//! Entry name decoding.
//!
//! Names flagged as UTF-8 (general purpose bit 11) are always decoded as
//! UTF-8. Other names are decoded with the [`Charset`] the caller picks.
//! Legacy archivers write IBM code page 437; Windows tools in East Asian
//! locales write the ANSI code page, e.g. GBK or Shift_JIS.

use encoding_rs::Encoding;

use crate::{Error, Result};

/// Character set used to decode entry names that are not flagged as UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    /// UTF-8; invalid sequences are replaced with U+FFFD.
    #[default]
    Utf8,
    /// IBM PC code page 437.
    Cp437,
    /// Any encoding known to the WHATWG Encoding Standard.
    Encoding(&'static Encoding),
}

impl Charset {
    /// Looks up a charset by label, such as `"GBK"`, `"Shift_JIS"`,
    /// `"cp437"` or `"utf-8"`. Labels are matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an unknown label.
    pub fn from_label(label: &str) -> Result<Self> {
        let trimmed = label.trim();
        if ["cp437", "ibm437", "437"]
            .iter()
            .any(|alias| trimmed.eq_ignore_ascii_case(alias))
        {
            return Ok(Self::Cp437);
        }

        match Encoding::for_label(trimmed.as_bytes()) {
            Some(encoding) if encoding == encoding_rs::UTF_8 => Ok(Self::Utf8),
            Some(encoding) => Ok(Self::Encoding(encoding)),
            None => Err(Error::InvalidArgument(format!("unknown charset '{label}'"))),
        }
    }

    /// Returns the canonical name of the charset.
    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Cp437 => "IBM437",
            Self::Encoding(encoding) => encoding.name(),
        }
    }

    /// Decodes raw name bytes. Unmappable sequences become U+FFFD.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Cp437 => bytes.iter().map(|&b| to_char(b)).collect(),
            Self::Encoding(encoding) => encoding
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
        }
    }
}

impl std::str::FromStr for Charset {
    type Err = Error;

    fn from_str(label: &str) -> Result<Self> {
        Self::from_label(label)
    }
}

/// Decodes entry name or comment bytes using the header flags.
pub fn decode_name(bytes: &[u8], utf8_flag: bool, charset: Charset) -> String {
    if utf8_flag {
        Charset::Utf8.decode(bytes)
    } else {
        charset.decode(bytes)
    }
}

fn to_char(byte: u8) -> char {
    if byte < 0x80 {
        byte as char
    } else {
        HIGH_HALF[(byte - 0x80) as usize]
    }
}

#[rustfmt::skip]
const HIGH_HALF: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}',
];

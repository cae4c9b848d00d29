//! IBM PC code page 437.
//!
//! The lower half is passed through as ASCII so that control bytes (`ESC`,
//! `CR`, `LF`) reach the escape and line stages untouched. The upper half
//! maps to the box-drawing, accented and symbol glyphs BBS software paints
//! its screens with.

/// Glyphs for bytes `0x80..=0xFF`.
const HIGH_HALF: [char; 128] = [
    // 0x80
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç',
    'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    // 0x90
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù',
    'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    // 0xA0
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º',
    '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    // 0xB0
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖',
    '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    // 0xC0
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟',
    '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    // 0xD0
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫',
    '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    // 0xE0
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ',
    'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    // 0xF0
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈',
    '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}',
];

/// Map a single byte to its code page 437 character.
#[inline]
pub fn decode_byte(byte: u8) -> char {
    if byte < 0x80 {
        char::from(byte)
    } else {
        HIGH_HALF[usize::from(byte - 0x80)]
    }
}

/// Decode a whole chunk. Never fails; every byte yields exactly one char.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().copied().map(decode_byte).collect()
}

/// Map a character back to its code page 437 byte, if it has one.
pub fn encode_char(c: char) -> Option<u8> {
    if c.is_ascii() {
        return Some(c as u8);
    }

    HIGH_HALF
        .iter()
        .position(|&glyph| glyph == c)
        .map(|idx| 0x80 + idx as u8)
}

/// Encode outbound text. Characters without a code page 437 form become `?`.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars().map(|c| encode_char(c).unwrap_or(b'?')).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_and_controls_pass_through() {
        assert_eq!(decode(b"hi\x1b[0m\r\n"), "hi\u{1b}[0m\r\n");
    }

    #[test]
    fn high_half_maps_to_pc_glyphs() {
        assert_eq!(decode(&[0xC9, 0xCD, 0xBB]), "╔═╗");
        assert_eq!(decode(&[0x80, 0xE1, 0xFE]), "Çß■");
    }

    #[test]
    fn every_byte_decodes_to_one_char() {
        let all: Vec<u8> = (0..=255).collect();
        assert_eq!(decode(&all).chars().count(), 256);
    }

    #[test]
    fn encode_inverts_decode() {
        let all: Vec<u8> = (0..=255).collect();
        assert_eq!(encode(&decode(&all)), all);
    }

    #[test]
    fn encode_replaces_unmappable_chars() {
        assert_eq!(encode("a€b"), b"a?b");
    }
}

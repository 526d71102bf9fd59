//! Column width helpers
//!
//! Thermal printers lay out text on a fixed grid where East Asian wide
//! characters take two columns.

/// Printed width of a string in columns
pub fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

fn char_width(c: char) -> usize {
    let cp = c as u32;
    let wide = matches!(cp,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
    );
    if wide { 2 } else { 1 }
}

/// Truncate to at most `max_width` columns without splitting a character
pub fn truncate(s: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut width = 0;
    for c in s.chars() {
        let w = char_width(c);
        if width + w > max_width {
            break;
        }
        width += w;
        out.push(c);
    }
    out
}

/// Pad (or truncate) to exactly `width` columns
pub fn pad(s: &str, width: usize, align_right: bool) -> String {
    let s = truncate(s, width);
    let fill = " ".repeat(width - display_width(&s));
    if align_right {
        format!("{}{}", fill, s)
    } else {
        format!("{}{}", s, fill)
    }
}

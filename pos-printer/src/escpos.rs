//! ESC/POS command builder
//!
//! Builds the byte stream for a thermal printer and, alongside it, a plain
//! text rendering of the same content. The text mirror is what ends up in
//! fallback documents when no printer can take the job.

use crate::text::display_width;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
    Right,
}

/// ESC/POS command builder
pub struct EscPosBuilder {
    buf: Vec<u8>,
    text: String,
    width: usize,
    align: Align,
}

impl EscPosBuilder {
    /// Create a new builder with the specified paper width in characters
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize) -> Self {
        let mut buf = Vec::with_capacity(2048);
        // ESC @ - initialize
        buf.extend_from_slice(&[0x1B, 0x40]);
        Self {
            buf,
            text: String::new(),
            width,
            align: Align::Left,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    // === Text Output ===

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(b'\n');

        let w = display_width(s);
        let indent = match self.align {
            Align::Left => 0,
            Align::Center => self.width.saturating_sub(w) / 2,
            Align::Right => self.width.saturating_sub(w),
        };
        self.text.push_str(&" ".repeat(indent));
        self.text.push_str(s);
        self.text.push('\n');
        self
    }

    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self.text.push('\n');
        self
    }

    /// Feed n lines (ESC d n)
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        for _ in 0..lines {
            self.text.push('\n');
        }
        self
    }

    // === Alignment ===

    pub fn center(&mut self) -> &mut Self {
        self.align = Align::Center;
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x01]);
        self
    }

    pub fn left(&mut self) -> &mut Self {
        self.align = Align::Left;
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    pub fn right(&mut self) -> &mut Self {
        self.align = Align::Right;
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x02]);
        self
    }

    // === Text Style (no effect on the text mirror) ===

    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x01]);
        self
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x00]);
        self
    }

    /// Double width and height (GS ! 0x11)
    pub fn double_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x11]);
        self
    }

    pub fn reset_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x00]);
        self
    }

    // === Separators ===

    pub fn sep_double(&mut self) -> &mut Self {
        let sep = "=".repeat(self.width);
        self.line(&sep)
    }

    pub fn sep_single(&mut self) -> &mut Self {
        let sep = "-".repeat(self.width);
        self.line(&sep)
    }

    // === Layout Helpers ===

    /// Left text left-aligned, right text right-aligned, spaces in between
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = display_width(left);
        let rw = display_width(right);
        let line = if lw + rw >= self.width {
            format!("{} {}", left, right)
        } else {
            format!("{}{}{}", left, " ".repeat(self.width - lw - rw), right)
        };
        let saved = self.align;
        self.align = Align::Left;
        self.line(&line);
        self.align = saved;
        self
    }

    // === Paper Control ===

    /// Feed a few lines and cut (GS V 66 n)
    pub fn cut(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x42, 3]);
        self
    }

    // === Build ===

    /// Final byte stream for the printer
    pub fn build(self) -> Vec<u8> {
        self.buf
    }

    /// Plain text rendering of the same content
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new(48)
    }
}

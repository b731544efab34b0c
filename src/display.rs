//! Drawing surface for the embedded display
//!
//! Modes paint into a [`Canvas`]; finishing the canvas produces a [`Frame`]
//! whose pixels are packed RGB565, which a [`DisplaySink`] transmits.
//! Glyph rasterization is left to the sink: text is carried as positioned runs.

use anyhow::Result;

use crate::controller::Color;

pub const DISPLAY_WIDTH: usize = 960;
pub const DISPLAY_HEIGHT: usize = 160;

/// Display columns, one per track encoder
pub const DISPLAY_COLUMNS: usize = 8;

/// Pack 8-bit RGB into RGB565
pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

/// A positioned text run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub x: usize,
    pub y: usize,
    pub text: String,
    pub color: Color,
}

/// Finished frame ready for transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    /// Row-major RGB565 pixels
    pub pixels: Vec<u16>,
    pub text: Vec<TextRun>,
}

impl Frame {
    pub fn pixel(&self, x: usize, y: usize) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// Concatenated text of every run, for logs and tests
    pub fn text_content(&self) -> String {
        self.text
            .iter()
            .map(|run| run.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Surface the active modes paint into during one tick
#[derive(Debug, Clone)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<u16>,
    text: Vec<TextRun>,
}

impl Canvas {
    /// Start a new frame, cleared to black
    pub fn begin_frame(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
            text: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Horizontal span (x, width) of display column `column`
    pub fn column(&self, column: usize) -> (usize, usize) {
        let w = self.width / DISPLAY_COLUMNS;
        (column * w, w)
    }

    pub fn fill(&mut self, color: Color) {
        let value = color.rgb565();
        self.pixels.iter_mut().for_each(|p| *p = value);
    }

    /// Fill a rectangle, clipped to the canvas
    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: Color) {
        let value = color.rgb565();
        let x_end = (x + w).min(self.width);
        let y_end = (y + h).min(self.height);
        for row in y.min(y_end)..y_end {
            let start = row * self.width;
            self.pixels[start + x.min(x_end)..start + x_end]
                .iter_mut()
                .for_each(|p| *p = value);
        }
    }

    pub fn draw_text(&mut self, x: usize, y: usize, text: impl Into<String>, color: Color) {
        self.text.push(TextRun {
            x,
            y,
            text: text.into(),
            color,
        });
    }

    /// Finish the frame
    pub fn end_frame(self) -> Frame {
        Frame {
            width: self.width,
            height: self.height,
            pixels: self.pixels,
            text: self.text,
        }
    }
}

/// Display transport collaborator
pub trait DisplaySink: Send {
    fn transmit(&mut self, frame: &Frame) -> Result<()>;
}

/// Sink used when no display is attached; drops every frame
#[derive(Debug, Default)]
pub struct NullDisplay {
    frames: u64,
}

impl NullDisplay {
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl DisplaySink for NullDisplay {
    fn transmit(&mut self, _frame: &Frame) -> Result<()> {
        self.frames += 1;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb565_packing() {
        assert_eq!(rgb565(0, 0, 0), 0x0000);
        assert_eq!(rgb565(255, 255, 255), 0xFFFF);
        assert_eq!(rgb565(255, 0, 0), 0xF800);
        assert_eq!(rgb565(0, 255, 0), 0x07E0);
        assert_eq!(rgb565(0, 0, 255), 0x001F);
    }

    #[test]
    fn test_fill_rect_is_clipped() {
        let mut canvas = Canvas::begin_frame(10, 4);
        canvas.fill_rect(8, 2, 10, 10, Color::White);
        let frame = canvas.end_frame();

        assert_eq!(frame.pixel(7, 2), Some(0));
        assert_eq!(frame.pixel(8, 2), Some(0xFFFF));
        assert_eq!(frame.pixel(9, 3), Some(0xFFFF));
        assert_eq!(frame.pixel(9, 1), Some(0));
        assert_eq!(frame.pixel(10, 3), None);
    }

    #[test]
    fn test_fill_rect_outside_canvas_is_ignored() {
        let mut canvas = Canvas::begin_frame(4, 4);
        canvas.fill_rect(10, 10, 2, 2, Color::Red);
        assert!(canvas.end_frame().pixels.iter().all(|p| *p == 0));
    }

    #[test]
    fn test_columns_split_width() {
        let canvas = Canvas::begin_frame(DISPLAY_WIDTH, DISPLAY_HEIGHT);
        assert_eq!(canvas.column(0), (0, 120));
        assert_eq!(canvas.column(7), (840, 120));
    }

    #[test]
    fn test_text_runs_are_kept() {
        let mut canvas = Canvas::begin_frame(4, 4);
        canvas.draw_text(0, 0, "Melodic", Color::White);
        canvas.draw_text(0, 10, "C4", Color::Yellow);
        assert_eq!(canvas.end_frame().text_content(), "Melodic C4");
    }
}

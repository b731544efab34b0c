//! Grid-and-button controller collaborator
//!
//! The controller delivers raw input events (pads, buttons, encoders, touch
//! strip, sustain pedal, connection) and accepts LED color updates.

pub mod layout;
mod link;
#[cfg(test)]
pub mod mock;

pub use link::MidiController;

use std::fmt;

/// Number of pads on the grid (8x8)
pub const PAD_COUNT: u8 = 64;
/// Pads per grid row
pub const GRID_SIZE: u8 = 8;

/// Named buttons exposed by the controller
pub mod buttons {
    pub const NOTE: &str = "note";
    pub const SETUP: &str = "setup";
    pub const BROWSE: &str = "browse";
    pub const DEVICE: &str = "device";
    pub const SELECT: &str = "select";
    pub const SHIFT: &str = "shift";
    pub const OCTAVE_UP: &str = "octave_up";
    pub const OCTAVE_DOWN: &str = "octave_down";
    pub const PAGE_LEFT: &str = "page_left";
    pub const PAGE_RIGHT: &str = "page_right";
    pub const PLAY: &str = "play";
    pub const RECORD: &str = "record";

    /// Upper row of eight buttons above the display
    pub const UPPER_ROW: [&str; 8] = [
        "upper_row_1",
        "upper_row_2",
        "upper_row_3",
        "upper_row_4",
        "upper_row_5",
        "upper_row_6",
        "upper_row_7",
        "upper_row_8",
    ];

    /// Lower row of eight buttons below the display
    pub const LOWER_ROW: [&str; 8] = [
        "lower_row_1",
        "lower_row_2",
        "lower_row_3",
        "lower_row_4",
        "lower_row_5",
        "lower_row_6",
        "lower_row_7",
        "lower_row_8",
    ];
}

/// Named rotary encoders
pub mod encoders {
    pub const TEMPO: &str = "tempo";
    pub const SWING: &str = "swing";
    pub const MASTER: &str = "master";

    /// Eight encoders above the display, left to right
    pub const TRACK: [&str; 8] = [
        "track_1", "track_2", "track_3", "track_4", "track_5", "track_6", "track_7", "track_8",
    ];

    /// Position of a track encoder (0-7)
    pub fn track_index(name: &str) -> Option<usize> {
        TRACK.iter().position(|e| *e == name)
    }
}

/// A pad on the grid. Row 0 is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pad {
    pub index: u8,
    pub row: u8,
    pub col: u8,
}

impl Pad {
    pub fn from_index(index: u8) -> Self {
        Self {
            index,
            row: index / GRID_SIZE,
            col: index % GRID_SIZE,
        }
    }

    pub fn from_coords(row: u8, col: u8) -> Self {
        Self {
            index: row * GRID_SIZE + col,
            row,
            col,
        }
    }

    /// Iterate over every pad on the grid
    pub fn all() -> impl Iterator<Item = Pad> {
        (0..PAD_COUNT).map(Pad::from_index)
    }
}

/// Raw input event from the controller
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    EncoderRotated { encoder: String, delta: i32 },
    PadPressed { pad: Pad, velocity: u8 },
    PadReleased { pad: Pad, velocity: u8 },
    PadAftertouch { pad: Pad, pressure: u8 },
    ButtonPressed { button: String },
    ButtonReleased { button: String },
    /// Touch strip position, 0-16383 with 8192 at rest
    TouchStrip { value: u16 },
    SustainPedal { on: bool },
    ConnectionEstablished,
}

impl InputEvent {
    /// Short event kind label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            InputEvent::EncoderRotated { .. } => "encoder_rotated",
            InputEvent::PadPressed { .. } => "pad_pressed",
            InputEvent::PadReleased { .. } => "pad_released",
            InputEvent::PadAftertouch { .. } => "pad_aftertouch",
            InputEvent::ButtonPressed { .. } => "button_pressed",
            InputEvent::ButtonReleased { .. } => "button_released",
            InputEvent::TouchStrip { .. } => "touchstrip",
            InputEvent::SustainPedal { .. } => "sustain_pedal",
            InputEvent::ConnectionEstablished => "connection_established",
        }
    }
}

/// LED / display colors. The discriminant is the hardware palette index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black = 0,
    White = 1,
    LightGray = 2,
    DarkGray = 3,
    Red = 4,
    Orange = 5,
    Yellow = 6,
    Green = 7,
    Cyan = 8,
    Blue = 9,
    Purple = 10,
    Pink = 11,
}

impl Color {
    pub const ALL: [Color; 12] = [
        Color::Black,
        Color::White,
        Color::LightGray,
        Color::DarkGray,
        Color::Red,
        Color::Orange,
        Color::Yellow,
        Color::Green,
        Color::Cyan,
        Color::Blue,
        Color::Purple,
        Color::Pink,
    ];

    /// Color used for pads and buttons with nothing assigned
    pub const IDLE: Color = Color::Black;

    pub fn palette_index(self) -> u8 {
        self as u8
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Color::Black => (0, 0, 0),
            Color::White => (255, 255, 255),
            Color::LightGray => (180, 180, 180),
            Color::DarkGray => (60, 60, 60),
            Color::Red => (255, 0, 0),
            Color::Orange => (255, 140, 0),
            Color::Yellow => (255, 240, 0),
            Color::Green => (0, 255, 0),
            Color::Cyan => (0, 230, 230),
            Color::Blue => (0, 60, 255),
            Color::Purple => (150, 0, 255),
            Color::Pink => (255, 60, 170),
        }
    }

    /// Packed 16-bit RGB565 value for the display
    pub fn rgb565(self) -> u16 {
        let (r, g, b) = self.rgb();
        crate::display::rgb565(r, g, b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Controller collaborator used by the application and the modes.
///
/// All methods take `&self`; implementations use interior mutability so the
/// controller can be shared as `Arc<dyn Controller>`.
pub trait Controller: Send + Sync {
    /// Substring of the controller's own MIDI port name (excluded from routing)
    fn port_name(&self) -> &str;

    fn is_connected(&self) -> bool;

    /// Upload the full output color palette
    fn apply_palette(&self, palette: &[Color]);

    fn set_pad_color(&self, pad: Pad, color: Color);

    fn set_button_color(&self, button: &str, color: Color);

    /// Set every pad and button to `color`
    fn reset_all(&self, color: Color);

    /// Delayed / periodic work, called once per tick
    fn check_delayed_actions(&self) {}

    /// Halt outstanding waits before process exit
    fn stop(&self) {}
}

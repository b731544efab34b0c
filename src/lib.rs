//! padctl: mode-stack runtime for grid-and-button MIDI controllers
//!
//! Composable modes own the controller's pads, buttons, encoders and display.
//! Modes sharing an xor group are mutually exclusive; input events walk the
//! active modes newest first until one handles them.

pub mod app;
pub mod config;
pub mod controller;
pub mod display;
pub mod midi;
pub mod midi_io;
pub mod modes;
pub mod paths;
pub mod project;

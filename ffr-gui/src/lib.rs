//! FFR Check Desktop Form
//!
//! This crate provides an egui form that builds the `ffrcheck` argument
//! list, runs the command on a worker thread and streams its output.

pub mod command;
pub mod gui;
pub mod runner;

pub use command::{display_command, FormError, RunForm};
pub use gui::GuiApp;
pub use runner::{ffrcheck_program, RunEvent, RunHandle};

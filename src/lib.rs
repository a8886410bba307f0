pub mod core;
pub mod gui;
pub mod layout;
pub mod net;
pub mod persistence;
pub mod roster;
pub mod summary;
pub mod tasks;

pub use crate::core::{
    BoardError,
    DisplaySettings,
};

pub mod battery;
pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod event;
pub mod framer;
pub mod keyboard;
pub mod keymap;
pub mod matrix;
pub mod mcu;
pub mod packet;
pub mod touch;


pub use config::LinkConfig;
pub use error::LinkError;
pub use event::{InputEvent, KeyEvent, TouchSample};
pub use framer::{Framer, SerialPort};
pub use mcu::{Command, Mcu, McuPort};

//! WebSocket wire protocol definitions.

pub mod frames;

pub use frames::{ClientFrame, ServerFrame, TypingFrame, TypingUser};

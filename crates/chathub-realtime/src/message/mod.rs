//! Wire frame definitions and boundary decoding.

pub mod frames;

pub use frames::{ClientFrame, FrameError, ServerFrame, decode_client_frame};

//! Recording system module
//!
//! - RecordingSessionService: the recording state machine
//! - state: session status, capture intent and output naming

pub mod session;
pub mod state;

pub use session::RecordingSessionService;
pub use state::{can_start_recording, CaptureIntent, SessionSnapshot, SessionStatus};

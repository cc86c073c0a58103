//! Export pipeline: format negotiation, capture and the recording state machine.

/// Export controller and session state.
pub mod session;

pub mod client;

pub use client::{Payload, SessionState, SessionStateClient};

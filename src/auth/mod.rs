pub mod orchestrator;

pub use orchestrator::{Authenticator, SessionInfo, UserSummary};

pub mod session_cache;
pub mod token_bundle;

pub use session_cache::{SessionCache, SessionKey};
pub use token_bundle::{TokenBundle, TokenInfo, TokenResponse, TokenStatus};

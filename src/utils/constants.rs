//! Shared constants and invariants

pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 30;
pub const IDP_HTTP_TIMEOUT_SECS: u64 = 10;
pub const SESSION_STATE_HTTP_TIMEOUT_SECS: u64 = 10;
pub const ERROR_BODY_SNIPPET_CHARS: usize = 200;

pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";
pub const OPENID_SCOPE: &str = "openid profile email";

// Local file backend
pub const TOKEN_DIR_NAME: &str = ".onto_mcp";
pub const TOKEN_FILE_NAME: &str = "tokens.json";
pub const OBFUSCATION_KEY: &str = "onto_mcp_2025";

// Session-state backend
pub const SESSION_STATE_TOKENS_KEY: &str = "tokens";
pub const SESSION_STATE_API_KEY_HEADER: &str = "X-API-Key";

// Supported deployment modes
pub const MODE_STDIO: &str = "stdio";
pub const MODE_HTTP: &str = "http";

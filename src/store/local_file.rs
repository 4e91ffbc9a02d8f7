use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::session_cache::SessionKey;
use crate::cache::token_bundle::TokenBundle;
use crate::error::AuthError;
use crate::helpers::time::now_i64;
use crate::store::obfuscation::{deobfuscate, obfuscate};
use crate::store::TokenStore;
use crate::utils::constants::TOKEN_FILE_NAME;

/// Token store for a single local process: `<dir>/tokens.json`.
///
/// The file is read once when the store is opened and rewritten in full on
/// every mutation. Access and refresh tokens are masked on disk. There is no
/// protection against a second process writing the same file.
#[derive(Debug)]
pub struct LocalFileTokenStore {
    path: PathBuf,
    bundle: RwLock<TokenBundle>,
}

impl LocalFileTokenStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, AuthError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;
        let path = dir.join(TOKEN_FILE_NAME);
        let bundle = read_token_file(&path).await;

        Ok(Self {
            path,
            bundle: RwLock::new(bundle),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_token_file(&self, bundle: &TokenBundle) -> Result<(), AuthError> {
        let mut on_disk = bundle.clone();
        on_disk.access_token = on_disk.access_token.as_deref().map(obfuscate);
        on_disk.refresh_token = on_disk.refresh_token.as_deref().map(obfuscate);
        let content = serde_json::to_string_pretty(&on_disk)?;

        // write next to the target, then rename over it
        let tmp = self.path.with_file_name(format!(".{}.tmp-{}", TOKEN_FILE_NAME, std::process::id()));
        let _ = fs::remove_file(&tmp).await;

        if let Err(e) = write_private(&tmp, content.as_bytes()).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        info!("saved tokens to {}", self.path.display());
        Ok(())
    }
}

/// Create `path` readable by the owner only and fill it with `data`.
async fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}

impl TokenStore for LocalFileTokenStore {
    async fn load(&self, _session: Option<&SessionKey>) -> Result<TokenBundle, AuthError> {
        Ok(self.bundle.read().await.clone())
    }

    /// Memory follows the file: a failed write leaves the previous bundle in place.
    async fn store(&self, _session: Option<&SessionKey>, bundle: TokenBundle) -> Result<(), AuthError> {
        let bundle = bundle.touch(now_i64());
        let mut guard = self.bundle.write().await;
        self.write_token_file(&bundle).await?;
        *guard = bundle;
        Ok(())
    }

    async fn clear(&self, _session: Option<&SessionKey>) -> Result<(), AuthError> {
        let mut guard = self.bundle.write().await;

        match fs::remove_file(&self.path).await {
            Ok(()) => info!("removed token file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *guard = TokenBundle::default();
        Ok(())
    }
}

/// Missing or unreadable files load as the empty bundle.
async fn read_token_file(path: &Path) -> TokenBundle {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return TokenBundle::default(),
        Err(e) => {
            warn!("failed to read token file {}: {}", path.display(), e);
            return TokenBundle::default();
        }
    };

    let mut bundle: TokenBundle = match serde_json::from_str(&content) {
        Ok(bundle) => bundle,
        Err(e) => {
            warn!("failed to parse token file {}: {}", path.display(), e);
            return TokenBundle::default();
        }
    };

    bundle.access_token = bundle.access_token.map(|t| unmask(&t));
    bundle.refresh_token = bundle.refresh_token.map(|t| unmask(&t));
    info!("loaded tokens from {}", path.display());
    bundle
}

/// Values that are not masked (older files) are kept as written.
fn unmask(value: &str) -> String {
    deobfuscate(value).unwrap_or_else(|e| {
        warn!("stored token kept as-is: {}", e);
        value.to_owned()
    })
}

//! CLI command modules.

pub mod chat;
pub mod groups;
pub mod http;
pub mod meetings;
pub mod users;

use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;

pub fn read_blob(path: &Path) -> Result<Bytes> {
    let data = std::fs::read(path).with_context(|| format!("failed to read file: {}", path.display()))?;
    Ok(Bytes::from(data))
}

pub fn write_blob(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data).with_context(|| format!("failed to write file: {}", path.display()))?;
    println!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

/// Print upload progress until the upload future resolves.
pub async fn with_progress<F, T>(store: &asynce_services::GroupStore, upload: F) -> Result<T>
where
    F: std::future::Future<Output = asynce_core::Result<T>>,
{
    let mut progress = store.upload_progress();
    let printer = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let fraction = *progress.borrow_and_update();
            println!("  {:>5.1}%", fraction * 100.0);
        }
    });
    let result = upload.await;
    printer.abort();
    Ok(result?)
}

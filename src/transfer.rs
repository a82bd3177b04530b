use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::SubtitleError;
use crate::models::{TargetMediaFile, TransferOutcome};

/// Language marker inserted between the media name and the subtitle extension.
pub const LANGUAGE_MARKER: &str = ".chi.zh-cn";

/// Where a subtitle with extension `subtitle_ext` is installed for `target`.
pub fn destination_for(target: &TargetMediaFile, subtitle_ext: &str) -> PathBuf {
    let mut media = target.path.clone().into_os_string();
    media.push(LANGUAGE_MARKER);
    media.push(&target.extension);
    PathBuf::from(media).with_extension(subtitle_ext.trim_start_matches('.'))
}

/// Copies `subtitle` next to the media file unless a subtitle is already
/// installed there.
pub async fn transfer_subtitle(subtitle: &Path, target: &TargetMediaFile) -> TransferOutcome {
    let subtitle_ext = subtitle
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let destination = destination_for(target, subtitle_ext);

    if tokio::fs::try_exists(&destination).await.unwrap_or(false) {
        info!("Subtitle already present: {}", destination.display());
        return TransferOutcome::AlreadyPresent;
    }

    match copy_file(subtitle, &destination).await {
        Ok(bytes) => {
            info!(
                "Installed subtitle {} ({} bytes)",
                destination.display(),
                bytes
            );
            TransferOutcome::Copied
        }
        Err(e) => {
            error!("{}", e);
            TransferOutcome::Failed
        }
    }
}

async fn copy_file(source: &Path, destination: &Path) -> Result<u64, SubtitleError> {
    tokio::fs::copy(source, destination)
        .await
        .map_err(|source| SubtitleError::Transfer {
            destination: destination.to_path_buf(),
            source,
        })
}

use ondemand_stack::WatchdogImage;
use std::path::Path;
use tracing::{debug, info};

/// Docker デーモンに接続できるかどうか
pub async fn is_available() -> bool {
    match bollard::Docker::connect_with_local_defaults() {
        Ok(docker) => match docker.ping().await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Docker ping failed");
                false
            }
        },
        Err(e) => {
            debug!(error = %e, "Docker connection failed");
            false
        }
    }
}

/// watchdog イメージの取得元を決める
///
/// ビルドディレクトリがあり Docker が使えるときだけローカルでビルドし、
/// それ以外は公開レジストリのイメージを使う。
pub async fn watchdog_image(dir: &Path) -> WatchdogImage {
    if dir.is_dir() && is_available().await {
        info!(dir = %dir.display(), "Building watchdog image from local directory");
        WatchdogImage::Asset(dir.to_path_buf())
    } else {
        WatchdogImage::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_dir_uses_registry_image() {
        let temp_dir = tempfile::tempdir().unwrap();
        let image = watchdog_image(&temp_dir.path().join("watchdog")).await;
        assert_eq!(image, WatchdogImage::default());
    }
}

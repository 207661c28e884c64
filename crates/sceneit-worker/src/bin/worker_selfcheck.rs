use std::path::Path;

use sceneit_media::{check_ffmpeg, check_ffprobe};
use sceneit_storage::S3Client;
use sceneit_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir
    );
    config.validate()?;
    ensure_workdir(&config.work_dir).await?;
    ensure_ffmpeg()?;
    ensure_storage(&config).await?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    // must be writable for s3:// downloads
    tempfile::tempdir_in(path)
        .map_err(|e| anyhow::anyhow!("work dir {} not writable: {}", path.display(), e))?;
    Ok(())
}

fn ensure_ffmpeg() -> anyhow::Result<()> {
    let ffmpeg = check_ffmpeg()?;
    let ffprobe = check_ffprobe()?;
    println!(
        "worker-selfcheck: ffmpeg={} ffprobe={}",
        ffmpeg.display(),
        ffprobe.display()
    );
    Ok(())
}

async fn ensure_storage(config: &WorkerConfig) -> anyhow::Result<()> {
    let Some(storage_config) = &config.storage else {
        if config.detection.save_frames {
            println!("worker-selfcheck: S3_BUCKET not set, keyframes will not be stored");
        }
        return Ok(());
    };

    let client = S3Client::new(storage_config.clone()).await?;
    client
        .check_connectivity()
        .await
        .map_err(|e| anyhow::anyhow!("bucket {} unreachable: {}", client.bucket(), e))?;
    println!("worker-selfcheck: bucket {} reachable", client.bucket());
    Ok(())
}

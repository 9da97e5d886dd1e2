// Example runner for the `segmotion` library.
//
// Plays a directory of still frames (PNG, JPEG, ...) through the parallel pipeline
// in file-name order and prints one status line per frame. Detector settings come
// from `SEGMOTION_SEGMENTS`, `SEGMOTION_THRESHOLD` and `SEGMOTION_DELAY`; log output
// is controlled with `RUST_LOG`.

use anyhow::{Context, bail};
use segmotion::{Config, Frame, ParallelPipeline};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        println!("Usage: segmotion <frame_dir> [fps]");
        return Ok(());
    }
    let frame_dir = PathBuf::from(&args[1]);
    // With a frame rate the clock is derived from the frame index, otherwise wall time is used.
    let fps = args
        .get(2)
        .map(|raw| raw.parse::<f64>().with_context(|| format!("invalid fps {raw:?}")))
        .transpose()?;
    if fps.is_some_and(|fps| !(fps.is_finite() && fps > 0.0)) {
        bail!("fps must be a positive number");
    }

    let config = Config::from_env().context("reading detector configuration")?;
    log::info!(
        "Detecting motion with {0}x{0} segments, threshold {1}, delay {2}s",
        config.segment_count,
        config.threshold,
        config.delay_seconds
    );

    let frames = list_frames(&frame_dir)?;
    if frames.is_empty() {
        bail!("no image files found in {}", frame_dir.display());
    }

    let start = Instant::now();
    let mut pipeline = ParallelPipeline::with_workers(config, num_cpus::get(), start)?;

    for (index, path) in frames.iter().enumerate() {
        let image = image::open(path)
            .with_context(|| format!("decoding {}", path.display()))?
            .to_luma8();
        let frame = Frame::from_gray_image(&image)?;

        let now = match fps {
            Some(fps) => frame_timestamp(start, index, fps)?,
            None => Instant::now(),
        };
        let report = pipeline.process_frame_at(&frame, now).await?;

        let detail = match &report.motion {
            Some(motion) if motion.detected => {
                format!("motion in {} segment(s)", motion.flagged_count())
            }
            Some(_) => "...".to_string(),
            None => "baseline".to_string(),
        };
        println!("frame {}: {} ({})", report.frame_index, report.status, detail);
    }

    Ok(())
}

/// Clock reading for frame `index` of a stream played at `fps`.
fn frame_timestamp(start: Instant, index: usize, fps: f64) -> anyhow::Result<Instant> {
    let offset = Duration::try_from_secs_f64(index as f64 / fps)
        .with_context(|| format!("frame {index} has no timestamp at {fps} fps"))?;
    start
        .checked_add(offset)
        .with_context(|| format!("frame {index} is too far from the start at {fps} fps"))
}

fn list_frames(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && image::ImageFormat::from_path(&path).is_ok() {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

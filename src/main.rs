use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use joint_angles::{
    detection::Detection,
    error::Error,
    frame::Frame,
    overlay::{self, OverlayStyle},
};
use opencv::core::Mat;
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use structopt::StructOpt;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;

#[derive(structopt::StructOpt)]
struct Opt {
    /// Recorded detections, one file per frame.
    #[structopt(required = true)]
    detections: Vec<PathBuf>,

    /// Extension of the image stored next to each detection file.
    #[structopt(short, long, default_value = "jpg")]
    image_ext: String,

    /// Directory to write the overlay images to.
    #[structopt(short, long)]
    output_dir: Option<PathBuf>,

    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    #[structopt(short, long)]
    show_progress: bool,

    #[structopt(short = "-W", long, default_value = "0")]
    wait_key_ms: i32,

    #[structopt(flatten)]
    style: OverlayStyle,
}

#[cfg(feature = "gui")]
fn show(frame: &Frame, image: &Mat, style: &OverlayStyle, delay_ms: i32) -> Result<bool> {
    const Q_KEY: u8 = b'q';
    let rendered = frame
        .render(image, style)
        .context("failed rendering overlay")?;
    opencv::highgui::imshow("joint angles", &rendered).map_err(Error::ImShow)?;
    Ok(opencv::highgui::wait_key(delay_ms)? != i32::from(Q_KEY))
}

#[cfg(not(feature = "gui"))]
fn show(_frame: &Frame, _image: &Mat, _style: &OverlayStyle, _delay_ms: i32) -> Result<bool> {
    Ok(true)
}

fn write_overlays(
    frame: &Frame,
    image: &Mat,
    style: &OverlayStyle,
    dir: &Path,
    stem: &str,
    ext: &str,
) -> Result<()> {
    let overlays = [
        (
            "landmarks",
            overlay::draw_landmarks(
                image,
                frame.landmarks(),
                style.radius,
                style.landmark_color.into(),
            )?,
        ),
        (
            "segments",
            overlay::draw_segments(
                image,
                frame.limbs(),
                style.segment_color.into(),
                style.thickness,
            )?,
        ),
        ("limbs", overlay::label_segments(image, frame.limbs())?),
        (
            "angles",
            overlay::label_angles(image, frame.limbs(), frame.angles())?,
        ),
    ];
    for (suffix, rendered) in overlays.iter() {
        let path = dir.join(format!("{}_{}.{}", stem, suffix, ext));
        overlay::write_image(&path, rendered)
            .with_context(|| format!("failed writing overlay {}", path.display()))?;
        debug!(message = "wrote overlay", path = %path.display());
    }
    Ok(())
}

/// Analyze one recorded detection. Returns whether to keep going.
fn process(path: &Path, opt: &Opt, analysis: &mut Duration) -> Result<bool> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed reading detection {}", path.display()))?;
    let detection = text
        .parse::<Detection>()
        .with_context(|| format!("failed parsing detection {}", path.display()))?;

    let image_path = path.with_extension(&opt.image_ext);
    let image = overlay::read_image(&image_path)?;

    let start = Instant::now();
    let frame = match Frame::analyze_image(&detection, &image) {
        Ok(frame) => frame,
        Err(Error::MissingDetection) => {
            warn!(message = "no body detected, skipping frame", path = %path.display());
            return Ok(true);
        }
        Err(e) => return Err(e.into()),
    };
    *analysis += start.elapsed();

    for (pair, angle) in frame.angles().iter() {
        match angle.degrees() {
            Some(degrees) => info!(
                frame = %path.display(),
                joint = pair.joint(),
                degrees = degrees
            ),
            None => debug!(frame = %path.display(), joint = pair.joint(), angle = ?angle),
        }
    }

    if let Some(dir) = &opt.output_dir {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .context("detection path has no usable file stem")?;
        write_overlays(&frame, &image, &opt.style, dir, stem, &opt.image_ext)?;
    }

    show(&frame, &image, &opt.style, opt.wait_key_ms).context("failed showing overlay")
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(tracing_subscriber::filter::EnvFilter::new(&opt.log_level)),
    )?;

    if let Some(dir) = &opt.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed creating output directory {}", dir.display()))?;
    }

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrl_c = running.clone();

    ctrlc::set_handler(move || {
        running_ctrl_c.store(false, Ordering::SeqCst);
    })
    .context("failed setting Ctrl-C handler")?;

    let pb = if opt.show_progress {
        Some(
            ProgressBar::new(opt.detections.len() as u64).with_style(
                ProgressStyle::default_bar()
                    .template("{prefix:.bold.dim} {bar:40} {pos}/{len} {wide_msg}"),
            ),
        )
    } else {
        None
    };

    let mut analysis = Duration::default();
    let mut nframes = 0_u32;

    for path in &opt.detections {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        if let Some(pb) = &pb {
            pb.set_message(path.display().to_string());
        }
        if !process(path, &opt, &mut analysis)? {
            break;
        }
        nframes += 1;
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    info!(
        message = "done",
        frames = nframes,
        mean_analysis_us = analysis
            .checked_div(nframes.max(1))
            .unwrap_or_default()
            .as_micros() as u64
    );
    Ok(())
}

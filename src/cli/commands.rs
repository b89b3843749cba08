//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use walkdir::WalkDir;

use crate::cli::EffectArgs;
use crate::codec::encode_wav;
use crate::dsp::EffectParams;
use crate::engine::{import_audio, write_bytes};
use crate::state::{RenderSummary, Studio, StudioConfig};

/// Extensions picked up by `render-dir`
const AUDIO_EXTENSIONS: [&str; 2] = ["wav", "mp3"];

/// Load the studio configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<StudioConfig> {
    match path {
        Some(path) => StudioConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(StudioConfig::default()),
    }
}

/// Resolve effect parameters: config defaults, then the params file, then flags.
pub fn resolve_params(config: &StudioConfig, effects: &EffectArgs) -> Result<EffectParams> {
    let base = match &effects.params {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read params {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("invalid params file {}", path.display()))?
        }
        None => config.default_params,
    };

    let params = effects.apply(base);
    if !params.is_in_range() {
        warn!("Effect parameters out of range, clamping: {:?}", params);
    }
    Ok(params.clamped())
}

/// Render one file and write `<stem>-echo-<id>.wav` / `.mp3` into `out_dir`.
pub fn render(
    studio: &mut Studio,
    input: &Path,
    out_dir: &Path,
    preview: bool,
    json: bool,
) -> Result<RenderSummary> {
    info!("Rendering {}", input.display());

    studio
        .load_file(input)
        .with_context(|| format!("failed to load {}", input.display()))?;
    let id = studio.export().context("render failed")?;
    let (wav_path, mp3_path) = studio.save_history_item(id, out_dir)?;

    let item = studio
        .history()
        .get(id)
        .context("render missing from history")?;
    let summary = item.summary();

    println!("{}", wav_path.display());
    println!("{}", mp3_path.display());

    if preview {
        let buffer = studio
            .preview()
            .context("preview not available (disabled in config?)")?;
        let preview_path = out_dir.join(format!("{}-preview.wav", item.file_stem()));
        write_bytes(&preview_path, &encode_wav(buffer)?)?;
        println!("{}", preview_path.display());
    }

    if json {
        let json_path = out_dir.join(format!("{}.json", item.file_stem()));
        write_bytes(
            &json_path,
            serde_json::to_string_pretty(&summary)?.as_bytes(),
        )?;
        println!("{}", json_path.display());
    }

    Ok(summary)
}

/// Find every WAV/MP3 file under `dir`, sorted by path.
pub fn find_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy().to_lowercase();
                    AUDIO_EXTENSIONS.contains(&ext.as_str())
                })
                .unwrap_or(false)
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();

    files.sort();
    Ok(files)
}

/// Render every audio file under `dir`.
///
/// Files that fail are reported and skipped.
///
/// # Returns
/// Summaries of the successful renders
pub fn render_dir(studio: &mut Studio, dir: &Path, out_dir: &Path) -> Result<Vec<RenderSummary>> {
    let files = find_audio_files(dir)?;
    if files.is_empty() {
        warn!("No WAV or MP3 files found in {}", dir.display());
        return Ok(Vec::new());
    }

    let mut summaries = Vec::with_capacity(files.len());
    let mut failed = 0usize;
    for file in &files {
        match render(studio, file, out_dir, false, false) {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                failed += 1;
                warn!("Skipping {}: {:#}", file.display(), e);
            }
        }
    }

    println!(
        "Rendered {} of {} files ({} failed)",
        summaries.len(),
        files.len(),
        failed
    );
    Ok(summaries)
}

/// Print format, duration and levels of an audio file.
pub fn info(input: &Path) -> Result<()> {
    let buffer =
        import_audio(input).with_context(|| format!("failed to decode {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Channels: {}", buffer.num_channels());
    println!("Sample rate: {} Hz", buffer.sample_rate());
    println!("Frames: {}", buffer.len());
    println!("Duration: {:.3} s", buffer.duration_secs());
    println!("Peak: {:.1} dBFS", buffer.peak_db());
    println!("RMS: {:.1} dBFS", buffer.rms_db());
    Ok(())
}

/// Print the effective parameters as JSON.
pub fn print_params(params: &EffectParams) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(params)?);
    Ok(())
}

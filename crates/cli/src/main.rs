use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use framepipe_core::encoder::domain::invocation::InvocationDescriptor;
use framepipe_core::encoder::infrastructure::subprocess_encoder::SubprocessLauncher;
use framepipe_core::pipeline::diagnostic_sink::LogDiagnosticSink;
use framepipe_core::pipeline::export_frames_use_case::{ExportFramesUseCase, ProgressFn};
use framepipe_core::pipeline::streaming_session::{
    ReplayPolicy, SessionRequest, StreamingSession,
};
use framepipe_core::shared::constants::{DEFAULT_CHANNEL_CAPACITY, METADATA_DIR};
use framepipe_core::shared::video_format::VideoFormat;
use framepipe_core::video::infrastructure::image_directory_source::ImageDirectorySource;

/// Stream a directory of images into an encoder process.
///
/// Everything after `--` is the encoder command line; the output path is
/// appended to it. Frames are written to the encoder's stdin as packed
/// RGB24, e.g.:
///
///   framepipe frames/ out.mp4 -- ffmpeg -y -f rawvideo -pix_fmt rgb24 -s 512x512 -r 24 -i - -c:v libx264
#[derive(Parser)]
#[command(name = "framepipe")]
struct Cli {
    /// Directory of input images, encoded in file-name order.
    frames_dir: PathBuf,

    /// Output video file, appended to the encoder command.
    output: PathBuf,

    /// JSON file with video format options (reads `save_metadata`).
    #[arg(long)]
    format: Option<PathBuf>,

    /// Run the metadata pass regardless of the format file.
    #[arg(long)]
    save_metadata: bool,

    /// JSON file with metadata to embed as the container comment.
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Directory for the generated metadata file.
    #[arg(long, default_value = METADATA_DIR)]
    metadata_dir: PathBuf,

    /// Encoder environment variable (KEY=VALUE, repeatable). When given, the
    /// encoder does not inherit this process's environment.
    #[arg(long = "env", value_parser = parse_env_pair)]
    env: Vec<(String, String)>,

    /// Decode frames once and replay them into the main pass instead of
    /// reading the directory a second time.
    #[arg(long)]
    replay: bool,

    /// Frames decoded ahead of the encoder.
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    channel_capacity: usize,

    /// Encoder command line.
    #[arg(last = true, required = true)]
    encoder: Vec<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut format = match &cli.format {
        Some(path) => VideoFormat::load(path)?,
        None => VideoFormat::default(),
    };
    if cli.save_metadata {
        format = format.with_save_metadata(true);
    }

    let metadata = match &cli.metadata {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => serde_json::Value::Object(serde_json::Map::new()),
    };

    let request = SessionRequest::new(build_invocation(&cli), format, metadata)
        .with_metadata_dir(&cli.metadata_dir)
        .with_replay(if cli.replay {
            ReplayPolicy::BufferAndReplay
        } else {
            ReplayPolicy::CallerResubmits
        });

    let session = StreamingSession::new(
        request,
        Box::new(SubprocessLauncher),
        Box::new(LogDiagnosticSink::new()),
    );
    let source = ImageDirectorySource::open(&cli.frames_dir)?;

    let progress: ProgressFn = Box::new(|current, total| match total {
        Some(total) => eprint!("\rStreaming frame {current}/{total}"),
        None => eprint!("\rStreaming frame {current}"),
    });

    let result = ExportFramesUseCase::new(session, Box::new(source), Some(progress))
        .with_channel_capacity(cli.channel_capacity)
        .execute();
    eprintln!();
    let result = result?;

    log::info!(
        "Encoded {} frames into {}",
        result.frame_count,
        cli.output.display()
    );
    Ok(())
}

fn build_invocation(cli: &Cli) -> InvocationDescriptor {
    let invocation = InvocationDescriptor::new(cli.encoder.iter(), &cli.output);
    if cli.env.is_empty() {
        return invocation;
    }
    let env: HashMap<OsString, OsString> = cli
        .env
        .iter()
        .map(|(k, v)| (OsString::from(k), OsString::from(v)))
        .collect();
    invocation.with_env(env)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.frames_dir.is_dir() {
        return Err(format!(
            "Frames directory not found: {}",
            cli.frames_dir.display()
        )
        .into());
    }
    if cli.encoder.is_empty() {
        return Err("Encoder command is required after --".into());
    }
    if cli.channel_capacity == 0 {
        return Err("Channel capacity must be at least 1".into());
    }
    for path in [&cli.format, &cli.metadata].into_iter().flatten() {
        if !path.is_file() {
            return Err(format!("File not found: {}", path.display()).into());
        }
    }
    Ok(())
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use flythrough::{
    Codec, Container, EncodePipeline, FfmpegSink, FfmpegSinkOpts, FlythroughResult, FrameSize,
    FrameSource, FrameSourceOpts, InterruptFlag, PipelineOpts, PreviewRenderer, PrintProgress,
    Scene, compute_path,
};

/// EX_USAGE from sysexits.h.
const EXIT_USAGE: u8 = 64;

#[derive(Parser, Debug)]
#[command(
    name = "flythrough",
    version,
    about = "Render a camera fly-through of a scene into a video file",
    disable_help_flag = true
)]
struct Cli {
    /// Frame width in pixels.
    #[arg(short = 'w', long)]
    width: Option<u32>,

    /// Frame height in pixels.
    #[arg(short = 'h', long)]
    height: Option<u32>,

    /// Frames per second.
    #[arg(short = 'f', long)]
    fps: Option<u32>,

    /// Camera speed in meters per second.
    #[arg(short = 's', long)]
    speed: Option<f64>,

    /// Input scene JSON.
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// Output video path.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Still-image codec for each frame.
    #[arg(long, value_enum, default_value_t = FrameCodec::Jpeg)]
    codec: FrameCodec,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = 90)]
    quality: u8,

    /// Output container. Inferred from the output extension when omitted.
    #[arg(long, value_enum)]
    container: Option<ContainerArg>,

    /// Fail instead of overwriting an existing output file.
    #[arg(long, default_value_t = false)]
    no_overwrite: bool,

    /// Log pipeline internals to stderr.
    #[arg(long, default_value_t = false)]
    verbose: bool,

    /// Print help.
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FrameCodec {
    Jpeg,
    Png,
}

impl From<FrameCodec> for Codec {
    fn from(c: FrameCodec) -> Self {
        match c {
            FrameCodec::Jpeg => Codec::Jpeg,
            FrameCodec::Png => Codec::Png,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ContainerArg {
    Mov,
    Mp4,
    Mkv,
}

impl From<ContainerArg> for Container {
    fn from(c: ContainerArg) -> Self {
        match c {
            ContainerArg::Mov => Container::QuickTime,
            ContainerArg::Mp4 => Container::Mp4,
            ContainerArg::Mkv => Container::Matroska,
        }
    }
}

struct RenderArgs {
    size: FrameSize,
    fps: u32,
    speed: f64,
    input: PathBuf,
    output: PathBuf,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::from(EXIT_USAGE),
            };
        }
    };

    init_tracing(cli.verbose);

    let (Some(width), Some(height), Some(fps), Some(speed), Some(input), Some(output)) = (
        cli.width,
        cli.height,
        cli.fps,
        cli.speed,
        cli.input.clone(),
        cli.output.clone(),
    ) else {
        eprintln!("Missing arguments: use --help to see the help");
        return ExitCode::from(EXIT_USAGE);
    };

    let result = FrameSize::new(width, height).and_then(|size| {
        let args = RenderArgs {
            size,
            fps,
            speed,
            input,
            output,
        };
        render(&cli, args)
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn render(cli: &Cli, args: RenderArgs) -> FlythroughResult<()> {
    let scene = Scene::from_path(&args.input)?;
    let path = compute_path(scene.keyframes(), args.speed, args.fps)?;

    let interrupt = InterruptFlag::new();
    {
        let interrupt = interrupt.clone();
        if let Err(err) = ctrlc::set_handler(move || interrupt.raise()) {
            tracing::warn!("failed to install Ctrl-C handler: {err}");
        }
    }

    let renderer =
        PreviewRenderer::new(scene.environment.clone()).with_interrupt(interrupt.clone());
    let frames = path.len();
    let source = FrameSource::new(
        path,
        Box::new(renderer),
        FrameSourceOpts {
            size: args.size,
            codec: cli.codec.into(),
            jpeg_quality: cli.quality,
        },
    )?
    .with_observer(PrintProgress);

    let mut sink_opts = FfmpegSinkOpts::new(&args.output);
    sink_opts.overwrite = !cli.no_overwrite;
    if let Some(container) = cli.container {
        sink_opts.container = container.into();
    }

    println!(
        "Creating video file: {} ({} frames)",
        args.output.display(),
        frames
    );
    let pipeline = EncodePipeline::new(
        source,
        Box::new(FfmpegSink::new(sink_opts)),
        PipelineOpts {
            interrupt,
            ..PipelineOpts::default()
        },
    )?;
    pipeline.run()
}

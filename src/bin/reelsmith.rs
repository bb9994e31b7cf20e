use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use reelsmith::{
    Assembler, Collaborators, FrameIndex, Layout, RenderConfig, Script, TextEngine,
    default_output_path, render_frame,
};

#[derive(Parser, Debug)]
#[command(name = "reelsmith", version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a script to MP4 (requires `ffmpeg` and `ffprobe` on PATH).
    Render(RenderArgs),
    /// Print the resolved timeline as JSON without encoding.
    Plan(PlanArgs),
    /// Render a single frame of the timeline as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct ScriptArgs {
    /// Input script JSON.
    #[arg(long)]
    script: PathBuf,

    /// Render config JSON (defaults apply when omitted).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured layout.
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    /// Directory with extra font files for captions.
    #[arg(long)]
    fonts_dir: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LayoutArg {
    FullFrame,
    AvatarSplit,
}

impl From<LayoutArg> for Layout {
    fn from(v: LayoutArg) -> Self {
        match v {
            LayoutArg::FullFrame => Layout::FullFrame,
            LayoutArg::AvatarSplit => Layout::AvatarSplit,
        }
    }
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: ScriptArgs,

    /// Output MP4 path (defaults to the script path with an `.mp4` extension).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Use the static avatar image instead of lip-sync.
    #[arg(long, default_value_t = false)]
    skip_lipsync: bool,

    /// Disable audio mixing for this render.
    #[arg(long, default_value_t = false)]
    no_audio: bool,

    /// Enable frame-level parallelism.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[command(flatten)]
    input: ScriptArgs,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: ScriptArgs,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    match cli.cmd {
        Command::Render(args) => runtime.block_on(cmd_render(args)),
        Command::Plan(args) => runtime.block_on(cmd_plan(args)),
        Command::Frame(args) => runtime.block_on(cmd_frame(args)),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "reelsmith=debug" } else { "reelsmith=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(input: &ScriptArgs) -> anyhow::Result<(Script, RenderConfig)> {
    let script = Script::from_path(&input.script)?;
    let mut cfg = match input.config.as_deref() {
        Some(p) => RenderConfig::from_path(p)?,
        None => RenderConfig::default(),
    };
    if let Some(layout) = input.layout {
        cfg.layout = layout.into();
    }
    Ok((script, cfg))
}

fn assembler(cfg: RenderConfig, fonts_dir: Option<&Path>) -> anyhow::Result<Assembler> {
    let text = TextEngine::detect(fonts_dir);
    Ok(Assembler::new(cfg, Collaborators::offline(), text)?)
}

async fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let (script, mut cfg) = load(&args.input)?;
    cfg.skip_lipsync |= args.skip_lipsync;
    cfg.enable_audio &= !args.no_audio;
    cfg.parallel |= args.parallel;

    let out = args
        .out
        .unwrap_or_else(|| default_output_path(&args.input.script));
    let asm = assembler(cfg, args.input.fonts_dir.as_deref())?.with_threads(args.threads);
    let cancel = asm.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping at the next scene boundary");
            cancel.cancel();
        }
    });

    let rendered = asm.render(&script, &out).await?;
    for w in &rendered.warnings {
        eprintln!("warning: {}", w.message);
    }
    eprintln!(
        "wrote {} ({:.3}s, {} frames)",
        rendered.path.display(),
        rendered.total_duration_sec,
        rendered.frame_count
    );
    Ok(())
}

async fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let (script, cfg) = load(&args.input)?;
    let asm = assembler(cfg, args.input.fonts_dir.as_deref())?;
    let assembled = asm.assemble(&script).await?;

    let plan = serde_json::json!({
        "total_duration_sec": assembled.timeline.duration_sec,
        "frame_count": assembled.timeline.total_frames(),
        "scenes": assembled.scenes,
        "warnings": assembled.warnings,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&plan).context("serialize plan")?
    );
    Ok(())
}

async fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (script, cfg) = load(&args.input)?;
    let asm = assembler(cfg, args.input.fonts_dir.as_deref())?;
    let assembled = asm.assemble(&script).await?;
    let total = assembled.timeline.total_frames();
    if args.frame >= total {
        anyhow::bail!("frame {} is past the end ({total} frames)", args.frame);
    }

    let frame = render_frame(&assembled.timeline, FrameIndex(args.frame));
    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    // Frames sit on an opaque background, so premultiplied and straight RGBA agree.
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

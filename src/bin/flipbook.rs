use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sha2::Digest as _;
use tracing_subscriber::EnvFilter;

use flipbook::{
    AnimationRequest, AnimationSink, AssemblyState, BackendChain, CancelToken, Canvas, Config,
    FillPolicy, FrameStatus, GeminiBackend, GifSink, ImageBackend, LoopCount, Materializer,
    MotionChoice, Mp4Sink, Pipeline, PlaceholderBackend, Preset, ReferenceImage, RetryPolicy,
    RunStatus, SinkConfig, StillOp,
};

#[derive(Parser, Debug)]
#[command(name = "flipbook", version)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an animation from one prompt.
    Generate(GenerateArgs),
    /// Print the classified motion category and the per-frame prompts.
    Plan(PlanArgs),
    /// Generate a single image.
    Image(ImageArgs),
    /// Edit an existing image.
    Edit(EditArgs),
    /// Combine several images into one.
    Compose(ComposeArgs),
    /// Redraw an image in the style of another.
    Style(StyleArgs),
    /// List presets and the frame-count defaults table.
    Presets,
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Prompt describing the subject and its motion.
    prompt: String,

    /// Output preset; explicit flags override its values.
    #[arg(long)]
    preset: Option<Preset>,

    /// Number of frames (2..=20).
    #[arg(long)]
    frames: Option<u32>,

    /// Per-frame delay in milliseconds (100..=2000).
    #[arg(long = "delay")]
    delay_ms: Option<u32>,

    /// Motion category, or `auto` to classify the prompt.
    #[arg(long = "animation", default_value = "auto")]
    motion: MotionChoice,

    /// Frame width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Encoding quality (1..=100).
    #[arg(long)]
    quality: Option<u8>,

    /// Number of loops; 0 loops forever.
    #[arg(long, conflicts_with = "no_loop")]
    loop_count: Option<u16>,

    /// Play the animation once.
    #[arg(long)]
    no_loop: bool,
}

#[derive(Args, Debug)]
struct BackendArgs {
    /// Image backend.
    #[arg(long, value_enum, default_value_t = BackendChoice::Gemini)]
    backend: BackendChoice,

    /// Fall back to the placeholder backend when the primary one fails.
    #[arg(long)]
    fallback_placeholder: bool,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    request: RequestArgs,

    #[command(flatten)]
    backend: BackendArgs,

    /// Output container.
    #[arg(long, value_enum, default_value_t = FormatChoice::Gif)]
    format: FormatChoice,

    /// Output path (defaults to `<output dir>/<run id>.<ext>`).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Keep the generated frames in `<output dir>/<run id>/`.
    #[arg(long)]
    keep_frames: bool,

    /// Replace failed frames with placeholders instead of dropping them.
    #[arg(long)]
    fill_placeholders: bool,

    /// Extra attempts per frame (defaults to FLIPBOOK_MAX_RETRIES).
    #[arg(long)]
    retries: Option<u32>,

    /// Overall deadline for the run, in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Assemble even when some frames failed.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    assemble_partial: bool,

    /// Reference image sent with every frame prompt.
    #[arg(long = "reference")]
    references: Vec<PathBuf>,

    /// Print the plan and exit without generating.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[command(flatten)]
    request: RequestArgs,
}

#[derive(Parser, Debug)]
struct ImageArgs {
    /// What to draw.
    prompt: String,

    /// Output path.
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Parser, Debug)]
struct EditArgs {
    /// Image to edit.
    image: PathBuf,

    /// Edit instruction.
    prompt: String,

    /// Output path.
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Source images (at least two).
    #[arg(required = true, num_args = 2..)]
    images: Vec<PathBuf>,

    /// How to combine the images.
    #[arg(long)]
    prompt: String,

    /// Output path.
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Parser, Debug)]
struct StyleArgs {
    /// Image providing the subject.
    content: PathBuf,

    /// Image providing the look.
    style: PathBuf,

    /// Extra guidance.
    #[arg(long)]
    prompt: Option<String>,

    /// Output path.
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Gemini,
    Placeholder,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Gif,
    Mp4,
}

impl FormatChoice {
    fn extension(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
        }
    }
}

const STILL_CANVAS: Canvas = Canvas {
    width: 512,
    height: 512,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let cfg = Config::from_env()?;

    match cli.cmd {
        Command::Generate(args) => cmd_generate(args, &cfg),
        Command::Plan(args) => cmd_plan(args),
        Command::Image(args) => {
            let op = StillOp::Generate {
                prompt: args.prompt,
            };
            run_still(&op, "image", args.out, &args.backend, &cfg)
        }
        Command::Edit(args) => {
            let op = StillOp::Edit {
                prompt: args.prompt,
                image: load_reference(&args.image)?,
            };
            run_still(&op, "edit", args.out, &args.backend, &cfg)
        }
        Command::Compose(args) => {
            let images = args
                .images
                .iter()
                .map(|p| load_reference(p))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let op = StillOp::Compose {
                prompt: args.prompt,
                images,
            };
            run_still(&op, "compose", args.out, &args.backend, &cfg)
        }
        Command::Style(args) => {
            let op = StillOp::StyleTransfer {
                content: load_reference(&args.content)?,
                style: load_reference(&args.style)?,
                prompt: args.prompt,
            };
            run_still(&op, "style", args.out, &args.backend, &cfg)
        }
        Command::Presets => {
            cmd_presets();
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "flipbook=debug"
    } else {
        "flipbook=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_request(args: &RequestArgs) -> anyhow::Result<AnimationRequest> {
    let mut b = AnimationRequest::builder(args.prompt.clone()).motion(args.motion);

    let mut canvas = Canvas {
        width: 512,
        height: 512,
    };
    if let Some(preset) = args.preset {
        b = b.preset(preset);
        canvas = preset.params().canvas;
    }
    if let Some(n) = args.frames {
        b = b.frames(n);
    }
    b = b.canvas(
        args.width.unwrap_or(canvas.width),
        args.height.unwrap_or(canvas.height),
    );
    if let Some(ms) = args.delay_ms {
        b = b.delay_ms(ms);
    }
    if let Some(q) = args.quality {
        b = b.quality(q);
    }
    if args.no_loop {
        b = b.loop_count(LoopCount::Once);
    } else if let Some(n) = args.loop_count {
        b = b.loop_count(LoopCount::from_count(n));
    }

    Ok(b.build()?)
}

fn make_backend(
    args: &BackendArgs,
    cfg: &Config,
    canvas: Canvas,
) -> anyhow::Result<Box<dyn ImageBackend>> {
    let primary: Box<dyn ImageBackend> = match args.backend {
        BackendChoice::Gemini => Box::new(GeminiBackend::from_config(cfg)?),
        BackendChoice::Placeholder => Box::new(PlaceholderBackend::new(canvas)),
    };
    if args.fallback_placeholder && matches!(args.backend, BackendChoice::Gemini) {
        return Ok(Box::new(BackendChain::new(vec![
            primary,
            Box::new(PlaceholderBackend::new(canvas)),
        ])));
    }
    Ok(primary)
}

fn load_reference(path: &Path) -> anyhow::Result<ReferenceImage> {
    ReferenceImage::from_path(path)
        .with_context(|| format!("load reference image '{}'", path.display()))
}

/// `run-<request digest>-<invocation suffix>`: the digest groups runs of the same request, the
/// suffix keeps every invocation's frame directory and default output apart.
fn run_id(request: &AnimationRequest) -> String {
    let key = format!(
        "{}\n{}\n{}",
        request.base_prompt,
        request.frame_count,
        request.category()
    );
    let digest = sha2::Sha256::digest(key.as_bytes());
    let mut out = String::from("run-");
    for b in digest.iter().take(6) {
        out.push_str(&format!("{:02x}", b));
    }
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    out.push_str(&format!("-{millis:x}-{:x}", std::process::id()));
    out
}

/// Trip `cancel` on the first Ctrl-C; a second one exits immediately.
fn cancel_on_interrupt(cancel: CancelToken) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build interrupt runtime")?;
    std::thread::Builder::new()
        .name("flipbook-interrupt".to_string())
        .spawn(move || {
            rt.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                tracing::warn!("interrupt received; stopping after the current frame");
                cancel.cancel();
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            });
        })
        .context("spawn interrupt watcher")?;
    Ok(())
}

fn print_plan(request: &AnimationRequest) -> anyhow::Result<()> {
    let plan = Pipeline::plan(request)?;
    println!("category: {}", plan.category);
    println!(
        "frames: {}  canvas: {}  delay: {}ms  quality: {}",
        plan.frame_count, request.canvas, request.delay_ms, request.quality
    );
    for frame in &plan.frames {
        println!("[{:02}] {}", frame.index, frame.prompt);
    }
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let request = build_request(&args.request)?;
    print_plan(&request)
}

fn cmd_generate(args: GenerateArgs, cfg: &Config) -> anyhow::Result<()> {
    let request = build_request(&args.request)?;
    if args.dry_run {
        return print_plan(&request);
    }

    let id = run_id(&request);
    let out_path = args.out.clone().unwrap_or_else(|| {
        cfg.output_dir
            .join(format!("{id}.{}", args.format.extension()))
    });

    let mut sink: Box<dyn AnimationSink> = match args.format {
        FormatChoice::Gif => Box::new(GifSink::new(&out_path, true)),
        FormatChoice::Mp4 => {
            flipbook::validate_mp4_config(&SinkConfig {
                canvas: request.canvas,
                delay_ms: request.delay_ms,
                quality: request.quality,
                loop_count: request.loop_count,
            })?;
            if !flipbook::is_ffmpeg_on_path() {
                anyhow::bail!("ffmpeg not found on PATH (required for --format mp4)");
            }
            Box::new(Mp4Sink::new(&out_path, true))
        }
    };

    let backend = make_backend(&args.backend, cfg, request.canvas)?;
    let references = args
        .references
        .iter()
        .map(|p| load_reference(p))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let cancel = match args.timeout {
        Some(secs) => CancelToken::with_timeout(std::time::Duration::from_secs(secs)),
        None => CancelToken::new(),
    };
    cancel_on_interrupt(cancel.clone())?;
    let materializer = Materializer::new()
        .with_retry(RetryPolicy::new(
            args.retries.unwrap_or(cfg.max_retries),
            cfg.retry_backoff,
        ))
        .with_request_timeout(cfg.request_timeout)
        .with_reference_images(references)
        .with_cancel(cancel);
    let fill = if args.fill_placeholders {
        FillPolicy::Placeholder
    } else {
        FillPolicy::Omit
    };

    let frames_dir = if args.keep_frames {
        cfg.output_dir.join(&id)
    } else {
        cfg.output_dir.join(format!(".{id}.frames"))
    };
    let mut store = flipbook::DirFrameStore::create(&frames_dir)?;

    let result = Pipeline::new(backend.as_ref())
        .with_materializer(materializer)
        .with_fill_policy(fill)
        .with_assemble_partial(args.assemble_partial)
        .run(&request, &mut store, sink.as_mut());

    let cancelled = matches!(&result, Ok(r) if r.cancelled);
    if args.keep_frames || cancelled {
        eprintln!("frames kept in {}", frames_dir.display());
    } else if let Err(e) = store.remove() {
        tracing::warn!(error = %e, "could not remove temporary frame directory");
    }
    let result = result?;

    eprintln!(
        "{id}: category {}, {}/{} frames generated",
        result.category,
        result.succeeded(),
        result.plan.len()
    );
    for artifact in &result.artifacts {
        if let FrameStatus::Failed { error } = &artifact.status {
            eprintln!(
                "  frame {} failed after {} attempt(s): {error}",
                artifact.index, artifact.attempts
            );
        }
    }

    match (&result.assembly, result.status()) {
        (_, RunStatus::Cancelled) => anyhow::bail!(
            "run cancelled; {} frame(s) kept, no animation written",
            result.succeeded()
        ),
        (AssemblyState::Failed(e), _) => anyhow::bail!("assembly failed: {e}"),
        (AssemblyState::NotAttempted, _) => {
            anyhow::bail!("some frames failed and partial assembly is disabled")
        }
        (AssemblyState::Encoded(out), status) => {
            if let RunStatus::Partial { succeeded, total } = status {
                eprintln!("warning: partial animation ({succeeded} of {total} frames)");
            }
            let path = out.location.as_deref().unwrap_or(out_path.as_path());
            eprintln!("wrote {}", path.display());
            Ok(())
        }
    }
}

fn run_still(
    op: &StillOp,
    name: &str,
    out: Option<PathBuf>,
    backend: &BackendArgs,
    cfg: &Config,
) -> anyhow::Result<()> {
    op.validate()?;
    let backend = make_backend(backend, cfg, STILL_CANVAS)?;
    let out_path = out.unwrap_or_else(|| cfg.output_dir.join(format!("{name}.png")));
    op.run_to_file(backend.as_ref(), &out_path)?;
    eprintln!("wrote {}", out_path.display());
    Ok(())
}

fn cmd_presets() {
    println!("presets:");
    for preset in Preset::ALL {
        let p = preset.params();
        println!(
            "  {:<13} {:>2} frames  {:>9}  {:>4}ms  quality {}",
            preset.as_str(),
            p.frame_count,
            p.canvas.to_string(),
            p.delay_ms,
            p.quality
        );
    }
    println!("defaults by frame count:");
    for (label, d) in flipbook::default_buckets() {
        println!(
            "  {label:<13} {:>4}ms  quality {}",
            d.delay_ms, d.quality
        );
    }
}

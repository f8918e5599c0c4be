use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "posecast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a looping GIF.
    Gif(GifArgs),
    /// Render a single composited frame as a PNG.
    Frame(FrameArgs),
    /// List the motion presets.
    Presets,
    /// Normalize a lineup of character IDs and print its query value.
    Lineup(LineupArgs),
}

/// Request fields; flags override values from `--in`.
#[derive(Parser, Debug)]
struct RequestArgs {
    /// Input request JSON.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Character ID.
    #[arg(long)]
    id: Option<f64>,

    /// Motion preset id, e.g. `wave` or `idleCool`.
    #[arg(long)]
    motion: Option<posecast::MotionPresetId>,

    /// Speech text; empty for no overlay. Printable ASCII only, other characters draw as `?`.
    #[arg(long)]
    text: Option<String>,

    /// Speech style id.
    #[arg(long)]
    style: Option<String>,

    /// Background preset id.
    #[arg(long)]
    background: Option<String>,
}

#[derive(Parser, Debug)]
struct GifArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Output GIF path. Defaults to `character-{id}-3s-{timestamp}.gif`.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Loop time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f32,

    /// Square frame size in pixels.
    #[arg(long, default_value_t = 512)]
    size: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct LineupArgs {
    /// IDs separated by commas, whitespace or newlines.
    input: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Gif(args) => runtime()?.block_on(cmd_gif(args)),
        Command::Frame(args) => runtime()?.block_on(cmd_frame(args)),
        Command::Presets => cmd_presets(),
        Command::Lineup(args) => cmd_lineup(args),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")
}

impl RequestArgs {
    fn resolve(&self) -> anyhow::Result<posecast::GifRequest> {
        let mut req = match &self.in_path {
            Some(path) => posecast::GifRequest::from_path(path)?,
            None => posecast::GifRequest::default(),
        };
        if let Some(id) = self.id {
            req.character_id = id;
        }
        if let Some(motion) = self.motion {
            req.motion = motion;
        }
        if let Some(text) = &self.text {
            req.speech_text.clone_from(text);
        }
        if let Some(style) = &self.style {
            req.speech_style.clone_from(style);
        }
        if let Some(background) = &self.background {
            req.background.clone_from(background);
        }
        req.validate()?;
        Ok(req)
    }
}

async fn cmd_gif(args: GifArgs) -> anyhow::Result<()> {
    let req = args.request.resolve()?;
    let job = req.to_job()?;
    let character = posecast::load_character(&posecast::MannequinLoader::new(), req.character_id)
        .await?;

    let renderer = posecast::RendererHandle::for_export();
    let mut reported = 0;
    let blob = posecast::export_gif(&renderer, &character, &job, |p| {
        let pct = (p * 100.0) as u32;
        if pct >= reported + 25 {
            reported = pct - pct % 25;
            eprintln!("{reported}%");
        }
    })
    .await?;
    renderer.dispose().await;

    let out = match args.out {
        Some(out) => out,
        None => PathBuf::from(req.filename(unix_now())?),
    };
    create_parent(&out)?;
    std::fs::write(&out, blob.as_bytes())
        .with_context(|| format!("write gif '{}'", out.display()))?;

    eprintln!(
        "wrote {} ({} frames, {} bytes)",
        out.display(),
        blob.frame_count(),
        blob.len()
    );
    Ok(())
}

async fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let req = args.request.resolve()?;
    let mut session = posecast::PreviewSession::new(posecast::Canvas::square(args.size))?;
    session.set_job(req.to_job()?)?;
    match session
        .load(&posecast::MannequinLoader::new(), req.character_id)
        .await
    {
        posecast::LoadOutcome::Applied(_) => {}
        posecast::LoadOutcome::Stale(id) => anyhow::bail!("load of character {id} was superseded"),
        posecast::LoadOutcome::Failed(err) => return Err(err.into()),
    }
    let frame = session
        .render_frame(args.time)?
        .context("no character on stage")?;

    create_parent(&args.out)?;
    // Frames are opaque, so premultiplied and straight alpha agree.
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

fn cmd_presets() -> anyhow::Result<()> {
    for preset in posecast::MotionPresetId::ALL {
        let looping = if preset.is_looping() { "loop" } else { "once" };
        println!(
            "{:<16} {:<10} {:<5} {:<18} {}",
            preset.as_str(),
            format!("{:?}", preset.family()),
            looping,
            preset.label(),
            preset.description()
        );
    }
    Ok(())
}

fn cmd_lineup(args: LineupArgs) -> anyhow::Result<()> {
    let ids = posecast::parse_lineup_or_default(&args.input);
    let value = posecast::serialize_lineup(&ids);
    println!("{value}");
    println!("?{}={value}", posecast::character::ids::LINEUP_QUERY_KEY);
    Ok(())
}

fn create_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

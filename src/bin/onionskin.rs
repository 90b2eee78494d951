use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use onionskin::{
    BakeReport, Direction, Frame, ManualOverlayHost, MemoryScene, ObjectId, OnionSettings,
    OnionSkin, OnionSource, RecordedBatch, RecordingRenderer, RenderState, Rgba, SamplingMode,
    plan_skins,
};

#[derive(Parser, Debug)]
#[command(name = "onionskin", version)]
struct Cli {
    /// Log level written to stderr (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log: tracing::Level,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bake a scene and print the baked frames as JSON.
    Frames(BakeArgs),
    /// Bake a scene and print the skins drawn at one playhead position as JSON.
    Draw(DrawArgs),
}

#[derive(Args, Debug)]
struct BakeArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Settings JSON; defaults are used when omitted.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Objects to onion. One object is tracked on its own; several are joined. Defaults to
    /// every mesh in the scene.
    #[arg(long = "object")]
    objects: Vec<String>,

    /// Sampling mode override (per-frame, per-frame-stepped, direct-keys, inbetweening).
    #[arg(long)]
    mode: Option<SamplingMode>,

    /// Step override for per-frame-stepped.
    #[arg(long)]
    step: Option<u32>,
}

#[derive(Args, Debug)]
struct DrawArgs {
    #[command(flatten)]
    bake: BakeArgs,

    /// Playhead position to composite at.
    #[arg(long, allow_hyphen_values = true)]
    at: i32,

    /// Skin count override.
    #[arg(long)]
    count: Option<u32>,
}

#[derive(serde::Serialize)]
struct FramesOut {
    report: String,
    mode: Option<SamplingMode>,
    frames: Vec<FrameOut>,
    exact_keys: Vec<Frame>,
}

#[derive(serde::Serialize)]
struct FrameOut {
    frame: Frame,
    vertices: usize,
    triangles: usize,
}

#[derive(serde::Serialize)]
struct DrawOut {
    playhead: Frame,
    skins: Vec<SkinOut>,
}

#[derive(serde::Serialize)]
struct SkinOut {
    frame: Frame,
    direction: Direction,
    distance: u32,
    color: Rgba,
    state: RenderState,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Frames(args) => cmd_frames(args),
        Command::Draw(args) => cmd_draw(args),
    }
}

fn read_scene_json(path: &Path) -> anyhow::Result<MemoryScene> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("open scene '{}'", path.display()))?;
    MemoryScene::from_json(&s).with_context(|| format!("parse scene '{}'", path.display()))
}

fn read_settings(path: Option<&Path>) -> anyhow::Result<OnionSettings> {
    let Some(path) = path else {
        return Ok(OnionSettings::default());
    };
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("open settings '{}'", path.display()))?;
    OnionSettings::from_json(&s).with_context(|| format!("parse settings '{}'", path.display()))
}

/// Load scene and settings, apply overrides, and bake.
fn prepare(
    args: &BakeArgs,
    count: Option<u32>,
) -> anyhow::Result<(
    MemoryScene,
    RecordingRenderer,
    OnionSkin<RecordedBatch>,
    BakeReport,
)> {
    let mut scene = read_scene_json(&args.in_path)?;
    let mut settings = read_settings(args.settings.as_deref())?;
    if let Some(mode) = args.mode {
        settings.mode = Some(mode);
    }
    if let Some(step) = args.step {
        settings.skin_step = step;
    }
    if let Some(count) = count {
        settings.skin_count = count;
    }

    let mut renderer = RecordingRenderer::new();
    let mut onion = OnionSkin::new(settings)?;
    let report = match args.objects.as_slice() {
        [] => {
            let all: Vec<ObjectId> = scene.objects.keys().cloned().collect();
            onion.set_onion_from_selection(&mut scene, &mut renderer, &all)?
        }
        [one] => onion.set_onion_source(
            &mut scene,
            &mut renderer,
            OnionSource::Single(ObjectId::new(one.as_str())),
        )?,
        many => onion.set_onion_source(
            &mut scene,
            &mut renderer,
            OnionSource::Group(many.iter().map(|s| ObjectId::new(s.as_str())).collect()),
        )?,
    };
    Ok((scene, renderer, onion, report))
}

fn cmd_frames(args: BakeArgs) -> anyhow::Result<()> {
    let (_scene, _renderer, onion, report) = prepare(&args, None)?;
    let frames = onion.frames();

    let out = FramesOut {
        report: format!("{report:?}"),
        mode: frames.mode(),
        frames: frames
            .iter()
            .map(|(frame, baked)| FrameOut {
                frame,
                vertices: baked.snapshot.vertex_count(),
                triangles: baked.snapshot.triangle_count(),
            })
            .collect(),
        exact_keys: frames.exact_keys().iter().copied().collect(),
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_draw(args: DrawArgs) -> anyhow::Result<()> {
    let (mut scene, mut renderer, mut onion, report) = prepare(&args.bake, args.count)?;
    if !matches!(report, BakeReport::Baked { .. }) {
        eprintln!("nothing baked: {report:?}");
    }

    let mut overlay = ManualOverlayHost::new();
    onion.set_toggle(&mut overlay, true)?;
    scene.frame = Frame(args.at);
    onion.draw(&scene, &mut renderer, true);

    let plan = plan_skins(&onion.frames(), scene.frame, onion.settings());
    anyhow::ensure!(
        plan.len() == renderer.draws.len(),
        "planned {} skins but drew {} (bug)",
        plan.len(),
        renderer.draws.len()
    );
    let skins = plan
        .into_iter()
        .zip(renderer.take_draws())
        .map(|(skin, draw)| SkinOut {
            frame: skin.frame,
            direction: skin.direction,
            distance: skin.distance,
            color: draw.color,
            state: draw.state,
        })
        .collect();

    onion.set_toggle(&mut overlay, false)?;
    let out = DrawOut {
        playhead: scene.frame,
        skins,
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

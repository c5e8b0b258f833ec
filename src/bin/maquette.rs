use std::fs;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use maquette::workflow::{self, Collaborators};
use maquette::{
    Config, DesignStore, EditRequest, EffectKind, GeneratorOpts, OverlayAnchor, OverlaySpec, Rgba8,
    TextPosition, TextRenderer, TextStyle,
};

#[derive(Parser, Debug)]
#[command(name = "maquette", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate design candidates for an event type and theme.
    Generate(GenerateArgs),
    /// Apply effects, text, and overlays to an existing image file.
    Edit(EditArgs),
    /// Generate designs and include visually-similar past designs.
    Search(SearchArgs),
    /// Generate headline/tagline/description copy only.
    Copy(CopyArgs),
    /// Render styled caption variations of an existing image.
    Variations(VariationsArgs),
    /// Run the full flow: copy, image, headline overlay, search, upload.
    Workflow(WorkflowArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Event type (e.g. wedding, birthday, conference).
    #[arg(long)]
    event_type: String,

    /// Visual theme (e.g. rustic, neon, art deco).
    #[arg(long)]
    theme: String,

    /// Number of candidate designs.
    #[arg(long, default_value_t = 5)]
    count: usize,

    /// Output size as WIDTHxHEIGHT.
    #[arg(long, default_value = "512x512")]
    size: String,

    /// Directory for the rendered PNGs.
    #[arg(long, default_value = "designs")]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct EditArgs {
    /// Input image path.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Effect name: vintage, bright, contrast, blur.
    #[arg(long)]
    effect: Option<String>,

    /// Text overlay content.
    #[arg(long)]
    text: Option<String>,

    /// Text position: top, bottom, center.
    #[arg(long, default_value = "bottom")]
    text_position: String,

    /// Text color (name or #rrggbb).
    #[arg(long, default_value = "white")]
    text_color: String,

    /// Font size in pixels.
    #[arg(long, default_value_t = 36.0)]
    font_size: f32,

    /// Disable the text outline.
    #[arg(long)]
    no_outline: bool,

    /// Overlay image path.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Overlay anchor: center, top, bottom, left, right.
    #[arg(long, default_value = "center")]
    overlay_position: String,

    /// Overlay opacity in [0, 1].
    #[arg(long, default_value_t = 1.0)]
    opacity: f32,
}

#[derive(Parser, Debug)]
struct SearchArgs {
    #[arg(long)]
    event_type: String,

    #[arg(long)]
    theme: String,

    #[arg(long, default_value_t = 5)]
    count: usize,

    /// Directory for the rendered PNGs.
    #[arg(long, default_value = "designs")]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct CopyArgs {
    #[arg(long)]
    event_type: String,

    #[arg(long)]
    theme: String,
}

#[derive(Parser, Debug)]
struct VariationsArgs {
    /// Input image path.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Caption text to style.
    #[arg(long)]
    text: String,

    /// Number of style variations.
    #[arg(long, default_value_t = 5)]
    count: usize,

    /// Directory for the rendered PNGs.
    #[arg(long, default_value = "variations")]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct WorkflowArgs {
    #[arg(long)]
    event_type: String,

    #[arg(long)]
    theme: String,

    /// Output PNG path for the finished design.
    #[arg(long, default_value = "design.png")]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
        Command::Edit(args) => cmd_edit(args),
        Command::Search(args) => cmd_search(args),
        Command::Copy(args) => cmd_copy(args),
        Command::Variations(args) => cmd_variations(args),
        Command::Workflow(args) => cmd_workflow(args),
    }
}

fn parse_dims(size: &str) -> anyhow::Result<(u32, u32)> {
    let (w, h) = size
        .split_once('x')
        .with_context(|| format!("size '{size}' must be WIDTHxHEIGHT"))?;
    Ok((
        w.trim().parse().context("invalid width")?,
        h.trim().parse().context("invalid height")?,
    ))
}

fn generator_opts(cfg: &Config, size: Option<&str>) -> anyhow::Result<GeneratorOpts> {
    let mut opts = GeneratorOpts::from_config(cfg);
    if let Some(size) = size {
        let (w, h) = parse_dims(size)?;
        opts.width = w;
        opts.height = h;
    }
    Ok(opts)
}

fn write_designs(store: &DesignStore, ids: &[String], out_dir: &PathBuf) -> anyhow::Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("create output dir '{}'", out_dir.display()))?;
    for id in ids {
        let png = store.export_png(id)?;
        let path = out_dir.join(format!("design_{id}.png"));
        fs::write(&path, png).with_context(|| format!("write '{}'", path.display()))?;

        let record = store.record(id)?;
        println!(
            "{id}  score={:>5.1}  placeholder={}  -> {}",
            record.similarity_score,
            record.metadata.is_placeholder,
            path.display()
        );
    }
    Ok(())
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let cfg = Config::from_env();
    let opts = generator_opts(&cfg, Some(&args.size))?;

    let image_gen = maquette::hf::HfImageClient::from_config(&cfg)?;
    let text_client = maquette::hf::HfTextClient::from_config(&cfg)?;
    let collab = Collaborators {
        image_gen: &image_gen,
        text: cfg.huggingface_api_key.as_ref().map(|_| &text_client as _),
        search: None,
        object_store: None,
    };

    let store = DesignStore::new();
    let mut renderer = TextRenderer::new(cfg.font_path.as_deref());
    let ids = workflow::search_designs(
        &collab,
        &store,
        &mut renderer,
        opts,
        &args.event_type,
        &args.theme,
        args.count,
    );
    write_designs(&store, &ids, &args.out)
}

fn cmd_edit(args: EditArgs) -> anyhow::Result<()> {
    let cfg = Config::from_env();
    let bytes =
        fs::read(&args.in_path).with_context(|| format!("read '{}'", args.in_path.display()))?;
    let img = maquette::codec::decode_rgba(&bytes)?;

    let overlay = match &args.overlay {
        Some(path) => Some(OverlaySpec {
            bytes: fs::read(path).with_context(|| format!("read '{}'", path.display()))?,
            anchor: OverlayAnchor::from_name(&args.overlay_position),
            opacity: args.opacity.clamp(0.0, 1.0),
        }),
        None => None,
    };

    let style = TextStyle {
        size_px: args.font_size,
        color: Rgba8::parse(&args.text_color)?,
        position: TextPosition::from_name(&args.text_position),
        outline: !args.no_outline,
        outline_color: Rgba8::BLACK,
    };

    let req = EditRequest {
        effect: args.effect.as_deref().and_then(EffectKind::from_name),
        text: args.text.clone(),
        style: Some(style),
        overlay,
    };

    let mut renderer = TextRenderer::new(cfg.font_path.as_deref());
    let edited = maquette::compose::apply_edits(&img, &req, &mut renderer);
    let png = maquette::codec::encode_png(&edited)?;
    fs::write(&args.out, png).with_context(|| format!("write '{}'", args.out.display()))?;
    println!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_search(args: SearchArgs) -> anyhow::Result<()> {
    let cfg = Config::from_env();
    let opts = generator_opts(&cfg, None)?;

    let image_gen = maquette::hf::HfImageClient::from_config(&cfg)?;
    let text_client = maquette::hf::HfTextClient::from_config(&cfg)?;
    let search = maquette::qdrant::QdrantSearch::from_config(&cfg)?;
    let collab = Collaborators {
        image_gen: &image_gen,
        text: cfg.huggingface_api_key.as_ref().map(|_| &text_client as _),
        search: search.as_ref().map(|s| s as _),
        object_store: None,
    };

    let store = DesignStore::new();
    let mut renderer = TextRenderer::new(cfg.font_path.as_deref());
    let ids = workflow::search_designs(
        &collab,
        &store,
        &mut renderer,
        opts,
        &args.event_type,
        &args.theme,
        args.count,
    );
    write_designs(&store, &ids, &args.out)
}

fn cmd_copy(args: CopyArgs) -> anyhow::Result<()> {
    let cfg = Config::from_env();
    let text_client = maquette::hf::HfTextClient::from_config(&cfg)?;
    let client: Option<&dyn maquette::TextCompletion> =
        cfg.huggingface_api_key.as_ref().map(|_| &text_client as _);

    let copy = maquette::textgen::generate_copy(client, &args.event_type, &args.theme);
    println!("{}", serde_json::to_string_pretty(&copy)?);
    Ok(())
}

fn cmd_variations(args: VariationsArgs) -> anyhow::Result<()> {
    let cfg = Config::from_env();
    let bytes =
        fs::read(&args.in_path).with_context(|| format!("read '{}'", args.in_path.display()))?;
    let img = maquette::codec::decode_rgba(&bytes)?;

    let text_client = maquette::hf::HfTextClient::from_config(&cfg)?;
    let client: Option<&dyn maquette::TextCompletion> =
        cfg.huggingface_api_key.as_ref().map(|_| &text_client as _);

    let styles = maquette::styler::suggest_styles(client, &args.text, args.count);
    let mut renderer = TextRenderer::new(cfg.font_path.as_deref());
    let variations = maquette::styler::text_variations(&img, &args.text, &styles, &mut renderer);

    fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;
    for (i, variation) in variations.iter().enumerate() {
        let path = args.out.join(format!("variation_{i}.png"));
        let png = maquette::codec::encode_png(&variation.image)?;
        fs::write(&path, png).with_context(|| format!("write '{}'", path.display()))?;
        println!("{}  {}", variation.style.name, path.display());
    }
    Ok(())
}

fn cmd_workflow(args: WorkflowArgs) -> anyhow::Result<()> {
    let cfg = Config::from_env();
    let opts = generator_opts(&cfg, None)?;

    let image_gen = maquette::hf::HfImageClient::from_config(&cfg)?;
    let text_client = maquette::hf::HfTextClient::from_config(&cfg)?;
    let search = maquette::qdrant::QdrantSearch::from_config(&cfg)?;
    let object_store = maquette::storage::HttpObjectStore::from_config(&cfg)?;
    let collab = Collaborators {
        image_gen: &image_gen,
        text: cfg.huggingface_api_key.as_ref().map(|_| &text_client as _),
        search: search.as_ref().map(|s| s as _),
        object_store: object_store.as_ref().map(|s| s as _),
    };

    let store = DesignStore::new();
    let mut renderer = TextRenderer::new(cfg.font_path.as_deref());
    let out = workflow::run_workflow(
        &collab,
        &store,
        &mut renderer,
        opts,
        &args.event_type,
        &args.theme,
    )?;

    let png = store.export_png(&out.artifact_id)?;
    fs::write(&args.out, png).with_context(|| format!("write '{}'", args.out.display()))?;

    println!("headline:    {}", out.copy.headline);
    println!("tagline:     {}", out.copy.tagline);
    println!("description: {}", out.copy.description);
    println!("similar:     {}", out.similar_count);
    if let Some(handle) = &out.storage_handle {
        println!("stored:      {handle}");
    }
    println!("wrote {}", args.out.display());
    Ok(())
}

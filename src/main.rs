use anyhow::{bail, Context, Result};
use outfit_forge::assets::{AssetLoader, FileTransport};
use outfit_forge::catalog::ItemStore;
use outfit_forge::config::{fallback_anchors_path, load_editor_settings, EditorSettings};
use outfit_forge::player::{Character, PlayerColors};
use outfit_forge::scene::SceneGraph;
use outfit_forge::utils::logging::{init_logging, log_system_info};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

struct Args {
    catalog: Option<PathBuf>,
    fallbacks: Option<PathBuf>,
    assets: PathBuf,
    /// (item, slot) pairs
    equips: Vec<(String, String)>,
}

fn usage() -> &'static str {
    "usage: outfit-forge [--catalog FILE] [--fallbacks FILE] [--assets DIR] [ITEM@SLOT ...]"
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        catalog: None,
        fallbacks: None,
        assets: PathBuf::from("."),
        equips: Vec::new(),
    };
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--catalog" => args.catalog = Some(iter.next().context(usage())?.into()),
            "--fallbacks" => args.fallbacks = Some(iter.next().context(usage())?.into()),
            "--assets" => args.assets = iter.next().context(usage())?.into(),
            "-h" | "--help" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other => match other.split_once('@') {
                Some((item, slot)) => args.equips.push((item.to_string(), slot.to_string())),
                None => bail!("expected ITEM@SLOT, got '{}'\n{}", other, usage()),
            },
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    log_system_info();

    let args = parse_args()?;
    let settings = load_editor_settings().unwrap_or_else(|| {
        info!("No saved editor settings, using defaults");
        EditorSettings::default()
    });

    let mut store = ItemStore::with_defaults();
    if let Some(path) = &args.catalog {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        store.load_catalog_json(&text)?;
    }
    match args.fallbacks.clone().or_else(fallback_anchors_path) {
        Some(path) if path.exists() => {
            store.load_fallbacks(&path)?;
        }
        Some(path) => info!("No fallback anchors at {}", path.display()),
        None => warn!("No data directory for fallback anchors"),
    }
    info!("📋 Catalog holds {} items", store.len());

    let transport = Arc::new(FileTransport::new(args.assets.clone()));
    let loader = Arc::new(AssetLoader::from_settings(transport, &settings)?);
    let character = Character::create(
        store.into_handle(),
        SceneGraph::new().into_handle(),
        Arc::clone(&loader),
        args.equips,
        PlayerColors::from(&settings.player),
    )
    .await?;

    for (slot, item) in character.active_models().await {
        let placement = character
            .equipped(&slot)
            .await
            .map(|part| format!("{:?}", part.placement))
            .unwrap_or_default();
        info!("{:<24} {:<20} {}", slot, item, placement);
    }
    for (parent, waiting) in character.pending_attachments().await {
        warn!("'{}' never arrived for {:?}", parent, waiting);
    }

    let stats = loader.cache_stats().await;
    info!(
        "🗄️ Payload cache: {} entries, {} bytes, hit ratio {:.2}",
        stats.entries,
        stats.bytes,
        stats.hit_ratio()
    );

    character.dispose().await;
    Ok(())
}

use std::path::Path;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use quire::config::{Settings, CONFIG_FILE};
use quire::error::{Chainable, Result};
use quire::macros::MacroRegistry;
use quire::{Builder, ContentTree};

use crate::render::MarkdownWriter;

mod flags;
mod render;

pub const BOOK_FILE: &str = "book.md";
pub const INDEX_FILE: &str = "index.json";

/// Loads settings from `input`, with command-line overrides applied.
fn settings(flags: &flags::Binder) -> Result<Settings> {
    let mut settings = Settings::read(flags.input.join(CONFIG_FILE))?;
    if let Some(preset) = &flags.preset {
        settings.build.preset = Some(preset.clone());
    }

    if let Some(edition) = &flags.edition {
        settings.build.edition = Some(edition.clone());
    }

    if let Some(format) = &flags.format {
        settings.build.format = format.clone();
    }

    settings.validate()?;
    Ok(settings)
}

fn run(flags: &flags::Binder) -> Result<()> {
    let settings = settings(flags)?;
    let context = &settings.build;
    tracing::info!(
        preset = context.preset(),
        edition = context.edition(),
        format = context.format(),
        "building"
    );

    let registry = MacroRegistry::with_builtins();
    let mut tree = ContentTree::from_settings(&settings)?;
    tree.harvest(&settings.content, &registry, context)
        .chain_with(|| "harvest failed")?;

    create_dir(&flags.output)?;
    let mut writer = MarkdownWriter::create(flags.output.join(BOOK_FILE), context)?;
    Builder::new(&tree, &settings.content, &registry, context)
        .strip_summary_tags(settings.strip_summary_tags)
        .build(&mut writer)
        .chain_with(|| "build failed")?;

    render::write_index(&tree, context, flags.output.join(INDEX_FILE))
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).chain_with(|| quire::error! {
        "failed to create output directory",
        "path" => path.display(),
    })
}

pub fn main() {
    let flags = flags::Binder::from_env_or_exit();

    let filter = if flags.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    let start = std::time::Instant::now();
    if let Err(e) = run(&flags) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }

    tracing::info!("total time: {}ms", start.elapsed().as_millis());
}

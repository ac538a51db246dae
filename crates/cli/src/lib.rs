use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_annotator_core::settings::{self, EditorSettings, SettingsStore};
use pdf_annotator_core::{AnnotationKind, EditorSession, FileInput, PDF_MIME};
use pdf_engine::{LopdfEngine, OpenSource, PdfEngine};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub mod script;

use script::Script;

#[derive(Debug, Parser)]
#[command(name = "pdf-annotator")]
#[command(about = "Place text and checkmarks on PDF pages and flatten them into the file")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Replay a session script and write the flattened PDF.
    Annotate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_name = "JSON")]
        script: PathBuf,
        /// Directory for the output; defaults to the input's directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Render a page with its annotation overlay to PNG.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_name = "JSON")]
        script: Option<PathBuf>,
        /// 1-based page; defaults to the page the script ends on.
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        scale: Option<f32>,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Replay a session script and print the resulting annotations.
    List {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_name = "JSON")]
        script: PathBuf,
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    page_sizes: Vec<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Annotate { file, script, output_dir, config } => {
            run_annotate(&file, &script, output_dir.as_deref(), config.as_deref())
        }
        Commands::Render { file, script, page, scale, output, config } => {
            run_render(&file, script.as_deref(), page, scale, &output, config.as_deref())
        }
        Commands::List { file, script, config } => run_list(&file, &script, config.as_deref()),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut engine = LopdfEngine::new();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let page_count = engine.page_count(handle)?;
    let page_sizes = (0..page_count)
        .map(|index| -> Result<PageSizeOutput> {
            let size = engine.page_size(handle, index)?;
            Ok(PageSizeOutput { width: size.width_pt, height: size.height_pt })
        })
        .collect::<Result<Vec<_>>>()?;

    let payload = InfoOutput { path: file.display().to_string(), page_count, page_sizes };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    engine.close(handle)?;

    Ok(())
}

fn run_annotate(
    file: &Path,
    script: &Path,
    output_dir: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let mut session = open_session(file, config)?;
    Script::load(script)?.replay(&mut session)?;
    session.blur();

    let exported = session.export().context("failed to export PDF")?;

    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => file.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let output = dir.join(&exported.name);
    fs::write(&output, &exported.bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}

fn run_render(
    file: &Path,
    script: Option<&Path>,
    page: Option<u32>,
    scale: Option<f32>,
    output: &Path,
    config: Option<&Path>,
) -> Result<()> {
    let mut session = open_session(file, config)?;
    if let Some(script) = script {
        Script::load(script)?.replay(&mut session)?;
    }

    if let Some(page) = page {
        if page == 0 || page > session.page_count() {
            anyhow::bail!("--page {page} is outside 1..={}", session.page_count());
        }
        session.go_to_page(page);
    }
    if let Some(scale) = scale {
        session.set_scale(scale)?;
    }

    let image = session.render_current_page().context("failed to render page")?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    image
        .save(output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}

fn run_list(file: &Path, script: &Path, config: Option<&Path>) -> Result<()> {
    let mut session = open_session(file, config)?;
    Script::load(script)?.replay(&mut session)?;
    session.blur();

    for annotation in session.annotations().iter() {
        let position = annotation.position();
        let line = match annotation.kind() {
            AnnotationKind::Text { content, font_size, width } => format!(
                "page={} kind=text x={:.1} y={:.1} width={width:.1} font_size={font_size:.1} content={content:?}",
                annotation.page(),
                position.x,
                position.y,
            ),
            AnnotationKind::Checkmark { size } => format!(
                "page={} kind=checkmark x={:.1} y={:.1} size={size:.1}",
                annotation.page(),
                position.x,
                position.y,
            ),
        };
        println!("{line}");
    }

    Ok(())
}

fn open_session(file: &Path, config: Option<&Path>) -> Result<EditorSession> {
    ensure_pdf_exists(file)?;

    let settings = load_settings(config)?;
    let mut session = EditorSession::new(settings).context("invalid editor settings")?;

    let name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_owned());
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;

    session
        .open(FileInput { name, mime: mime_for(file).to_owned(), bytes })
        .context("failed to open PDF")?;
    Ok(session)
}

fn load_settings(config: Option<&Path>) -> Result<EditorSettings> {
    if let Some(path) = config {
        return settings::load_file(path)
            .with_context(|| format!("failed to load settings from {}", path.display()));
    }

    match SettingsStore::from_default_project().and_then(|store| store.load()) {
        Ok(settings) => Ok(settings),
        Err(error) => {
            log::warn!("using default settings: {error}");
            Ok(EditorSettings::default())
        }
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_MIME,
        _ => "application/octet-stream",
    }
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

//! Command-line album exporter.

use clap::{Parser, ValueEnum};
use pagecraft_core::{
    AlbumSource, BackgroundScope, BackgroundStyle, FileStore, SerializableColor, StaticBackgrounds, StorageError,
};
use pagecraft_render::{
    AlbumExporter, ExportError, ExportFormat, ExportOptions, ExportProgress, FontBook, FsImageLoader, Orientation,
    RenderError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("Invalid config {path}: {reason}")]
    Config { path: PathBuf, reason: String },
    #[error("Invalid color: {0}")]
    Color(String),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    A4,
    A5,
    Letter,
    Square,
    Original,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::A4 => ExportFormat::A4,
            FormatArg::A5 => ExportFormat::A5,
            FormatArg::Letter => ExportFormat::Letter,
            FormatArg::Square => ExportFormat::Square,
            FormatArg::Original => ExportFormat::Original,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
        }
    }
}

/// Export a PageCraft album to PDF
#[derive(Parser, Debug)]
#[command(name = "pagecraft")]
#[command(version, about, long_about = None)]
struct Args {
    /// Album to export
    #[arg(value_name = "ALBUM")]
    album: String,

    /// Output PDF file
    #[arg(short, long, default_value = "album.pdf")]
    output: PathBuf,

    /// Page store directory (defaults to the user data directory)
    #[arg(long, value_name = "DIR")]
    store: Option<PathBuf>,

    /// Directory image paths are resolved against (defaults to the store)
    #[arg(long, value_name = "DIR")]
    images: Option<PathBuf>,

    /// JSON file with export options
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// JPEG quality of page images (0-1)
    #[arg(long)]
    quality: Option<f64>,

    /// Font file to register, repeatable (`Family-BoldItalic.ttf`)
    #[arg(long = "font", value_name = "FILE")]
    fonts: Vec<PathBuf>,

    /// Solid background applied to every page of the album
    #[arg(long, value_name = "COLOR")]
    background: Option<String>,

    /// Also write one PNG per page into this directory
    #[arg(long, value_name = "DIR")]
    png_dir: Option<PathBuf>,
}

fn load_options(args: &Args) -> Result<ExportOptions, AppError> {
    let mut options = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|source| AppError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&json).map_err(|e| AppError::Config {
                path: path.clone(),
                reason: e.to_string(),
            })?
        }
        None => ExportOptions::default(),
    };

    if let Some(format) = args.format {
        options.format = format.into();
    }
    if let Some(orientation) = args.orientation {
        options.orientation = orientation.into();
    }
    if let Some(quality) = args.quality {
        options.quality = quality.clamp(0.0, 1.0);
    }
    Ok(options)
}

fn load_fonts(paths: &[PathBuf]) -> Result<FontBook, AppError> {
    let mut fonts = FontBook::new();
    for path in paths {
        fonts.register_file(path)?;
    }
    Ok(fonts)
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), AppError> {
    std::fs::write(path, data).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })
}

async fn run(args: Args) -> Result<(), AppError> {
    let options = load_options(&args)?;
    let store = match &args.store {
        Some(dir) => FileStore::new(dir.clone())?,
        None => FileStore::default_location()?,
    };
    let image_dir = args.images.clone().unwrap_or_else(|| store.base_path().to_path_buf());

    let mut exporter = AlbumExporter::new(load_fonts(&args.fonts)?, Arc::new(FsImageLoader::new(image_dir)));
    if let Some(color) = &args.background {
        let color = SerializableColor::parse(color).ok_or_else(|| AppError::Color(color.clone()))?;
        let backgrounds = StaticBackgrounds::new();
        backgrounds.set(&args.album, BackgroundScope::Album, BackgroundStyle::Solid { color })?;
        exporter = exporter.with_backgrounds(Arc::new(backgrounds), BackgroundScope::Album);
    }

    let blob = exporter
        .export_album(&store, &args.album, &options, |p: ExportProgress| {
            log::info!("{:?} {}%", p.phase, p.percent);
        })
        .await?;
    write_file(&args.output, &blob.data)?;
    println!("Wrote {} ({} bytes)", args.output.display(), blob.data.len());

    if let Some(dir) = &args.png_dir {
        std::fs::create_dir_all(dir).map_err(|source| AppError::Io {
            path: dir.clone(),
            source,
        })?;
        for (i, page_id) in store.album_pages(&args.album).await?.iter().enumerate() {
            let document = exporter.load_document(&store, &args.album, page_id).await?;
            let png = exporter.render_page_png(&document, options.max_tile_size).await?;
            let path = dir.join(format!("page-{:03}.png", i + 1));
            write_file(&path, &png)?;
            log::info!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = pollster::block_on(run(args)) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("export.json");
        std::fs::write(&config, r#"{"format": "a5", "quality": 0.5, "maxTileSize": 2048}"#).unwrap();

        let args = Args::try_parse_from([
            "pagecraft",
            "summer",
            "--config",
            config.to_str().unwrap(),
            "--orientation",
            "landscape",
            "--quality",
            "3",
        ])
        .unwrap();
        let options = load_options(&args).unwrap();
        assert_eq!(options.format, ExportFormat::A5);
        assert_eq!(options.orientation, Orientation::Landscape);
        assert_eq!(options.max_tile_size, 2048);
        assert!((options.quality - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bad_config_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("export.json");
        std::fs::write(&config, "{not json").unwrap();
        let args = Args::try_parse_from(["pagecraft", "summer", "--config", config.to_str().unwrap()]).unwrap();
        assert!(matches!(load_options(&args), Err(AppError::Config { .. })));
    }
}

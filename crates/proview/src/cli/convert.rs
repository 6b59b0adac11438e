//! The `proview convert` command for re-encoding assets.

use clap::{Args, ValueEnum};
use proview_core::{Config, ExportFormat, ExportOptions, ProView, Rotation, TargetBox};
use std::path::PathBuf;

use super::expand_path;

/// Arguments for the `convert` command.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Source asset
    pub src: PathBuf,

    /// Destination file; parent directories are created
    pub dst: PathBuf,

    /// Output format (inferred from the destination extension by default)
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// JPEG quality
    #[arg(short, long, default_value = "90", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Clockwise rotation in degrees (multiple of 90)
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub rotate: i32,

    /// Fit inside this width, never enlarging
    #[arg(long)]
    pub width: Option<u32>,

    /// Fit inside this height, never enlarging
    #[arg(long)]
    pub height: Option<u32>,
}

/// Export formats accepted on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    #[value(alias = "jpg")]
    Jpeg,
    Png,
    #[value(alias = "tif")]
    Tiff,
    /// Lossless WebP
    Webp,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Jpeg => ExportFormat::Jpeg,
            FormatArg::Png => ExportFormat::Png,
            FormatArg::Tiff => ExportFormat::Tiff,
            FormatArg::Webp => ExportFormat::Webp,
        }
    }
}

/// Execute the convert command.
pub async fn execute(args: ConvertArgs, config: Config) -> anyhow::Result<()> {
    let src = expand_path(&args.src);
    let dst = expand_path(&args.dst);
    let options = export_options(&args)?;

    let summary = ProView::new(config).convert(&src, &dst, &options).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn export_options(args: &ConvertArgs) -> anyhow::Result<ExportOptions> {
    let rotation = Rotation::from_degrees(args.rotate)
        .ok_or_else(|| anyhow::anyhow!("--rotate must be a multiple of 90, got {}", args.rotate))?;

    let resize = match (args.width, args.height) {
        (None, None) => None,
        (width, height) => Some(TargetBox::new(
            width.unwrap_or(u32::MAX),
            height.unwrap_or(u32::MAX),
        )),
    };

    Ok(ExportOptions {
        format: args.format.map(Into::into),
        quality: args.quality,
        rotation,
        resize,
    })
}

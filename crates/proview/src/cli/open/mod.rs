//! The `proview open` command: a file becomes one record, a directory
//! becomes a stream of batched records.

mod batch;
mod setup;
pub mod types;

pub use types::OutputFormat;

use clap::Args;
use proview_core::{AssetRecord, Config, OutputFormat as CoreOutputFormat, ProView, RecordWriter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::expand_path;
use batch::ingest_directory;
use setup::setup_pipeline;

/// Arguments for the `open` command.
#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Asset file or directory to ingest
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Thumbnail box width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Thumbnail box height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Files processed concurrently per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Also write each thumbnail as a PNG file into this directory
    #[arg(long)]
    pub thumbnails_dir: Option<PathBuf>,

    /// Leave thumbnail bytes out of the JSON records
    #[arg(long)]
    pub no_thumbnail_data: bool,
}

/// Values match the clap defaults above.
impl Default for OpenArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: None,
            format: OutputFormat::Json,
            recursive: false,
            width: None,
            height: None,
            batch_size: None,
            thumbnails_dir: None,
            no_thumbnail_data: false,
        }
    }
}

/// Pipeline assembled by [`setup_pipeline`].
pub(crate) struct OpenContext {
    pub proview: ProView,
    pub output_format: CoreOutputFormat,
}

/// Execute the open command.
pub async fn execute(mut args: OpenArgs, config: Config) -> anyhow::Result<()> {
    args.input = expand_path(&args.input);
    args.output = args.output.as_deref().map(expand_path);
    args.thumbnails_dir = args.thumbnails_dir.as_deref().map(expand_path);

    if !args.input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.input
        );
    }
    let ctx = setup_pipeline(&args, config)?;
    let writer = RecordWriter::new(
        output_sink(args.output.as_deref())?,
        ctx.output_format,
        matches!(args.format, OutputFormat::Json),
    );

    if args.input.is_dir() {
        let (stats, _) = ingest_directory(&ctx, &args, writer).await?;
        if stats.succeeded == 0 && stats.failed == 0 {
            tracing::warn!("No supported asset files found in {:?}", args.input);
        }
    } else {
        open_single(&ctx, &args, writer).await?;
    }

    if let Some(path) = &args.output {
        tracing::info!("Output written to {:?}", path);
    }
    Ok(())
}

/// Ingest a single file and write its record.
async fn open_single<W: Write>(
    ctx: &OpenContext,
    args: &OpenArgs,
    mut writer: RecordWriter<W>,
) -> anyhow::Result<W> {
    let mut record = ctx.proview.open_asset(&args.input).await?;
    prepare_record(&mut record, args)?;
    writer.write_one(&record)?;
    Ok(writer.finish()?)
}

/// Apply the thumbnail output flags to a record before it is written.
pub(crate) fn prepare_record(record: &mut AssetRecord, args: &OpenArgs) -> anyhow::Result<()> {
    if let Some(dir) = &args.thumbnails_dir {
        let path = thumbnail_path(dir, record);
        std::fs::write(&path, &record.thumbnail.data)?;
        tracing::debug!("Thumbnail for {} written to {:?}", record.name, path);
    }
    if args.no_thumbnail_data {
        record.thumbnail.data.clear();
    }
    Ok(())
}

/// `<dir>/<file name>.png`, so `a.jpg` and `a.psd` do not collide.
fn thumbnail_path(dir: &Path, record: &AssetRecord) -> PathBuf {
    dir.join(format!("{}.png", record.name))
}

fn output_sink(path: Option<&Path>) -> anyhow::Result<Box<dyn Write + Send>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout()),
    })
}

//! Config overrides and pipeline construction for `proview open`.

use proview_core::{Config, ProView};

use super::{OpenArgs, OpenContext};

/// Validate overrides and assemble the pipeline.
pub fn setup_pipeline(args: &OpenArgs, mut config: Config) -> anyhow::Result<OpenContext> {
    apply_overrides(&mut config, args)?;

    if let Some(dir) = &args.thumbnails_dir {
        std::fs::create_dir_all(dir)?;
    }

    Ok(OpenContext {
        proview: ProView::new(config),
        output_format: args.format.into(),
    })
}

fn apply_overrides(config: &mut Config, args: &OpenArgs) -> anyhow::Result<()> {
    if let Some(width) = args.width {
        config.thumbnail.width = width;
    }
    if let Some(height) = args.height {
        config.thumbnail.height = height;
    }
    if config.thumbnail.width == 0 || config.thumbnail.height == 0 {
        anyhow::bail!("Thumbnail width and height must be at least 1 pixel");
    }

    if let Some(batch_size) = args.batch_size {
        if batch_size == 0 {
            anyhow::bail!("--batch-size must be at least 1");
        }
        config.ingest.batch_size = batch_size;
    }
    if args.recursive {
        config.ingest.recursive = true;
    }
    Ok(())
}

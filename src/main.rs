use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};

mod cli;

use sejto::config::{CacheState, CONFIG_FNAME};
use sejto::dataset::{DatasetStore, DATASET_FNAME, HTTP_TIMEOUT, HTTP_USER_AGENT};
use sejto::output::{self, SortOrder};
use sejto::{init_tracing, model, query};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_tracing(args.verbose);

    // Static listings need no dataset at all.
    if args.list_instance_series {
        for series in model::INSTANCE_SERIES {
            println!("{}: {}", series.label, series.desc);
        }
        return Ok(());
    }
    if args.list_instance_options {
        for option in model::INSTANCE_OPTIONS {
            println!("{}: {}", option.label, option.desc);
        }
        return Ok(());
    }

    // Configuration errors abort before any data is fetched or scanned.
    let sort_order = SortOrder::parse(&args.sort_order)?;
    let filter = args.instance_filter();
    filter.validate()?;

    fs::create_dir_all(&args.data_dir).with_context(|| {
        format!("unable to create directory '{}'", args.data_dir.display())
    })?;
    let config_path = args.data_dir.join(CONFIG_FNAME);
    let data_path = args.data_dir.join(DATASET_FNAME);
    debug!(config = %config_path.display(), data = %data_path.display(), "local files");

    let client = reqwest::Client::builder()
        .user_agent(HTTP_USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()?;
    let mut store = DatasetStore::new(data_path, CacheState::load(&config_path));
    let data = store
        .update(&client, &args.dataset_url)
        .await
        .context("failed to get AWS Spot Advisor data")?;
    // A stale cache state only costs one conditional request next run.
    if let Err(err) = store.cache.store(&config_path) {
        warn!(%err, path = %config_path.display(), "unable to persist cache state");
    }

    // The action group admits exactly one of --region and --list-regions
    // past this point.
    let out = match args.region.as_deref() {
        Some(region) => query::run(
            &data,
            region,
            args.os.as_str(),
            &filter,
            &sort_order,
            args.output_format,
        )?,
        None => output::render_regions(&data.region_details(), args.output_format)?,
    };
    print!("{}", out);

    Ok(())
}

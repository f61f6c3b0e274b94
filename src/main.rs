//! Retail Insights CLI: loads data, runs one pipeline stage, prints a report

use std::fs::{self, File};
use std::io::BufWriter;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use retail_insights::cli::{parse_customer_features, Args, Command};
use retail_insights::ingest::{self, Schema};
use retail_insights::{load, report, synthetic, DataSource, Pipeline, PipelineConfig, RecordStore};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = PipelineConfig::load_or_default(args.config.as_deref())?;
    if let Some(seed) = args.data_seed {
        config.synthetic.seed = seed;
    }

    let start_time = Instant::now();
    let store = load_store(&args, &config)?;
    let mut pipeline = Pipeline::new(config, store);

    run_command(&args.command, &mut pipeline)?;

    debug!(elapsed_ms = start_time.elapsed().as_millis() as u64, "command finished");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Synthetic store, with either half replaced by an ingested CSV
fn load_store(args: &Args, config: &PipelineConfig) -> Result<RecordStore> {
    let mut store = load(DataSource::Synthetic(config.synthetic.clone()))?;

    if let Some(path) = &args.customers {
        let table = ingest::read_csv_file(path).with_context(|| format!("reading {}", path.display()))?;
        let records = ingest::ingest(&table, Schema::Customer).with_context(|| format!("ingesting {}", path.display()))?;
        info!(path = %path.display(), records = records.len(), "custom customer data loaded");
        store.replace(records);
    }
    if let Some(path) = &args.traffic {
        let table = ingest::read_csv_file(path).with_context(|| format!("reading {}", path.display()))?;
        let records = ingest::ingest(&table, Schema::Traffic).with_context(|| format!("ingesting {}", path.display()))?;
        info!(path = %path.display(), records = records.len(), "custom traffic data loaded");
        store.replace(records);
    }

    Ok(store)
}

fn run_command(command: &Command, pipeline: &mut Pipeline) -> Result<()> {
    match command {
        Command::Summary => {
            print!("{}", report::render_summary(&pipeline.summary()));
        }
        Command::Window { start, end } => {
            let window = &mut pipeline.config.window;
            window.start_hour = start.unwrap_or(window.start_hour);
            window.end_hour = end.unwrap_or(window.end_hour);
            let (start_hour, end_hour) = (window.start_hour, window.end_hour);

            let samples = pipeline.windowed_traffic()?;
            print!("{}", report::render_traffic(&samples, start_hour, end_hour));
        }
        Command::Trend { window } => {
            if let Some(window) = window {
                pipeline.config.trend.window = *window;
            }
            let points = pipeline.purchase_trend()?;
            print!("{}", report::render_trend(&points, pipeline.config.trend.window));
        }
        Command::Segment { clusters, seed, max_iters, tolerance, predict } => {
            let params = &mut pipeline.config.segmentation;
            params.k = clusters.unwrap_or(params.k);
            params.seed = seed.unwrap_or(params.seed);
            params.max_iterations = max_iters.unwrap_or(params.max_iterations);
            params.tolerance = tolerance.unwrap_or(params.tolerance);

            let segmentation = pipeline.segment()?;
            print!("{}", report::render_segmentation(&segmentation));

            if let Some(input) = predict {
                let features = parse_customer_features(input)?;
                let segment = segmentation.predict(&features)?;
                println!(
                    "\nPredicted segment for dwell={}, purchase={}, visits={}: {segment}",
                    features[0], features[1], features[2]
                );
            }
        }
        Command::Recommend { clusters, seed, json } => {
            let params = &mut pipeline.config.segmentation;
            params.k = clusters.unwrap_or(params.k);
            params.seed = seed.unwrap_or(params.seed);

            let (segmentation, recommendations) = pipeline.recommend()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&recommendations)?);
            } else {
                print!("{}", report::render_segmentation(&segmentation));
                println!();
                print!("{}", report::render_recommendations(&recommendations));
            }
        }
        Command::Heatmap { rows, cols } => {
            let grid = synthetic::traffic_heatmap(*rows, *cols, pipeline.config.synthetic.seed);
            print!("{}", report::render_heatmap(&grid));
        }
        Command::Export { out } => {
            fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

            let customers_path = out.join("customers.csv");
            let file = File::create(&customers_path).with_context(|| format!("creating {}", customers_path.display()))?;
            ingest::export_customers(&pipeline.store.customers, BufWriter::new(file))?;

            let traffic_path = out.join("traffic.csv");
            let file = File::create(&traffic_path).with_context(|| format!("creating {}", traffic_path.display()))?;
            ingest::export_traffic(&pipeline.store.traffic, BufWriter::new(file))?;

            println!("Customers saved to: {}", customers_path.display());
            println!("Traffic saved to: {}", traffic_path.display());
        }
    }
    Ok(())
}

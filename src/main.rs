use std::path::PathBuf;

use shelterpack::loading::{load_config, load_products, load_shelters};
use shelterpack::output::{render_summaries, write_table};
use shelterpack::{Catalog, CbcEngine, allocate_shelters};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: shelterpack <products.csv> <shelters.csv> \
                     [--config <config.yaml>] [--data-dir <dir>] [--output <output.csv>]";

struct Args {
    products: PathBuf,
    shelters: PathBuf,
    config: PathBuf,
    data_dir: PathBuf,
    output: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut positional = Vec::new();
    let mut config = PathBuf::from("config.yaml");
    let mut data_dir = PathBuf::from("data");
    let mut output = None;

    while let Some(arg) = args.next() {
        let mut value = || args.next().ok_or_else(|| format!("{arg} needs a value\n{USAGE}"));
        match arg.as_str() {
            "--config" => config = value()?.into(),
            "--data-dir" => data_dir = value()?.into(),
            "--output" => output = Some(value()?.into()),
            "-h" | "--help" => return Err(USAGE.to_owned()),
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let [products, shelters]: [PathBuf; 2] = positional
        .try_into()
        .map_err(|_| USAGE.to_owned())?;
    Ok(Args {
        products,
        shelters,
        config,
        data_dir,
        output,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;

    let config = load_config(&args.config)?;
    let table = load_products(&args.data_dir.join(&args.products), config.volume_factor)?;
    let shelters = load_shelters(&args.data_dir.join(&args.shelters))?;
    let catalog = Catalog::new(&table.products)?.with_columns(table.columns);

    let engine = CbcEngine::new().with_time_limit(config.time_limit_seconds);
    let report = allocate_shelters(&engine, &catalog, &shelters, &config);

    print!("{}", render_summaries(&shelters, &report));

    if report.is_empty() {
        info!(
            shelters = shelters.len(),
            "no shelter could be allocated, nothing written"
        );
        return Ok(());
    }

    let output = args
        .output
        .unwrap_or_else(|| args.data_dir.join("output.csv"));
    write_table(&output, &catalog, &report.allocations)?;
    info!(
        path = %output.display(),
        shelters = report.allocations.len(),
        "allocations written"
    );
    Ok(())
}

use anyhow::Context;
use hskg::{EmbeddingProviderFactory, GraphExport, HskgConfig, Pipeline, RawItem};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("hskg=info".parse()?))
        .init();

    let config = match std::env::var("HSKG_CONFIG") {
        Ok(path) => HskgConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        Err(_) => {
            let config = HskgConfig::from_env();
            config.validate()?;
            config
        }
    };

    let dataset = std::env::var("HSKG_DATASET")
        .context("HSKG_DATASET must point to a JSON array of {\"text\", \"side\"} records")?;
    let raw = std::fs::read_to_string(&dataset)
        .with_context(|| format!("failed to read dataset {dataset}"))?;
    let items: Vec<RawItem> =
        serde_json::from_str(&raw).with_context(|| format!("invalid dataset {dataset}"))?;

    let provider = EmbeddingProviderFactory::from_config(&config)?;
    let pipeline = Pipeline::from_config(config)?;
    let output = pipeline.run_detailed(&items, provider.as_ref()).await?;

    println!("{}", serde_json::to_string_pretty(&output.report)?);

    if let Ok(path) = std::env::var("HSKG_GRAPH_OUT") {
        GraphExport::from_graph(&output.graph, &output.universe)
            .write_json(&path)
            .with_context(|| format!("failed to write graph export to {path}"))?;
    }

    Ok(())
}

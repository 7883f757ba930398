// Command-line prediction
//
// Usage: predict [input.json]   (reads stdin when no file is given)
// Input is a FeatureInput object or an array of them; output is pretty JSON.

use anyhow::{Context, Result};
use crop_advisor_rust::{AdvisorConfig, FeatureInput};
use std::io::Read;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crop_advisor_rust=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input: {}", path))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read input from stdin")?;
            buffer
        }
    };

    let value: serde_json::Value = serde_json::from_str(&raw).context("Failed to parse input JSON")?;

    let config = AdvisorConfig::from_env();
    config.log();
    let predictor = config.build_predictor();

    let output = if value.is_array() {
        let inputs: Vec<FeatureInput> = serde_json::from_value(value).context("Invalid input array")?;
        serde_json::to_string_pretty(&predictor.predict_batch(&inputs))?
    } else {
        let input: FeatureInput = serde_json::from_value(value).context("Invalid input object")?;
        serde_json::to_string_pretty(&predictor.predict(&input))?
    };

    println!("{}", output);
    Ok(())
}

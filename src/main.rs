use anyhow::Context;
use clap::Parser;
use qrvector::settings::{load_settings, save_settings, JsonFileStore, MemoryStore, SettingsStore};
use qrvector::{Normalizer, NormalizerConfig, QrRenderRequest, StyledQrEncoder};
use std::path::PathBuf;

/// Render a QR code as a clean, exactly-sized SVG fragment
#[derive(Parser, Debug)]
#[command(name = "qrvector", version, about)]
struct Args {
    /// Data to encode (defaults to the saved or default url)
    #[arg(long)]
    url: Option<String>,
    /// Fill color for every shape
    #[arg(long)]
    color: Option<String>,
    /// Side of the output square in pixels
    #[arg(long)]
    size: Option<u32>,
    /// Inset from every edge in pixels
    #[arg(long)]
    margin: Option<u32>,
    /// Canvas side the encoder renders at before normalization
    #[arg(long, default_value_t = qrvector::DEFAULT_WORKING_SIZE)]
    working_size: u32,
    /// Upper bound on waiting for the encoder, in milliseconds
    #[arg(long, default_value_t = 250)]
    settle_ms: u64,
    /// JSON settings file holding the last used parameters
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Persist the effective parameters to the settings file
    #[arg(long, requires = "settings")]
    save: bool,
    /// Print a base64 data URL instead of SVG markup
    #[arg(long)]
    data_url: bool,
    /// Write output to this file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

impl Args {
    fn request(&self, saved: QrRenderRequest) -> QrRenderRequest {
        QrRenderRequest {
            url: self.url.clone().unwrap_or(saved.url),
            color: self.color.clone().unwrap_or(saved.color),
            size: self.size.unwrap_or(saved.size),
            margin: self.margin.unwrap_or(saved.margin),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let store: Box<dyn SettingsStore> = match &args.settings {
        Some(path) => Box::new(JsonFileStore::new(path)),
        None => Box::new(MemoryStore::new()),
    };
    let saved = load_settings(store.as_ref()).context("loading settings")?;
    let request = args.request(saved);

    let config = NormalizerConfig {
        working_size: args.working_size,
        settle_timeout_ms: args.settle_ms,
        ..Default::default()
    };
    let normalizer = Normalizer::new(StyledQrEncoder::new(), config);
    let fragment = normalizer
        .generate_fragment(&request)
        .await
        .with_context(|| format!("generating QR for {}", request.url))?;

    let output = if args.data_url {
        fragment.to_data_url()?
    } else {
        fragment.to_svg_string()?
    };

    match &args.out {
        Some(path) => std::fs::write(path, &output)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", output),
    }

    if args.save {
        save_settings(store.as_ref(), &request).context("saving settings")?;
    }
    Ok(())
}

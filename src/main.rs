pub mod types;
pub mod config;
pub mod fetch;
pub mod processing;
pub mod render;
pub mod marine;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch boundaries and render the labelled map
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Fetch boundaries and report counts and extent without rendering
    Inspect {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            println!("Generating map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let client = reqwest::Client::new();

            // 1. Fetch boundaries; each request finishes before the next starts
            println!("Fetching county boundaries...");
            let counties = fetch::fetch_regions(&client, &app_config.sources.counties).await?;
            println!("Fetching state boundaries...");
            let states = fetch::fetch_regions(&client, &app_config.sources.states).await?;

            // 2. Derive label anchors and cut the states down to the neighbors
            let neighbors = processing::filter_by_name(states, &app_config.filter.states);
            println!("Kept {} neighboring states", neighbors.len());

            let centroids = processing::derive_centroids(&counties)?;
            let labels = processing::place_labels(&centroids, &app_config.labels);

            // The view is cropped to the counties; neighbors and water are
            // context only and must not widen the frame
            let extent = processing::extent(&counties)
                .ok_or_else(|| anyhow!("County dataset contains no geometry"))?;

            // 2b. Supplementary water polygons (if configured)
            let marine = match &app_config.sources.marine {
                Some(path) => marine::load_marine(path)?,
                None => Vec::new(),
            };

            // 3. Render
            let layers = render::build_layers(
                &app_config.style,
                &app_config.labels,
                &counties,
                &neighbors,
                &marine,
                labels,
            );
            render::write_map(&app_config.output, &layers, extent)?;

            println!("Generation complete!");
        }
        Commands::Inspect { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let client = reqwest::Client::new();

            println!("Fetching county boundaries...");
            let counties = fetch::fetch_regions(&client, &app_config.sources.counties).await?;
            println!("Fetching state boundaries...");
            let states = fetch::fetch_regions(&client, &app_config.sources.states).await?;
            let neighbors = processing::filter_by_name(states, &app_config.filter.states);

            if let Some(extent) = processing::extent(&counties) {
                println!(
                    "County extent: {:.4}..{:.4} x {:.4}..{:.4}",
                    extent.min().x,
                    extent.max().x,
                    extent.min().y,
                    extent.max().y
                );
            }

            println!("Counties ({}):", counties.len());
            for county in &counties {
                match &county.code {
                    Some(code) => println!("  {} ({})", county.name, code),
                    None => println!("  {}", county.name),
                }
            }

            let kept: Vec<&str> = neighbors.iter().map(|s| s.name.as_str()).collect();
            println!("Neighboring states kept: {:?}", kept);
        }
    }

    Ok(())
}

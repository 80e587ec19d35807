use clap::{Parser, Subcommand};
use oosc_concentration_map::{clustering, config, data, export, render, server, stats};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute concentration circles and write the configured exports
    Cluster {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Render the concentration circle tile pyramid
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve circles, stats and tiles over HTTP
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Cluster { config } => {
            println!("Clustering with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let entries = data::load_entries(&app_config)?;
            let outcome = clustering::concentration_map(&entries, &app_config.map);
            println!(
                "Computed {} concentration circles, viewport center {:?} zoom {}",
                outcome.circles.len(),
                outcome.viewport.center,
                outcome.viewport.zoom
            );

            if let Some(path) = &app_config.output.geojson {
                export::write_circles_geojson(path, &outcome.circles)?;
            }
            if let Some(path) = &app_config.output.circles_csv {
                export::write_circles_csv(path, &outcome.circles)?;
            }
            if let Some(path) = &app_config.output.stats_csv {
                let summary = stats::summarize(&entries);
                export::write_stats_csv(path, &summary)?;
            }

            println!("Clustering complete!");
        }
        Commands::Render { config } => {
            println!("Rendering with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let entries = data::load_entries(&app_config)?;
            let outcome = clustering::concentration_map(&entries, &app_config.map);

            render::generate_tiles(&app_config, &outcome.circles)?;

            println!("Rendering complete!");
        }
        Commands::Serve { config } => {
            println!("Serving with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let entries = data::load_entries(&app_config)?;
            server::start_server(app_config, entries).await?;
        }
    }

    Ok(())
}

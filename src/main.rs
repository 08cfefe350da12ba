use clap::{Parser, Subcommand};
use pypi_pulse::config::{ServeSettings, Settings};
use pypi_pulse::package::types::ResolveOptions;
use pypi_pulse::server::serve::{build_resolver, run_server};

#[derive(Debug, Parser)]
#[command(name = "pypi-pulse", version, about)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTML pages and the JSON API
    Serve(ServeSettings),
    /// Print the release statistics of one package
    Lookup {
        name: String,
        /// Ignore the local cache
        #[arg(long)]
        force_refresh: bool,
        /// Print the last release timestamp instead of a relative date
        #[arg(long)]
        raw: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = pypi_pulse::log::init()?;

    match cli.command {
        Command::Serve(serve) => run_server(cli.settings, serve).await,
        Command::Lookup {
            name,
            force_refresh,
            raw,
        } => {
            let resolver = build_resolver(&cli.settings)?;
            let info = resolver
                .package_info(
                    &name,
                    ResolveOptions {
                        force_refresh,
                        human_readable: !raw,
                    },
                )
                .await?;

            println!("{name}");
            println!("  Last release:      {}", info.last_release);
            println!("  Versions released: {}", info.n_versions);
            println!("  Versions yanked:   {}", info.n_versions_yanked);
            Ok(())
        }
    }
}

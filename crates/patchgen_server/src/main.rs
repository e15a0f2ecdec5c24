use std::io::Write;

use anyhow::Context;
use clap::Parser;
use patchgen_core::GenerateRequest;
use patchgen_server::{Cli, Commands, init_tracing, load_engine, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = cli.server_config();

    match cli.command {
        None | Some(Commands::Serve) => run_server(config).await,
        Some(Commands::Generate {
            style,
            complexity,
            seed,
            output,
        }) => {
            let engine = load_engine(&config)?;
            let mut request = GenerateRequest::new(style, complexity);
            request.seed = seed;

            let generated = engine.generate_file(&request)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &generated.bytes)
                        .with_context(|| format!("Failed to write patch to {}", path.display()))?;
                    tracing::info!(
                        "Wrote {} modules to {}",
                        generated.patch.modules.len(),
                        path.display()
                    );
                }
                None => std::io::stdout().write_all(&generated.bytes)?,
            }
            Ok(())
        }
    }
}

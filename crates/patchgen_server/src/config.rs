use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_PORT: u16 = 7812;
pub const DEFAULT_CATALOG: &str = "config/catalog.json";

/// Generate VCV Rack patches over HTTP
#[derive(Parser, Debug)]
#[command(name = "patchgen-server")]
#[command(about = "HTTP server that generates VCV Rack patch files")]
#[command(version)]
pub struct Cli {
    /// Module catalog (JSON object: plugin -> [model, ...])
    #[arg(long, env = "PATCHGEN_CATALOG", default_value = DEFAULT_CATALOG, global = true)]
    pub catalog: PathBuf,

    /// Style/complexity selection tables (built-in defaults when omitted)
    #[arg(long, env = "PATCHGEN_TABLES", global = true)]
    pub tables: Option<PathBuf>,

    #[arg(short, long, env = "PATCHGEN_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory generated patches are written to (default: system temp dir)
    #[arg(long, env = "PATCHGEN_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Base URL used when building file links (default: http://localhost:<port>)
    #[arg(long, env = "PATCHGEN_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Append a random suffix to every generated file name
    #[arg(long, env = "PATCHGEN_UNIQUE_FILENAMES")]
    pub unique_filenames: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Generate one patch and write it to stdout or a file
    Generate {
        #[arg(long)]
        style: String,

        #[arg(long)]
        complexity: String,

        #[arg(long)]
        seed: Option<u64>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub catalog_path: PathBuf,
    pub tables_path: Option<PathBuf>,
    pub storage_dir: PathBuf,
    pub public_url: String,
    pub unique_filenames: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            catalog_path: PathBuf::from(DEFAULT_CATALOG),
            tables_path: None,
            storage_dir: std::env::temp_dir(),
            public_url: local_url(DEFAULT_PORT),
            unique_filenames: false,
        }
    }
}

fn local_url(port: u16) -> String {
    format!("http://localhost:{}", port)
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        let public_url = self
            .public_url
            .clone()
            .unwrap_or_else(|| local_url(self.port));
        ServerConfig {
            port: self.port,
            catalog_path: self.catalog.clone(),
            tables_path: self.tables.clone(),
            storage_dir: self
                .storage_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            public_url: public_url.trim_end_matches('/').to_string(),
            unique_filenames: self.unique_filenames,
        }
    }
}

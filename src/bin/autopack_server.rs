//! AutoPack API server binary

use clap::Parser;
use std::time::Duration;

use autopack::api::{run_api_server, ApiConfig};

#[derive(Parser, Debug)]
#[command(name = "autopack-server")]
#[command(version)]
#[command(about = "AutoPack API server - HTTP access to the packing-list pipeline")]
#[command(long_about = r#"
AutoPack API server

Endpoints (JSON bodies name files on the server):
  - POST /api/v1/convert        - Allocation table to packing list
  - POST /api/v1/delivery-slip  - Packing list to delivery slip
  - POST /api/v1/assortment     - Packing list to assortment detail
  - POST /api/v1/labels         - Packing list to box labels

Additional endpoints:
  - GET  /health                - Health check
  - GET  /version               - Server version

Each request runs on its own worker under --job-timeout-secs; a job that
runs longer is abandoned and reported as an error.

Example usage:
  autopack-server --host 0.0.0.0 --port 3000

  curl -X POST http://localhost:8080/api/v1/convert \
    -H "Content-Type: application/json" \
    -d '{"input_path": "/data/配分表(12345).xlsx", "jan_table_path": "/data/jan.csv"}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "AUTOPACK_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "AUTOPACK_PORT")]
    port: u16,

    /// Seconds a single job may run before it is abandoned
    #[arg(long, default_value = "120", env = "AUTOPACK_JOB_TIMEOUT_SECS")]
    job_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        job_timeout: Duration::from_secs(args.job_timeout_secs),
    };

    run_api_server(config).await
}

//! xlfill API server binary
//!
//! Serves the template catalogue and report generation over HTTP.

use clap::Parser;
use xlfill::api::run_api_server;
use xlfill::cli::ServerArgs;

#[derive(Parser, Debug)]
#[command(name = "xlfill-server")]
#[command(version)]
#[command(about = "xlfill API Server - fill Excel templates over HTTP")]
#[command(long_about = r#"
xlfill API Server

Endpoints:
  - GET  /api/templates          - Template catalogue
  - GET  /api/templates/:name    - One template with sample data
  - POST /api/reports            - {"template_name", "data", "text_fields"} -> .xlsx
  - POST /api/reports/:name      - data object -> .xlsx
  - POST /api/table-reports      - {"rows", "sheet_name"} -> .xlsx

Additional endpoints:
  - GET  /api/health             - Health check
  - GET  /version                - Server version info
  - GET  /                       - Endpoint list

Settings are read from defaults, then --config (or XLFILL_CONFIG), then
these flags. Every flag can also be set through its XLFILL_* variable
(XLFILL_PORT, XLFILL_DEBUG, XLFILL_CORS_ORIGINS, ...).

Example usage:
  xlfill-server                                  # localhost:8000, ./templates
  xlfill-server --host 0.0.0.0 --port 3000 --templates-dir /srv/templates

  curl -X POST http://localhost:8000/api/reports/invoice \
    -H "Content-Type: application/json" \
    -d '{"client": "Acme", "items": [{"sku": "A1", "qty": 2}]}' -o invoice.xlsx
"#)]
struct Args {
    #[command(flatten)]
    server: ServerArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = args.server.settings()?;
    run_api_server(settings).await
}

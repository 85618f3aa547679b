use std::path::PathBuf;

use clap::{Parser, Subcommand};
use xlfill::api::init_tracing;
use xlfill::cli::{self, ServerArgs};

#[derive(Parser)]
#[command(name = "xlfill")]
#[command(about = "Fill Excel templates with JSON data, keeping every style intact.")]
#[command(long_about = "xlfill - Excel template fill engine

Templates are ordinary .xlsx files with {{placeholders}} in their cells.
Scalar fields are replaced in place; rows between {{#items}} and {{/items}}
are repeated once per list element. Styles, merges, formulas, tables and
conditional formatting move with the rows.

COMMANDS:
  fill       - Fill a template with a JSON data file
  templates  - List the template catalogue
  inspect    - Show a template's fields, row groups and sample data
  table      - Build a formatted table report from JSON rows
  serve      - Start the HTTP API server

EXAMPLES:
  xlfill fill invoice --data invoice.json --output out.xlsx
  xlfill fill ./budget.xlsx -d data.json -o report.xlsx --text-field code
  xlfill inspect invoice --json > sample.json
  xlfill serve --port 8000 --templates-dir ./templates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Fill a template with a JSON data file.

The template is a path to an .xlsx file, or a name looked up in the
templates directory (the .xlsx extension is optional).

The data file must hold one JSON object. Nested values are reached with
dot paths ({{client.name}}, {{items.0.sku}}). Missing fields are written
as empty text and reported as warnings.")]
    /// Fill a template with JSON data
    Fill {
        /// Template name or path to an .xlsx file
        template: String,

        /// JSON data file
        #[arg(short, long)]
        data: PathBuf,

        /// Where to write the filled workbook
        #[arg(short, long)]
        output: PathBuf,

        /// Directory searched for template names
        #[arg(short, long, default_value = "./templates", env = "XLFILL_TEMPLATES_DIR")]
        templates_dir: PathBuf,

        /// Field always written as text (repeatable)
        #[arg(long = "text-field")]
        text_fields: Vec<String>,

        /// Show progress
        #[arg(short, long)]
        verbose: bool,
    },

    /// List available templates
    Templates {
        /// Directory holding the templates
        #[arg(short, long, default_value = "./templates", env = "XLFILL_TEMPLATES_DIR")]
        templates_dir: PathBuf,

        /// Also show sheets, fields and row groups
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show a template's fields, row groups and a sample payload
    Inspect {
        /// Template name or path to an .xlsx file
        template: String,

        /// Directory searched for template names
        #[arg(short, long, default_value = "./templates", env = "XLFILL_TEMPLATES_DIR")]
        templates_dir: PathBuf,

        /// Print the template description as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a formatted table report from a JSON array of objects
    Table {
        /// JSON file holding an array of row objects
        rows: PathBuf,

        /// Where to write the report
        output: PathBuf,

        /// Worksheet name
        #[arg(short, long)]
        sheet_name: Option<String>,
    },

    /// Start the HTTP API server
    Serve {
        #[command(flatten)]
        server: ServerArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Serve { .. }) {
        init_tracing("xlfill=warn");
    }

    match cli.command {
        Commands::Fill {
            template,
            data,
            output,
            templates_dir,
            text_fields,
            verbose,
        } => cli::fill(template, data, output, templates_dir, text_fields, verbose)?,
        Commands::Templates {
            templates_dir,
            verbose,
        } => cli::templates(templates_dir, verbose)?,
        Commands::Inspect {
            template,
            templates_dir,
            json,
        } => cli::inspect_template(template, templates_dir, json)?,
        Commands::Table {
            rows,
            output,
            sheet_name,
        } => cli::table(rows, output, sheet_name)?,
        Commands::Serve { server } => cli::serve(server)?,
    }
    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use serde_json::Value;

use super::args::ServerArgs;
use crate::core::{FillOptions, FillWarning, GeneratedReport, TemplateEngine};
use crate::error::{XlFillError, XlFillResult};
use crate::excel::{inspect, TableReport, TemplateInfo};
use crate::templates::TemplateStore;

/// Human-readable byte count
fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let size = bytes as f64;
    if size < KB {
        format!("{} B", bytes)
    } else if size < KB * KB {
        format!("{:.1} KB", size / KB)
    } else {
        format!("{:.1} MB", size / (KB * KB))
    }
}

fn read_json(path: &Path) -> XlFillResult<Value> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// A template given as an existing file is served from its own directory;
/// anything else is looked up in `templates_dir`
fn locate_template(template: &str, templates_dir: &Path) -> (TemplateStore, String) {
    let path = Path::new(template);
    if path.is_file() {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            return (TemplateStore::new(dir), name.to_string());
        }
    }
    (TemplateStore::new(templates_dir), template.to_string())
}

fn print_warnings(warnings: &[FillWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!(
        "{}",
        format!("⚠️  {} warning(s):", warnings.len()).yellow().bold()
    );
    for warning in warnings {
        println!("   {}", warning.to_string().yellow());
    }
    println!();
}

/// Execute the fill command
pub fn fill(
    template: String,
    data: PathBuf,
    output: PathBuf,
    templates_dir: PathBuf,
    text_fields: Vec<String>,
    verbose: bool,
) -> XlFillResult<()> {
    println!("{}", "📊 xlfill - Filling template".bold().green());
    println!("   Template: {}", template.bright_blue().bold());
    println!("   Data:     {}", data.display());
    println!("   Output:   {}\n", output.display());

    if verbose {
        println!("{}", "📖 Reading data file...".cyan());
    }
    let payload = read_json(&data)?;
    if !payload.is_object() {
        return Err(XlFillError::Validation(format!(
            "{} must contain a JSON object",
            data.display()
        )));
    }

    let (store, name) = locate_template(&template, &templates_dir);
    if verbose {
        println!("   Templates directory: {}\n", store.root().display());
        println!("{}", "🧮 Filling placeholders and row groups...".cyan());
    }

    let engine = TemplateEngine::new(store);
    let options = FillOptions::with_text_fields(text_fields);
    let report: GeneratedReport = engine.generate(&name, &payload, &options)?;

    fs::write(&output, &report.bytes)?;

    print_warnings(&report.warnings);
    println!("{}", "✅ Report generated!".bold().green());
    println!(
        "   {} ({})\n",
        output.display(),
        format_size(report.bytes.len() as u64)
    );
    Ok(())
}

/// Execute the templates command
pub fn templates(templates_dir: PathBuf, verbose: bool) -> XlFillResult<()> {
    println!("{}", "📚 xlfill - Templates".bold().green());
    println!("   Directory: {}\n", templates_dir.display());

    let store = TemplateStore::new(&templates_dir);
    let list = store.list()?;
    if list.is_empty() {
        println!("{}", "   No templates found".yellow());
        return Ok(());
    }

    for template in &list {
        println!(
            "   📄 {} ({}, modified {})",
            template.name.bright_blue().bold(),
            format_size(template.size_bytes),
            template.last_modified.format("%Y-%m-%d %H:%M")
        );
        if verbose {
            let info = inspect(template);
            print_layout(&info, "      ");
        }
    }
    println!("\n   {} template(s)\n", list.len());
    Ok(())
}

fn print_layout(info: &TemplateInfo, indent: &str) {
    if !info.sheets.is_empty() {
        println!("{}Sheets: {}", indent, info.sheets.join(", "));
    }
    if !info.tables.is_empty() {
        println!("{}Tables: {}", indent, info.tables.join(", "));
    }
    if !info.placeholders.is_empty() {
        println!("{}Fields: {}", indent, info.placeholders.join(", ").cyan());
    }
    for group in &info.row_groups {
        println!(
            "{}Row group {} ({}!{}:{}): {}",
            indent,
            group.name.bright_yellow(),
            group.sheet,
            group.first_row,
            group.last_row,
            group.fields.join(", ")
        );
    }
}

/// Execute the inspect command
pub fn inspect_template(template: String, templates_dir: PathBuf, json: bool) -> XlFillResult<()> {
    let (store, name) = locate_template(&template, &templates_dir);
    let info = inspect(&store.resolve(&name)?);

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", "🔍 xlfill - Template".bold().green());
    println!("   {} ({})", info.display_name.bright_blue().bold(), info.filename);
    println!("   {}\n", info.description);
    print_layout(&info, "   ");
    if !info.columns.is_empty() {
        println!("   Columns: {}", info.columns.join(", "));
    }

    println!("\n{}", "📋 Sample data:".bold().cyan());
    println!("{}\n", serde_json::to_string_pretty(&info.sample_data)?);
    Ok(())
}

/// Execute the table command
pub fn table(rows: PathBuf, output: PathBuf, sheet_name: Option<String>) -> XlFillResult<()> {
    println!("{}", "📊 xlfill - Table report".bold().green());
    println!("   Rows:   {}", rows.display());
    println!("   Output: {}\n", output.display());

    let payload = read_json(&rows)?;
    let Value::Array(items) = payload else {
        return Err(XlFillError::Validation(format!(
            "{} must contain a JSON array of objects",
            rows.display()
        )));
    };

    let mut report = TableReport::from_rows(&items)?;
    if let Some(name) = sheet_name {
        report = report.with_sheet_name(name);
    }
    let bytes = report.to_bytes()?;
    fs::write(&output, &bytes)?;

    println!("{}", "✅ Table report generated!".bold().green());
    println!(
        "   {} rows x {} columns → {} ({})\n",
        report.row_count(),
        report.headers().len(),
        output.display(),
        format_size(bytes.len() as u64)
    );
    Ok(())
}

/// Execute the serve command
pub fn serve(args: ServerArgs) -> anyhow::Result<()> {
    let settings = args.settings()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(crate::api::run_api_server(settings))
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;

use crate::config::Layout;
use crate::error::{PackError, PackResult};
use crate::pipeline::{
    self, BatchOutcome, ConversionJob, ConversionReport, DocumentJob, DocumentReport,
};
use crate::types::{LogLevel, RunLog};
use crate::writer::SlipNumbering;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Options of the convert command
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub jan_table: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub store_detail: bool,
    pub store_detail_template: Option<PathBuf>,
    pub layout: Option<PathBuf>,
    pub overwrite: bool,
    pub verbose: bool,
}

/// Options shared by the slip, assortment and label commands
#[derive(Debug, Clone)]
pub struct DocumentOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub template: Option<PathBuf>,
    pub layout: Option<PathBuf>,
    pub verbose: bool,
}

impl DocumentOptions {
    fn job(&self) -> PackResult<DocumentJob> {
        Ok(DocumentJob {
            input: self.input.clone(),
            output: self.output.clone(),
            template: self.template.clone(),
            layout: load_layout(self.layout.as_deref())?,
        })
    }
}

fn load_layout(path: Option<&Path>) -> PackResult<Layout> {
    match path {
        Some(path) => Layout::load(path),
        None => Ok(Layout::default()),
    }
}

/// Warnings always; info and debug entries only when verbose
fn print_log(log: &RunLog, verbose: bool) {
    for entry in log.entries() {
        match entry.level {
            LogLevel::Warn => println!("   {} {}", "⚠️".yellow(), entry.to_string().yellow()),
            LogLevel::Info if verbose => println!("   {}", entry.to_string().cyan()),
            LogLevel::Debug if verbose => println!("   {}", entry.to_string().dimmed()),
            _ => {}
        }
    }
}

fn print_conversion(report: &ConversionReport, verbose: bool) {
    let stats = &report.stats;
    println!("   SKUs:     {}", stats.sku_count.to_string().bold());
    println!("   Patterns: {}", stats.pattern_count.to_string().bold());
    println!("   Boxes:    {}", stats.box_count.to_string().bold());
    println!("   Quantity: {} pcs", stats.total_qty.to_string().bold());
    println!(
        "   JAN:      {} matched, {} missing (table size {})",
        stats.jan_matched.to_string().green(),
        stats.jan_failed.to_string().red(),
        stats.jan_map_size
    );
    if verbose || report.log.has_warnings() {
        println!();
        print_log(&report.log, verbose);
    }
    println!();
    for output in &report.outputs {
        println!("   📄 {}", output.display().to_string().bright_blue());
    }
}

/// Execute the convert command. A directory input converts every workbook
/// inside it.
pub fn convert(input: PathBuf, options: ConvertOptions) -> PackResult<()> {
    println!("{}", "📦 AutoPack - Converting allocation table".bold().green());
    println!("   Input: {}", input.display());
    if let Some(ref jan) = options.jan_table {
        println!("   JAN:   {}", jan.display());
    }
    println!();

    let base = ConversionJob {
        input: input.clone(),
        jan_table: options.jan_table.clone(),
        template: options.template.clone(),
        output_dir: options.output_dir.clone(),
        output: options.output.clone(),
        store_detail: options.store_detail,
        store_detail_template: options.store_detail_template.clone(),
        layout: load_layout(options.layout.as_deref())?,
    };

    if input.is_dir() {
        return convert_batch(&input, &base, &options);
    }

    let report = pipeline::run_conversion(&base)?;
    print_conversion(&report, options.verbose);
    println!();
    println!("{}", "✅ Conversion complete".bold().green());
    Ok(())
}

fn convert_batch(dir: &Path, base: &ConversionJob, options: &ConvertOptions) -> PackResult<()> {
    let entries = pipeline::run_batch(dir, base, options.overwrite)?;
    if entries.is_empty() {
        println!("{}", "⚠️  No Excel files found".yellow());
        return Ok(());
    }

    let (mut converted, mut skipped, mut failed) = (0, 0, 0);
    for entry in &entries {
        let name = entry
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &entry.outcome {
            BatchOutcome::Converted { report } => {
                converted += 1;
                println!("{} {}", "✅".green(), name.bold());
                print_conversion(report, options.verbose);
            }
            BatchOutcome::Skipped { output } => {
                skipped += 1;
                println!("{} {} (output exists: {})", "⏭️".yellow(), name, output.display());
            }
            BatchOutcome::Failed { error } => {
                failed += 1;
                println!("{} {}", "❌".red(), name.bold());
                println!("   {}", error.red());
            }
        }
        println!();
    }

    let summary = format!(
        "Batch complete: {} converted, {} failed, {} skipped",
        converted, failed, skipped
    );
    if failed == 0 {
        println!("{}", summary.bold().green());
        Ok(())
    } else {
        println!("{}", summary.bold().yellow());
        Err(PackError::Validation(format!("{} of {} files failed", failed, entries.len())))
    }
}

fn print_document(title: &str, report: &DocumentReport, verbose: bool) {
    println!("   Boxes: {}", report.boxes.to_string().bold());
    println!("   Rows:  {}", report.rows.to_string().bold());
    print_log(&report.log, verbose);
    println!();
    println!("{}", format!("✅ {} written", title).bold().green());
    println!("   📄 {}", report.output.display().to_string().bright_blue());
}

/// Execute the delivery-slip command
pub fn delivery_slip(
    options: DocumentOptions,
    start: Option<u32>,
    week: Option<String>,
    by_week: bool,
) -> PackResult<()> {
    println!("{}", "📦 AutoPack - Delivery slip".bold().green());
    println!("   Packing list: {}\n", options.input.display());

    let job = options.job()?;
    let numbering = if by_week || week.is_some() {
        SlipNumbering::week(week.as_deref())
    } else {
        SlipNumbering::Offset {
            prefix: job.layout.delivery_slip.slip_prefix.clone(),
            start,
        }
    };
    if options.verbose {
        println!("{}", format!("🔢 Numbering: {:?}", numbering).cyan());
    }

    let report = pipeline::run_delivery_slip(&job, numbering)?;
    print_document("Delivery slip", &report, options.verbose);
    Ok(())
}

/// Execute the assortment command
pub fn assortment(options: DocumentOptions, week: Option<String>) -> PackResult<()> {
    println!("{}", "📦 AutoPack - Assortment detail".bold().green());
    println!("   Packing list: {}\n", options.input.display());

    let report = pipeline::run_assortment(&options.job()?, week)?;
    print_document("Assortment detail", &report, options.verbose);
    Ok(())
}

/// Execute the labels command
pub fn labels(options: DocumentOptions) -> PackResult<()> {
    println!("{}", "🏷️  AutoPack - Box labels".bold().green());
    println!("   Packing list: {}\n", options.input.display());

    let report = pipeline::run_labels(&options.job()?)?;
    let stats = &report.stats;
    println!("   Boxes:    {}", stats.box_count.to_string().bold());
    println!("   Stores:   {}", stats.store_count.to_string().bold());
    println!("   Patterns: {}", stats.pt_count.to_string().bold());
    println!("   SKUs:     {}", stats.sku_count.to_string().bold());
    println!("   Quantity: {} pcs", stats.total_qty.to_string().bold());
    print_log(&report.log, options.verbose);
    println!();

    match report.output {
        Some(ref path) => {
            println!("{}", "✅ Labels written".bold().green());
            println!("   📄 {}", path.display().to_string().bright_blue());
        }
        None => println!("{}", "⚠️  No boxes found, nothing written".yellow()),
    }
    Ok(())
}

/// Execute the layout command: print or save the default layout as YAML
pub fn layout(output: Option<PathBuf>) -> PackResult<()> {
    let yaml = Layout::default().to_yaml()?;
    match output {
        Some(path) => {
            fs::write(&path, yaml)?;
            println!("{}", "✅ Layout written".bold().green());
            println!("   📄 {}", path.display());
        }
        None => print!("{}", yaml),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_layout_defaults_without_path() {
        assert_eq!(load_layout(None).unwrap(), Layout::default());
    }

    #[test]
    fn test_layout_command_writes_loadable_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.yaml");
        layout(Some(path.clone())).unwrap();
        assert_eq!(load_layout(Some(&path)).unwrap(), Layout::default());
    }

    #[test]
    fn test_convert_missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = convert(dir.path().join("nope(1).xlsx"), ConvertOptions::default());
        assert!(matches!(result, Err(PackError::Stage { .. })));
    }

    #[test]
    fn test_convert_empty_directory_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(convert(dir.path().to_path_buf(), ConvertOptions::default()).is_ok());
    }
}

use autopack::cli::{self, ConvertOptions, DocumentOptions};
use autopack::error::PackResult;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "autopack")]
#[command(about = "Allocation table → packing list, slips and box labels")]
#[command(long_about = "AutoPack - allocation table to packing list converter

Stores that need exactly the same SKU quantities share one pack pattern.
Every store gets a box number; the factory fills in cartons and the
returned packing list drives the slips and labels.

COMMANDS:
  convert        - Allocation table (配分表) to packing list (箱設定)
  delivery-slip  - Packing list to delivery slip (受渡伝票)
  assortment     - Packing list to assortment detail (アソート明細)
  labels         - Packing list to box labels, 4 per A4 page
  layout         - Print the default cell layout as YAML

EXAMPLES:
  autopack convert 配分表(12345).xlsx --jan jan.csv --store-detail
  autopack convert ./allocations/ --output-dir ./out
  autopack delivery-slip packing.xlsx -o slip.xlsx --start 120
  autopack assortment packing.xlsx -o assort.xlsx --week 18
  autopack labels packing.xlsx -o labels.xlsx
  autopack layout -o layout.yaml             # edit, then pass --layout")]
#[command(version)]
struct Cli {
    /// Show debug logging and every run-log entry
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DocumentArgs {
    /// Packing list with carton numbers filled in
    input: PathBuf,

    /// Output workbook
    #[arg(short, long)]
    output: PathBuf,

    /// Template whose top rows are copied into the output (.xlsx, or .xls with an .xlsx sibling)
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Layout YAML overriding the default cell positions
    #[arg(long)]
    layout: Option<PathBuf>,
}

impl DocumentArgs {
    fn into_options(self, verbose: bool) -> DocumentOptions {
        DocumentOptions {
            input: self.input,
            output: self.output,
            template: self.template,
            layout: self.layout,
            verbose,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Convert an allocation table into a packing list.

Every product sheet is read, SKUs are sorted by product/color/size, JAN
codes are looked up (exact, then without leading zeros on color/size),
stores with identical quantity vectors are grouped into patterns PT-1,
PT-2, ... and numbered 1..N.

The output is named 【箱設定 上海】{id} 振分.xlsx where {id} is the
number in parentheses in the input name (or a timestamp).

BATCH:
  Pass a directory to convert every .xls/.xlsx inside it. Existing
  outputs are skipped unless --overwrite is given.")]
    /// Convert an allocation table into a packing list
    Convert {
        /// Allocation workbook (.xlsx/.xls) or a directory of them
        input: PathBuf,

        /// JAN table (.xlsx, .xls, .csv, .tsv, .txt)
        #[arg(short, long = "jan")]
        jan_table: Option<PathBuf>,

        /// Packing-list template (商品一覧 / PT-1 sheets)
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Packing-list path (single file only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for generated files (default: next to the input)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Also write the per-store detail workbook
        #[arg(long)]
        store_detail: bool,

        /// Template for the per-store detail sheets
        #[arg(long)]
        store_detail_template: Option<PathBuf>,

        /// Layout YAML overriding the default cell positions
        #[arg(long)]
        layout: Option<PathBuf>,

        /// Replace existing outputs in batch mode
        #[arg(long)]
        overwrite: bool,
    },

    #[command(long_about = "Write the delivery slip for a returned packing list.

Slip numbers default to 81 + carton (4 digits). --start N offsets them so
carton 1 becomes 81{N:04}. --week W (or --by-week, which takes the ISO
week of the store date) switches to {W}W81{carton:04}.")]
    /// Packing list → delivery slip
    DeliverySlip {
        #[command(flatten)]
        doc: DocumentArgs,

        /// First slip number (carton 1 maps to it)
        #[arg(long, conflicts_with_all = ["week", "by_week"])]
        start: Option<u32>,

        /// Week prefix for week numbering
        #[arg(long)]
        week: Option<String>,

        /// Week numbering from the store date
        #[arg(long)]
        by_week: bool,
    },

    /// Packing list → assortment detail
    Assortment {
        #[command(flatten)]
        doc: DocumentArgs,

        /// Week prefix (default: ISO week of the store date)
        #[arg(long)]
        week: Option<String>,
    },

    /// Packing list → box labels
    Labels {
        #[command(flatten)]
        doc: DocumentArgs,
    },

    /// Print (or save) the default layout as YAML
    Layout {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "autopack=debug" } else { "autopack=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> PackResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let verbose = cli.verbose;

    match cli.command {
        Commands::Convert {
            input,
            jan_table,
            template,
            output,
            output_dir,
            store_detail,
            store_detail_template,
            layout,
            overwrite,
        } => cli::convert(
            input,
            ConvertOptions {
                jan_table,
                template,
                output,
                output_dir,
                store_detail,
                store_detail_template,
                layout,
                overwrite,
                verbose,
            },
        ),

        Commands::DeliverySlip {
            doc,
            start,
            week,
            by_week,
        } => cli::delivery_slip(doc.into_options(verbose), start, week, by_week),

        Commands::Assortment { doc, week } => cli::assortment(doc.into_options(verbose), week),

        Commands::Labels { doc } => cli::labels(doc.into_options(verbose)),

        Commands::Layout { output } => cli::layout(output),
    }
}

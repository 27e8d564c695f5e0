//! Run orchestration
//!
//! Every run owns its own [`RunLog`] and reader/transformer/writer values.
//! Nothing is shared between runs, so the server can execute several at
//! once.

use crate::config::Layout;
use crate::error::{PackError, PackResult};
use crate::reader::{AllocationReader, JanMap, JanTableReader, PackingListReader};
use crate::sheet::extension_of;
use crate::transform::{TransformOutput, Transformer};
use crate::types::{BoxRecord, RunLog};
use crate::writer::labels::render_labels;
use crate::writer::{
    AssortmentWriter, DeliverySlipWriter, LabelStats, PackingListWriter, SlipNumbering, StoreDetailWriter,
    XlsxLabelRenderer,
};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const STAGE: &str = "pipeline";

/// Inputs of one allocation → packing-list conversion
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub jan_table: Option<PathBuf>,
    pub template: Option<PathBuf>,
    /// Directory for generated files; defaults to the input's directory
    pub output_dir: Option<PathBuf>,
    /// Explicit packing-list path, overriding the generated name
    pub output: Option<PathBuf>,
    pub store_detail: bool,
    pub store_detail_template: Option<PathBuf>,
    pub layout: Layout,
}

impl ConversionJob {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            jan_table: None,
            template: None,
            output_dir: None,
            output: None,
            store_detail: false,
            store_detail_template: None,
            layout: Layout::default(),
        }
    }

    fn output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => self
                .input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }

    /// Packing-list path this job writes to.
    pub fn packing_list_path(&self) -> PackResult<PathBuf> {
        match &self.output {
            Some(path) => Ok(path.clone()),
            None => Ok(self.output_dir().join(packing_list_name(&self.input)?)),
        }
    }

    pub fn store_detail_path(&self) -> PathBuf {
        let stem = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.output_dir().join(format!("StoreDetail_{}.xlsx", stem))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub sku_count: usize,
    pub pattern_count: usize,
    pub store_count: usize,
    pub box_count: usize,
    pub total_qty: i64,
    pub jan_map_size: usize,
    pub jan_matched: usize,
    pub jan_failed: usize,
}

impl RunStats {
    pub fn from_output(output: &TransformOutput) -> Self {
        Self {
            sku_count: output.skus.len(),
            pattern_count: output.groups.len(),
            store_count: output.store_count(),
            box_count: output.store_count(),
            total_qty: output.total_store_qty(),
            jan_map_size: output.jan_stats.map_size,
            jan_matched: output.jan_stats.matched,
            jan_failed: output.jan_stats.failed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub outputs: Vec<PathBuf>,
    pub stats: RunStats,
    pub log: RunLog,
}

/// Identifier used in generated file names: the first parenthesised token
/// of the input name, else the current timestamp.
pub fn output_id(input: &Path) -> PackResult<String> {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let pattern = Regex::new(r"[(（](\w+)[)）]")
        .map_err(|e| PackError::Validation(format!("Regex error: {}", e)))?;
    let numeric = Regex::new(r"[(（](\d+)[)）]")
        .map_err(|e| PackError::Validation(format!("Regex error: {}", e)))?;

    // Digits-only ids take precedence over alphanumeric ones
    for re in [&numeric, &pattern] {
        if let Some(id) = re.captures(&name).and_then(|c| c.get(1)) {
            return Ok(id.as_str().to_string());
        }
    }
    Ok(chrono::Local::now().format("%Y%m%d_%H%M%S").to_string())
}

pub fn packing_list_name(input: &Path) -> PackResult<String> {
    Ok(format!("【箱設定 上海】{} 振分.xlsx", output_id(input)?))
}

/// Σ store totals must equal Σ SKU global totals, and every group's stores
/// must carry the group total.
pub fn check_invariants(output: &TransformOutput) -> PackResult<()> {
    let stores = output.total_store_qty();
    let skus = output.sku_grand_total();
    if stores != skus {
        return Err(PackError::Validation(format!(
            "Store totals ({}) do not match SKU totals ({})",
            stores, skus
        )));
    }
    for group in &output.groups {
        let total: i64 = group.pattern_vector.iter().sum();
        if let Some(store) = group.stores.iter().find(|s| s.total_qty != total || group.total_qty != total) {
            return Err(PackError::Validation(format!(
                "{}: store {} holds {} pcs, pattern holds {}",
                group.name, store.store.store_code, store.total_qty, total
            )));
        }
    }
    Ok(())
}

/// Read, transform and check, without writing anything.
pub fn transform_file(job: &ConversionJob, log: &mut RunLog) -> PackResult<TransformOutput> {
    let layout = &job.layout;
    let data = AllocationReader::new(&layout.allocation)
        .read(&job.input, log)
        .map_err(|e| e.at_stage("allocation read", &job.input))?;

    let jan_map = match &job.jan_table {
        Some(path) => JanTableReader::new(&layout.jan_table)
            .read(path, log)
            .map_err(|e| e.at_stage("JAN table read", path))?,
        None => {
            log.warn(STAGE, "No JAN table given; JAN columns stay empty");
            JanMap::new()
        }
    };

    let output = Transformer::new(&data, &jan_map, &layout.policy).transform();
    check_invariants(&output).map_err(|e| e.at_stage("transform", &job.input))?;
    Ok(output)
}

pub fn run_conversion(job: &ConversionJob) -> PackResult<ConversionReport> {
    let mut log = RunLog::new();
    let mut output = transform_file(job, &mut log)?;
    log.extend(std::mem::take(&mut output.log));

    let mut outputs = Vec::new();
    let path = job.packing_list_path()?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| PackError::from(e).at_stage("packing list write", &path))?;
    }
    let template = job.template.as_deref();
    PackingListWriter::new(&job.layout.packing_list)
        .with_template(template)
        .and_then(|w| w.write(&output, &path))
        .map_err(|e| e.at_stage("packing list write", &path))?;
    log.info(STAGE, format!("Packing list: {}", path.display()));
    outputs.push(path);

    if job.store_detail {
        let path = job.store_detail_path();
        StoreDetailWriter::new(&job.layout.store_detail)
            .with_template(job.store_detail_template.as_deref())
            .and_then(|w| w.write(&output, &path))
            .map_err(|e| e.at_stage("store detail write", &path))?;
        log.info(STAGE, format!("Store detail: {}", path.display()));
        outputs.push(path);
    }

    let stats = RunStats::from_output(&output);
    info!(
        "Converted {}: {} SKUs, {} patterns, {} boxes, {} pcs",
        job.input.display(),
        stats.sku_count,
        stats.pattern_count,
        stats.box_count,
        stats.total_qty
    );
    Ok(ConversionReport { outputs, stats, log })
}

//==============================================================================
// Batch conversion
//==============================================================================

/// What happened to one file of a batch
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Converted { report: ConversionReport },
    /// Output already existed and overwriting was off
    Skipped { output: PathBuf },
    Failed { error: String },
}

#[derive(Debug, Serialize)]
pub struct BatchEntry {
    pub input: PathBuf,
    pub outcome: BatchOutcome,
}

/// Allocation workbooks in `dir`, sorted, without Office lock files (`~$`).
pub fn batch_inputs(dir: &Path) -> PackResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| matches!(extension_of(path).as_str(), "xls" | "xlsx"))
        .filter(|path| {
            !path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with("~$"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Convert every workbook in `dir` with the settings of `base`. A failing
/// file is recorded and the batch moves on.
pub fn run_batch(dir: &Path, base: &ConversionJob, overwrite: bool) -> PackResult<Vec<BatchEntry>> {
    let inputs = batch_inputs(dir)?;
    info!("Batch: {} files in {}", inputs.len(), dir.display());

    let mut entries = Vec::with_capacity(inputs.len());
    for input in inputs {
        let job = ConversionJob {
            input: input.clone(),
            output: None,
            ..base.clone()
        };
        let outcome = match job.packing_list_path() {
            Ok(path) if path.exists() && !overwrite => BatchOutcome::Skipped { output: path },
            Ok(_) => match run_conversion(&job) {
                Ok(report) => BatchOutcome::Converted { report },
                Err(e) => {
                    warn!("{}", e);
                    BatchOutcome::Failed { error: e.to_string() }
                }
            },
            Err(e) => BatchOutcome::Failed { error: e.to_string() },
        };
        entries.push(BatchEntry { input, outcome });
    }
    Ok(entries)
}

//==============================================================================
// Documents derived from a returned packing list
//==============================================================================

/// Inputs shared by the slip, assortment and label runs
#[derive(Debug, Clone)]
pub struct DocumentJob {
    /// Packing list with cartons filled in
    pub input: PathBuf,
    pub output: PathBuf,
    pub template: Option<PathBuf>,
    pub layout: Layout,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub output: PathBuf,
    pub rows: usize,
    pub boxes: usize,
    pub log: RunLog,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelReport {
    pub output: Option<PathBuf>,
    pub stats: LabelStats,
    pub log: RunLog,
}

pub fn read_boxes(job: &DocumentJob, log: &mut RunLog) -> PackResult<Vec<BoxRecord>> {
    PackingListReader::new(&job.layout.packing_list)
        .read(&job.input, log)
        .map_err(|e| e.at_stage("packing list read", &job.input))
}

pub fn run_delivery_slip(job: &DocumentJob, numbering: SlipNumbering) -> PackResult<DocumentReport> {
    let mut log = RunLog::new();
    let boxes = read_boxes(job, &mut log)?;
    let rows = DeliverySlipWriter::new(&job.layout.delivery_slip, numbering)
        .with_template(job.template.as_deref())
        .and_then(|w| w.write(&boxes, &job.output, &mut log))
        .map_err(|e| e.at_stage("delivery slip write", &job.output))?;
    Ok(DocumentReport {
        output: job.output.clone(),
        rows,
        boxes: boxes.len(),
        log,
    })
}

pub fn run_assortment(job: &DocumentJob, week: Option<String>) -> PackResult<DocumentReport> {
    let mut log = RunLog::new();
    let boxes = read_boxes(job, &mut log)?;
    let rows = AssortmentWriter::new(&job.layout.assortment)
        .with_week(week)
        .with_template(job.template.as_deref())
        .and_then(|w| w.write(&boxes, &job.output, &mut log))
        .map_err(|e| e.at_stage("assortment write", &job.output))?;
    Ok(DocumentReport {
        output: job.output.clone(),
        rows,
        boxes: boxes.len(),
        log,
    })
}

pub fn run_labels(job: &DocumentJob) -> PackResult<LabelReport> {
    let mut log = RunLog::new();
    let boxes = read_boxes(job, &mut log)?;
    let renderer = XlsxLabelRenderer::new(job.layout.labels.clone());
    let stats = render_labels(&boxes, &job.layout.labels, &renderer, &job.output, &mut log)
        .map_err(|e| e.at_stage("label render", &job.output))?;
    let output = (stats.box_count > 0).then(|| job.output.clone());
    Ok(LabelReport { output, stats, log })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssignedStore, MergedStore, PatternGroup};

    #[test]
    fn test_output_id_from_parentheses() {
        assert_eq!(output_id(Path::new("配分表(12345).xlsx")).unwrap(), "12345");
        assert_eq!(output_id(Path::new("/in/配分表（678）.xls")).unwrap(), "678");
        assert_eq!(output_id(Path::new("配分(AB12).xlsx")).unwrap(), "AB12");
        assert_eq!(
            packing_list_name(Path::new("x(42).xlsx")).unwrap(),
            "【箱設定 上海】42 振分.xlsx"
        );
    }

    #[test]
    fn test_output_id_falls_back_to_timestamp() {
        let id = output_id(Path::new("allocation.xlsx")).unwrap();
        assert_eq!(id.len(), 15);
        assert_eq!(&id[8..9], "_");
    }

    #[test]
    fn test_job_paths() {
        let mut job = ConversionJob::new("/data/配分表(7).xlsx");
        assert_eq!(
            job.packing_list_path().unwrap(),
            PathBuf::from("/data/【箱設定 上海】7 振分.xlsx")
        );
        assert_eq!(job.store_detail_path(), PathBuf::from("/data/StoreDetail_配分表(7).xlsx"));

        job.output_dir = Some(PathBuf::from("/out"));
        assert!(job.packing_list_path().unwrap().starts_with("/out"));
        job.output = Some(PathBuf::from("/elsewhere/pl.xlsx"));
        assert_eq!(job.packing_list_path().unwrap(), PathBuf::from("/elsewhere/pl.xlsx"));
    }

    fn broken_output() -> TransformOutput {
        let store = MergedStore {
            store_code: "S01".to_string(),
            store_name: String::new(),
            store_type: String::new(),
            rank: None,
            quantities: Default::default(),
            pattern_vector: vec![2],
        };
        TransformOutput {
            metadata: Default::default(),
            skus: vec![],
            groups: vec![PatternGroup {
                name: "PT-1".to_string(),
                number: 1,
                pattern_vector: vec![2],
                stores: vec![AssignedStore {
                    store,
                    local_index: 1,
                    box_no: 1,
                    total_qty: 2,
                }],
                total_qty: 2,
            }],
            jan_stats: Default::default(),
            log: RunLog::new(),
        }
    }

    #[test]
    fn test_invariant_mismatch_is_validation_error() {
        let err = check_invariants(&broken_output()).unwrap_err();
        assert!(matches!(err, PackError::Validation(_)));
    }

    #[test]
    fn test_missing_input_is_wrapped_with_stage() {
        let dir = tempfile::tempdir().unwrap();
        let job = ConversionJob::new(dir.path().join("missing(1).xlsx"));
        let err = run_conversion(&job).unwrap_err();
        match err {
            PackError::Stage { stage, path, .. } => {
                assert_eq!(stage, "allocation read");
                assert!(path.ends_with("missing(1).xlsx"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_batch_inputs_skip_lock_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b(2).xlsx", "a(1).xls", "~$a(1).xlsx", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let names: Vec<String> = batch_inputs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a(1).xls", "b(2).xlsx"]);
    }
}

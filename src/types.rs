use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

//==============================================================================
// SKU identity
//==============================================================================

/// Full SKU key. Field order drives the derived `Ord`, so sorting a list of
/// keys orders it by (product_code, color, size) as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SkuKey {
    pub product_code: String,
    pub color: String,
    pub size: String,
}

impl SkuKey {
    pub fn new(
        product_code: impl Into<String>,
        color: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            product_code: product_code.into(),
            color: color.into(),
            size: size.into(),
        }
    }
}

impl fmt::Display for SkuKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.product_code, self.color, self.size)
    }
}

/// Color + size, with the product implied by the sheet it was read from
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShortKey {
    pub color: String,
    pub size: String,
}

impl ShortKey {
    pub fn new(color: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            size: size.into(),
        }
    }

    pub fn with_product(&self, product_code: &str) -> SkuKey {
        SkuKey::new(product_code, self.color.clone(), self.size.clone())
    }
}

/// Which step of the fallback chain produced a JAN hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JanMatchKind {
    Exact,
    ColorStripped,
    SizeStripped,
    BothStripped,
}

/// One canonical SKU after transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub key: SkuKey,
    /// Blank when no JAN was found
    pub jan_code: String,
    pub jan_match: Option<JanMatchKind>,
    /// Quantity summed over every store and product sheet
    pub total_qty: i64,
}

impl Sku {
    pub fn new(key: SkuKey) -> Self {
        Self {
            key,
            jan_code: String::new(),
            jan_match: None,
            total_qty: 0,
        }
    }
}

//==============================================================================
// Allocation table input
//==============================================================================

/// Header values found at fixed cells of an allocation sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub company: Option<String>,
    pub delivery_date: Option<String>,
    pub product_code: Option<String>,
    pub kanri_no: Option<String>,
    pub store_date: Option<String>,
}

impl Metadata {
    pub fn kanri_no(&self) -> &str {
        self.kanri_no.as_deref().unwrap_or("")
    }

    /// Brand code: the first three characters of the management number
    pub fn brand(&self) -> String {
        brand_of(self.kanri_no())
    }

    /// Store arrival date, or the delivery date when the sheet has none
    pub fn ship_date(&self) -> &str {
        self.store_date
            .as_deref()
            .or(self.delivery_date.as_deref())
            .unwrap_or("")
    }
}

pub fn brand_of(kanri_no: &str) -> String {
    kanri_no.chars().take(3).collect()
}

/// A quantity column discovered in the header rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuColumn {
    pub col: u32,
    pub key: ShortKey,
}

/// One retail destination on one product sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRow {
    pub no: String,
    pub store_type: String,
    pub store_code: String,
    pub store_name: String,
    pub rank: Option<String>,
    pub carton: Option<String>,
    pub quantities: BTreeMap<ShortKey, i64>,
}

impl StoreRow {
    pub fn total_qty(&self) -> i64 {
        self.quantities.values().sum()
    }
}

/// One product's sheet of the allocation workbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSheet {
    pub sheet_name: String,
    /// Normalised sheet name
    pub product_code: String,
    pub metadata: Metadata,
    pub sku_columns: Vec<SkuColumn>,
    pub stores: Vec<StoreRow>,
}

/// Everything read from one allocation workbook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationData {
    /// Taken from the first qualifying sheet
    pub metadata: Metadata,
    pub products: Vec<ProductSheet>,
}

//==============================================================================
// Transformation output
//==============================================================================

/// All rows of one store code merged across product sheets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedStore {
    pub store_code: String,
    pub store_name: String,
    /// First-seen type
    pub store_type: String,
    pub rank: Option<String>,
    pub quantities: BTreeMap<SkuKey, i64>,
    /// Quantities aligned to the canonical SKU order
    pub pattern_vector: Vec<i64>,
}

impl MergedStore {
    pub fn total_qty(&self) -> i64 {
        self.pattern_vector.iter().sum()
    }
}

/// A store placed in a pattern group with its global box number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignedStore {
    pub store: MergedStore,
    /// 1-based position inside the group
    pub local_index: usize,
    /// Global sequence, starting at 1 and never reset between groups
    pub box_no: u32,
    pub total_qty: i64,
}

/// Stores that need the exact same quantity vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternGroup {
    pub name: String,
    pub number: u32,
    pub pattern_vector: Vec<i64>,
    pub stores: Vec<AssignedStore>,
    /// Per-store total (`sum(pattern_vector)`), not the group aggregate
    pub total_qty: i64,
}

impl PatternGroup {
    /// `{pattern_number}{local_index:03}`
    pub fn sequence_id(&self, local_index: usize) -> String {
        format!("{}{:03}", self.number, local_index)
    }
}

//==============================================================================
// Box records (derived documents)
//==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoxItem {
    pub key: SkuKey,
    pub jan_code: String,
    pub qty: i64,
}

impl BoxItem {
    /// `{brand}-{product}-{size}-{color}`
    pub fn manufacturer_code(&self, brand: &str) -> String {
        format!(
            "{}-{}-{}-{}",
            brand, self.key.product_code, self.key.size, self.key.color
        )
    }
}

/// One physical carton
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoxRecord {
    pub pattern: String,
    pub store_code: String,
    pub store_name: String,
    pub store_type: String,
    pub rank: Option<String>,
    /// Carton label as written on the sheet (`12`, `C-012`, ...)
    pub carton: String,
    pub kanri_no: String,
    pub store_date: String,
    pub items: Vec<BoxItem>,
    /// Computed from the items; authoritative
    pub total_qty: i64,
    /// Total column as stated by the source sheet, if any
    pub stated_total: Option<i64>,
}

impl BoxRecord {
    /// Numeric carton number, accepting a `C-` prefix
    pub fn carton_no(&self) -> Option<u32> {
        let raw = self.carton.trim();
        let raw = raw.strip_prefix("C-").unwrap_or(raw);
        raw.parse().ok()
    }

    pub fn brand(&self) -> String {
        brand_of(&self.kanri_no)
    }

    /// `★E-{kanri}-{carton:05}`; non-numeric cartons are used verbatim
    pub fn box_id(&self) -> String {
        let carton = match self.carton_no() {
            Some(n) => format!("{:05}", n),
            None => self.carton.trim().trim_start_matches("C-").to_string(),
        };
        format!("★E-{}-{}", self.kanri_no, carton)
    }
}

//==============================================================================
// Run diagnostics
//==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub stage: String,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

/// Ordered diagnostics of one run, returned with its result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(&mut self, stage: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(stage, "{}", message);
        self.push(LogLevel::Debug, stage, message);
    }

    pub fn info(&mut self, stage: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(stage, "{}", message);
        self.push(LogLevel::Info, stage, message);
    }

    pub fn warn(&mut self, stage: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(stage, "{}", message);
        self.push(LogLevel::Warn, stage, message);
    }

    fn push(&mut self, level: LogLevel, stage: &str, message: String) {
        self.entries.push(LogEntry {
            level,
            stage: stage.to_string(),
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn warnings(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.level == LogLevel::Warn)
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    /// Append another log, keeping order
    pub fn extend(&mut self, other: RunLog) {
        self.entries.extend(other.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sku_keys_sort_lexicographically() {
        let mut keys = vec![
            SkuKey::new("200", "RED", "S"),
            SkuKey::new("100", "RED", "S"),
            SkuKey::new("100", "BLUE", "M"),
            SkuKey::new("100", "BLUE", "L"),
        ];
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["100_BLUE_L", "100_BLUE_M", "100_RED_S", "200_RED_S"]
        );
    }

    #[test]
    fn test_sequence_id() {
        let group = PatternGroup {
            name: "PT-3".to_string(),
            number: 3,
            pattern_vector: vec![1, 2],
            stores: vec![],
            total_qty: 3,
        };
        assert_eq!(group.sequence_id(7), "3007");
    }

    #[test]
    fn test_box_id_and_carton_parsing() {
        let mut record = BoxRecord {
            pattern: "PT-1".to_string(),
            store_code: "S01".to_string(),
            store_name: "Shibuya".to_string(),
            store_type: String::new(),
            rank: None,
            carton: "C-012".to_string(),
            kanri_no: "ABC1234".to_string(),
            store_date: String::new(),
            items: vec![],
            total_qty: 0,
            stated_total: None,
        };
        assert_eq!(record.carton_no(), Some(12));
        assert_eq!(record.box_id(), "★E-ABC1234-00012");
        assert_eq!(record.brand(), "ABC");

        record.carton = "X9".to_string();
        assert_eq!(record.carton_no(), None);
        assert_eq!(record.box_id(), "★E-ABC1234-X9");
    }

    #[test]
    fn test_manufacturer_code_puts_size_before_color() {
        let item = BoxItem {
            key: SkuKey::new("14003", "09", "M"),
            jan_code: String::new(),
            qty: 1,
        };
        assert_eq!(item.manufacturer_code("ABC"), "ABC-14003-M-09");
    }

    #[test]
    fn test_metadata_ship_date_falls_back() {
        let mut meta = Metadata {
            delivery_date: Some("2024/05/01".to_string()),
            ..Default::default()
        };
        assert_eq!(meta.ship_date(), "2024/05/01");
        meta.store_date = Some("2024/05/03".to_string());
        assert_eq!(meta.ship_date(), "2024/05/03");
    }

    #[test]
    fn test_run_log_keeps_order_and_filters_warnings() {
        let mut log = RunLog::new();
        log.info("read", "opened");
        log.warn("transform", "type conflict");
        log.debug("read", "skipped row");
        assert_eq!(log.entries().len(), 3);
        assert!(log.has_warnings());
        let warnings: Vec<_> = log.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].stage, "transform");
    }
}

//! Allocation -> pattern transformation
//!
//! The steps run in a fixed order and each one is a plain function over the
//! previous step's output:
//!
//! 1. [`aggregate_skus`]: union of every sheet's SKU columns
//! 2. [`sort_skus`]: canonical `(product_code, color, size)` order
//! 3. [`inject_jan_codes`]: JAN lookup with the fallback chain
//! 4. [`calculate_sku_totals`]: global quantity per SKU
//! 5. [`merge_stores`] + [`group_by_pattern`]: one group per distinct vector
//! 6. [`assign_box_numbers`]: global carton sequence
//!
//! Nothing is kept between runs; the diagnostics come back in
//! [`TransformOutput::log`].

pub mod jan_match;

use crate::config::{Policy, TypeConflictPolicy};
use crate::reader::JanMap;
use crate::types::{
    AllocationData, AssignedStore, BoxItem, BoxRecord, JanMatchKind, MergedStore, Metadata,
    PatternGroup, RunLog, Sku, SkuKey,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

pub use jan_match::match_jan;

const STAGE: &str = "transform";
/// Misses itemised in the run log; the rest are only counted
const MAX_LOGGED_MISSES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JanStats {
    pub map_size: usize,
    pub matched: usize,
    pub failed: usize,
    pub exact: usize,
    pub fallback: usize,
}

/// Result of one transformation run
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub metadata: Metadata,
    /// Canonical SKU list; its order is the pattern-vector index
    pub skus: Vec<Sku>,
    pub groups: Vec<PatternGroup>,
    pub jan_stats: JanStats,
    pub log: RunLog,
}

impl TransformOutput {
    pub fn store_count(&self) -> usize {
        self.groups.iter().map(|g| g.stores.len()).sum()
    }

    /// Sum of every store's own total
    pub fn total_store_qty(&self) -> i64 {
        self.groups
            .iter()
            .flat_map(|g| g.stores.iter())
            .map(|s| s.total_qty)
            .sum()
    }

    /// Sum of the per-SKU global totals
    pub fn sku_grand_total(&self) -> i64 {
        self.skus.iter().map(|s| s.total_qty).sum()
    }

    /// One box per assigned store, in box-number order.
    pub fn boxes(&self) -> Vec<BoxRecord> {
        let kanri_no = self.metadata.kanri_no().to_string();
        let store_date = self.metadata.ship_date().to_string();
        self.groups
            .iter()
            .flat_map(|group| {
                group.stores.iter().map(move |assigned| (group, assigned))
            })
            .map(|(group, assigned)| BoxRecord {
                pattern: group.name.clone(),
                store_code: assigned.store.store_code.clone(),
                store_name: assigned.store.store_name.clone(),
                store_type: assigned.store.store_type.clone(),
                rank: assigned.store.rank.clone(),
                carton: assigned.box_no.to_string(),
                kanri_no: kanri_no.clone(),
                store_date: store_date.clone(),
                items: self
                    .skus
                    .iter()
                    .zip(&group.pattern_vector)
                    .filter(|&(_, &qty)| qty > 0)
                    .map(|(sku, &qty)| BoxItem {
                        key: sku.key.clone(),
                        jan_code: sku.jan_code.clone(),
                        qty,
                    })
                    .collect(),
                total_qty: assigned.total_qty,
                stated_total: None,
            })
            .collect()
    }
}

/// Runs the pipeline steps over one allocation read
pub struct Transformer<'a> {
    data: &'a AllocationData,
    jan_map: &'a JanMap,
    policy: &'a Policy,
}

impl<'a> Transformer<'a> {
    pub fn new(data: &'a AllocationData, jan_map: &'a JanMap, policy: &'a Policy) -> Self {
        Self {
            data,
            jan_map,
            policy,
        }
    }

    pub fn transform(&self) -> TransformOutput {
        let mut log = RunLog::new();

        let keys = sort_skus(aggregate_skus(self.data));
        log.info(STAGE, format!("{} distinct SKUs", keys.len()));

        let (mut skus, jan_stats) = inject_jan_codes(keys, self.jan_map, &mut log);
        calculate_sku_totals(&mut skus, self.data);

        let stores = merge_stores(self.data, &skus, self.policy.type_conflict, &mut log);
        let groups = assign_box_numbers(group_by_pattern(stores));
        log.info(
            STAGE,
            format!(
                "{} patterns, {} boxes",
                groups.len(),
                groups.iter().map(|g| g.stores.len()).sum::<usize>()
            ),
        );

        TransformOutput {
            metadata: self.data.metadata.clone(),
            skus,
            groups,
            jan_stats,
            log,
        }
    }
}

/// Step 1: every (product, color, size) named by a SKU column.
pub fn aggregate_skus(data: &AllocationData) -> HashSet<SkuKey> {
    data.products
        .iter()
        .flat_map(|p| {
            p.sku_columns
                .iter()
                .map(move |c| c.key.with_product(&p.product_code))
        })
        .collect()
}

/// Step 2: canonical order.
pub fn sort_skus(keys: HashSet<SkuKey>) -> Vec<SkuKey> {
    let mut keys: Vec<SkuKey> = keys.into_iter().collect();
    keys.sort();
    keys
}

/// Step 3: attach JAN codes; misses leave the code blank.
pub fn inject_jan_codes(keys: Vec<SkuKey>, jan_map: &JanMap, log: &mut RunLog) -> (Vec<Sku>, JanStats) {
    let mut stats = JanStats {
        map_size: jan_map.len(),
        ..Default::default()
    };
    log.info(
        STAGE,
        format!("Matching JAN codes ({} table entries)", stats.map_size),
    );

    let skus: Vec<Sku> = keys
        .into_iter()
        .map(|key| {
            let mut sku = Sku::new(key);
            match match_jan(&sku.key, jan_map) {
                Some((jan, kind)) => {
                    if kind == JanMatchKind::Exact {
                        stats.exact += 1;
                    } else {
                        stats.fallback += 1;
                        log.debug(STAGE, format!("JAN fallback ({:?}) for {}", kind, sku.key));
                    }
                    stats.matched += 1;
                    sku.jan_code = jan;
                    sku.jan_match = Some(kind);
                }
                None => {
                    stats.failed += 1;
                    if stats.failed <= MAX_LOGGED_MISSES {
                        log.info(STAGE, format!("No JAN for {}", sku.key));
                    }
                }
            }
            sku
        })
        .collect();

    log.info(
        STAGE,
        format!(
            "JAN matched {}, failed {}",
            stats.matched, stats.failed
        ),
    );
    (skus, stats)
}

/// Step 4: global quantity per SKU over every store of every sheet.
pub fn calculate_sku_totals(skus: &mut [Sku], data: &AllocationData) {
    let mut totals: HashMap<SkuKey, i64> = HashMap::new();
    for product in &data.products {
        for store in &product.stores {
            for (short, qty) in &store.quantities {
                *totals.entry(short.with_product(&product.product_code)).or_insert(0) += qty;
            }
        }
    }
    for sku in skus.iter_mut() {
        sku.total_qty = totals.get(&sku.key).copied().unwrap_or(0);
    }
}

/// Step 5a: merge rows by store code across sheets, in first-seen order,
/// and build each store's pattern vector over `skus`.
pub fn merge_stores(
    data: &AllocationData,
    skus: &[Sku],
    policy: TypeConflictPolicy,
    log: &mut RunLog,
) -> Vec<MergedStore> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, MergedStore> = HashMap::new();

    for product in &data.products {
        for row in &product.stores {
            let store = merged.entry(row.store_code.clone()).or_insert_with(|| {
                order.push(row.store_code.clone());
                MergedStore {
                    store_code: row.store_code.clone(),
                    store_name: row.store_name.clone(),
                    store_type: row.store_type.clone(),
                    rank: row.rank.clone(),
                    quantities: BTreeMap::new(),
                    pattern_vector: Vec::new(),
                }
            });

            if store.store_type != row.store_type && policy == TypeConflictPolicy::Warn {
                log.warn(
                    STAGE,
                    format!(
                        "Store {} has type '{}' on sheet {} but '{}' earlier; keeping '{}'",
                        row.store_code,
                        row.store_type,
                        product.sheet_name,
                        store.store_type,
                        store.store_type
                    ),
                );
            }

            for (short, qty) in &row.quantities {
                *store
                    .quantities
                    .entry(short.with_product(&product.product_code))
                    .or_insert(0) += qty;
            }
        }
    }

    order
        .into_iter()
        .filter_map(|code| merged.remove(&code))
        .map(|mut store| {
            store.pattern_vector = skus
                .iter()
                .map(|sku| store.quantities.get(&sku.key).copied().unwrap_or(0))
                .collect();
            store
        })
        .collect()
}

/// Stores sharing one vector, before box numbers are assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternBucket {
    pub name: String,
    pub number: u32,
    pub pattern_vector: Vec<i64>,
    pub stores: Vec<MergedStore>,
}

/// Step 5b: partition by exact vector equality, named `PT-n` in first-seen
/// order. All-zero vectors produce no group.
pub fn group_by_pattern(stores: Vec<MergedStore>) -> Vec<PatternBucket> {
    let mut index: HashMap<Vec<i64>, usize> = HashMap::new();
    let mut buckets: Vec<(Vec<i64>, Vec<MergedStore>)> = Vec::new();

    for store in stores {
        match index.get(&store.pattern_vector) {
            Some(&i) => buckets[i].1.push(store),
            None => {
                index.insert(store.pattern_vector.clone(), buckets.len());
                buckets.push((store.pattern_vector.clone(), vec![store]));
            }
        }
    }

    buckets
        .into_iter()
        .filter(|(vector, _)| vector.iter().sum::<i64>() != 0)
        .enumerate()
        .map(|(i, (pattern_vector, stores))| {
            let number = i as u32 + 1;
            PatternBucket {
                name: format!("PT-{}", number),
                number,
                pattern_vector,
                stores,
            }
        })
        .collect()
}

/// Step 6: one global counter from 1, groups first then stores.
pub fn assign_box_numbers(buckets: Vec<PatternBucket>) -> Vec<PatternGroup> {
    let mut next_box = 1u32;
    buckets
        .into_iter()
        .map(|bucket| {
            let total_qty: i64 = bucket.pattern_vector.iter().sum();
            let stores = bucket
                .stores
                .into_iter()
                .enumerate()
                .map(|(i, store)| {
                    let box_no = next_box;
                    next_box += 1;
                    AssignedStore {
                        total_qty: store.total_qty(),
                        store,
                        local_index: i + 1,
                        box_no,
                    }
                })
                .collect();
            PatternGroup {
                name: bucket.name,
                number: bucket.number,
                pattern_vector: bucket.pattern_vector,
                stores,
                total_qty,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProductSheet, ShortKey, SkuColumn, StoreRow};
    use pretty_assertions::assert_eq;

    fn row(code: &str, store_type: &str, qty: &[(&str, &str, i64)]) -> StoreRow {
        StoreRow {
            no: String::new(),
            store_type: store_type.to_string(),
            store_code: code.to_string(),
            store_name: format!("Store {}", code),
            rank: None,
            carton: None,
            quantities: qty
                .iter()
                .map(|(c, s, q)| (ShortKey::new(*c, *s), *q))
                .collect(),
        }
    }

    fn product(code: &str, columns: &[(&str, &str)], stores: Vec<StoreRow>) -> ProductSheet {
        ProductSheet {
            sheet_name: code.to_string(),
            product_code: code.to_string(),
            metadata: Metadata::default(),
            sku_columns: columns
                .iter()
                .enumerate()
                .map(|(i, (c, s))| SkuColumn {
                    col: 7 + i as u32,
                    key: ShortKey::new(*c, *s),
                })
                .collect(),
            stores,
        }
    }

    fn run(data: &AllocationData) -> TransformOutput {
        let map = JanMap::new();
        let policy = Policy::default();
        Transformer::new(data, &map, &policy).transform()
    }

    fn red_data() -> AllocationData {
        AllocationData {
            metadata: Metadata {
                kanri_no: Some("ABC2401".to_string()),
                ..Default::default()
            },
            products: vec![product(
                "100",
                &[("RED", "S"), ("RED", "M")],
                vec![
                    row("S01", "1", &[("RED", "S", 2), ("RED", "M", 3)]),
                    row("S02", "1", &[("RED", "S", 2), ("RED", "M", 3)]),
                    row("S03", "1", &[("RED", "S", 1), ("RED", "M", 3)]),
                ],
            )],
        }
    }

    #[test]
    fn test_identical_vectors_share_a_group() {
        let out = run(&red_data());
        assert_eq!(out.groups.len(), 2);
        // SKU order: M before S
        assert_eq!(out.groups[0].pattern_vector, vec![3, 2]);
        assert_eq!(out.groups[0].total_qty, 5);
        assert_eq!(out.groups[0].stores.len(), 2);
        assert_eq!(out.groups[1].name, "PT-2");
        assert_eq!(out.groups[1].stores[0].store.store_code, "S03");
    }

    #[test]
    fn test_box_numbers_are_global_and_gapless() {
        let out = run(&red_data());
        let boxes: Vec<u32> = out
            .groups
            .iter()
            .flat_map(|g| g.stores.iter().map(|s| s.box_no))
            .collect();
        assert_eq!(boxes, vec![1, 2, 3]);
        assert_eq!(out.groups[1].stores[0].local_index, 1);
        assert_eq!(out.groups[1].sequence_id(1), "2001");
    }

    #[test]
    fn test_group_totals_match_vectors_and_skus() {
        let out = run(&red_data());
        for group in &out.groups {
            assert_eq!(group.total_qty, group.pattern_vector.iter().sum::<i64>());
            assert!(group.stores.iter().all(|s| s.total_qty == group.total_qty));
        }
        assert_eq!(out.total_store_qty(), out.sku_grand_total());
        assert_eq!(out.sku_grand_total(), 14);
    }

    #[test]
    fn test_stores_merge_across_sheets_by_code() {
        let data = AllocationData {
            metadata: Metadata::default(),
            products: vec![
                product("100", &[("RED", "S")], vec![row("S01", "1", &[("RED", "S", 2)])]),
                product("200", &[("BLUE", "F")], vec![row("S01", "2", &[("BLUE", "F", 4)])]),
            ],
        };
        let out = run(&data);
        assert_eq!(out.store_count(), 1);
        let store = &out.groups[0].stores[0].store;
        assert_eq!(store.pattern_vector, vec![2, 4]);
        assert_eq!(store.store_type, "1");
        // Warn is the default policy
        assert!(out.log.has_warnings());
    }

    #[test]
    fn test_type_conflicts_can_be_ignored() {
        let data = AllocationData {
            metadata: Metadata::default(),
            products: vec![
                product("100", &[("RED", "S")], vec![row("S01", "1", &[("RED", "S", 2)])]),
                product("200", &[("RED", "S")], vec![row("S01", "2", &[("RED", "S", 4)])]),
            ],
        };
        let map = JanMap::new();
        let policy = Policy {
            type_conflict: TypeConflictPolicy::Ignore,
        };
        let out = Transformer::new(&data, &map, &policy).transform();
        assert!(!out.log.has_warnings());
    }

    #[test]
    fn test_all_zero_vectors_form_no_group() {
        let stores = vec![MergedStore {
            store_code: "S09".to_string(),
            store_name: "Empty".to_string(),
            store_type: String::new(),
            rank: None,
            quantities: BTreeMap::new(),
            pattern_vector: vec![0, 0],
        }];
        assert!(group_by_pattern(stores).is_empty());
    }

    #[test]
    fn test_jan_injection_and_stats() {
        let data = red_data();
        let map: JanMap = [(("100", "RED", "S"), "4900000000001")].into_iter().collect();
        let policy = Policy::default();
        let out = Transformer::new(&data, &map, &policy).transform();
        assert_eq!(out.jan_stats.matched, 1);
        assert_eq!(out.jan_stats.failed, 1);
        assert_eq!(out.skus[1].jan_code, "4900000000001");
        assert_eq!(out.skus[0].jan_code, "");
    }

    #[test]
    fn test_transform_is_deterministic() {
        let data = red_data();
        let a = run(&data);
        let b = run(&data);
        assert_eq!(a.groups, b.groups);
        assert_eq!(a.skus, b.skus);
    }

    #[test]
    fn test_boxes_projection() {
        let out = run(&red_data());
        let boxes = out.boxes();
        assert_eq!(boxes.len(), 3);
        assert_eq!(boxes[2].carton, "3");
        assert_eq!(boxes[2].pattern, "PT-2");
        assert_eq!(boxes[0].items.len(), 2);
        assert_eq!(boxes[0].kanri_no, "ABC2401");
        assert_eq!(boxes[2].total_qty, 4);
    }
}

//! JAN lookup with the zero-padding fallback chain
//!
//! Upstream systems disagree on whether numeric color/size codes are zero
//! padded, so a miss on the exact key retries with leading zeros stripped
//! from the color, then the size, then both.

use crate::reader::JanMap;
use crate::sheet::text::{normalize_product_code, strip_leading_zeros};
use crate::types::{JanMatchKind, SkuKey};

/// First hit of the fallback chain, or `None`.
pub fn match_jan(key: &SkuKey, map: &JanMap) -> Option<(String, JanMatchKind)> {
    let product = normalize_product_code(&key.product_code);
    let color = key.color.trim();
    let size = key.size.trim();
    let color_stripped = strip_leading_zeros(color);
    let size_stripped = strip_leading_zeros(size);

    let mut candidates = vec![(color.to_string(), size.to_string(), JanMatchKind::Exact)];
    if color_stripped != color {
        candidates.push((
            color_stripped.clone(),
            size.to_string(),
            JanMatchKind::ColorStripped,
        ));
    }
    if size_stripped != size {
        candidates.push((
            color.to_string(),
            size_stripped.clone(),
            JanMatchKind::SizeStripped,
        ));
    }
    candidates.push((color_stripped, size_stripped, JanMatchKind::BothStripped));

    candidates.into_iter().find_map(|(color, size, kind)| {
        map.get(&SkuKey::new(product.clone(), color, size))
            .filter(|jan| !jan.is_empty())
            .map(|jan| (jan.to_string(), kind))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str, &str, &str)]) -> JanMap {
        entries
            .iter()
            .map(|(p, c, s, j)| ((*p, *c, *s), *j))
            .collect()
    }

    #[test]
    fn test_exact_match_wins() {
        let m = map(&[("A-1", "003", "09", "111"), ("A-1", "3", "9", "222")]);
        let hit = match_jan(&SkuKey::new("A-1", "003", "09"), &m);
        assert_eq!(hit, Some(("111".to_string(), JanMatchKind::Exact)));
    }

    #[test]
    fn test_both_stripped_fallback() {
        let m = map(&[("A-1", "3", "9", "222")]);
        let hit = match_jan(&SkuKey::new("A-1", "003", "09"), &m);
        assert_eq!(hit, Some(("222".to_string(), JanMatchKind::BothStripped)));
    }

    #[test]
    fn test_partial_strip_is_not_invented() {
        // "03" is neither the original nor the fully stripped color
        let m = map(&[("A-1", "03", "9", "333")]);
        assert_eq!(match_jan(&SkuKey::new("A-1", "003", "09"), &m), None);
    }

    #[test]
    fn test_color_then_size_order() {
        let m = map(&[("P", "3", "09", "c"), ("P", "003", "9", "s")]);
        let hit = match_jan(&SkuKey::new("P", "003", "09"), &m);
        assert_eq!(hit, Some(("c".to_string(), JanMatchKind::ColorStripped)));

        let m = map(&[("P", "003", "9", "s")]);
        let hit = match_jan(&SkuKey::new("P", "003", "09"), &m);
        assert_eq!(hit, Some(("s".to_string(), JanMatchKind::SizeStripped)));
    }

    #[test]
    fn test_all_zero_color_becomes_zero() {
        let m = map(&[("P", "0", "M", "z")]);
        let hit = match_jan(&SkuKey::new("P", "000", "M"), &m);
        assert_eq!(hit, Some(("z".to_string(), JanMatchKind::ColorStripped)));
    }

    #[test]
    fn test_product_code_is_normalised_before_lookup() {
        let m = map(&[("14003", "RED", "M", "j")]);
        let hit = match_jan(&SkuKey::new("14003（2）", "RED", "M"), &m);
        assert_eq!(hit.map(|h| h.0), Some("j".to_string()));
    }
}

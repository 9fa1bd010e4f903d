//! Product selection for recommendations.
//!
//! The stylist's ids win when any of them exist in the catalog. Otherwise the
//! selection falls back to products whose style tags appear in the prompt, then
//! to the head of the listing. Short selections are topped up from the listing
//! so an outfit has at least [`MIN_ITEMS`] products whenever the catalog allows.

use std::collections::HashSet;
use std::fmt;

use aistylehub_core::{ProductId, StylePrompt};

use crate::models::Product;

/// Smallest outfit the pipeline produces, catalog size permitting.
pub const MIN_ITEMS: usize = 3;
/// Largest outfit the pipeline produces.
pub const MAX_ITEMS: usize = 5;
/// Cap on fallback selections.
pub const FALLBACK_ITEMS: usize = 4;

/// Where the bulk of a selection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Stylist,
    StyleTags,
    Listing,
}

impl fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stylist => "stylist",
            Self::StyleTags => "style_tags",
            Self::Listing => "listing",
        })
    }
}

/// Outcome of [`select_products`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub ids: Vec<ProductId>,
    pub source: SelectionSource,
    /// Products appended from the listing to reach the minimum size.
    pub padded: usize,
}

/// Choose the outfit's products.
///
/// `catalog` is in listing order. `recommended` is the stylist's answer, kept
/// in its own order. The result is never empty for a non-empty catalog.
#[must_use]
pub fn select_products(
    catalog: &[Product],
    recommended: &[ProductId],
    prompt: &StylePrompt,
) -> Selection {
    let known: HashSet<ProductId> = catalog.iter().map(|p| p.id).collect();

    let mut ids: Vec<ProductId> = Vec::with_capacity(MAX_ITEMS);
    for id in recommended {
        if ids.len() == MAX_ITEMS {
            break;
        }
        if known.contains(id) && !ids.contains(id) {
            ids.push(*id);
        }
    }
    let mut source = SelectionSource::Stylist;

    if ids.is_empty() {
        ids = catalog
            .iter()
            .filter(|p| p.matches_style(prompt))
            .take(FALLBACK_ITEMS)
            .map(|p| p.id)
            .collect();
        source = SelectionSource::StyleTags;
    }

    if ids.is_empty() {
        ids = catalog.iter().take(FALLBACK_ITEMS).map(|p| p.id).collect();
        source = SelectionSource::Listing;
    }

    let target = MIN_ITEMS.min(catalog.len());
    let before = ids.len();
    for product in catalog {
        if ids.len() >= target {
            break;
        }
        if !ids.contains(&product.id) {
            ids.push(product.id);
        }
    }

    Selection {
        padded: ids.len() - before,
        ids,
        source,
    }
}

#[cfg(test)]
mod tests {
    use aistylehub_core::ProductType;

    use super::*;
    use crate::models::product::fixtures::product;

    fn prompt(s: &str) -> StylePrompt {
        StylePrompt::parse(s).expect("valid prompt")
    }

    fn ids(raw: &[i32]) -> Vec<ProductId> {
        raw.iter().copied().map(ProductId::new).collect()
    }

    fn office_catalog() -> Vec<Product> {
        vec![
            product(1, ProductType::Top, &["office"]),
            product(2, ProductType::Bottom, &["office"]),
            product(3, ProductType::Footwear, &["street"]),
            product(4, ProductType::Accessory, &["office"]),
        ]
    }

    #[test]
    fn test_stylist_order_is_kept() {
        let selection = select_products(&office_catalog(), &ids(&[2, 1, 4]), &prompt("office"));
        assert_eq!(selection.ids, ids(&[2, 1, 4]));
        assert_eq!(selection.source, SelectionSource::Stylist);
        assert_eq!(selection.padded, 0);
    }

    #[test]
    fn test_unknown_ids_are_dropped() {
        let selection =
            select_products(&office_catalog(), &ids(&[99, 3, 42, 1, 4]), &prompt("office"));
        assert_eq!(selection.ids, ids(&[3, 1, 4]));
    }

    #[test]
    fn test_tag_fallback_includes_tagged_product() {
        let catalog = vec![
            product(10, ProductType::Top, &["street"]),
            product(11, ProductType::Dress, &["boho"]),
            product(12, ProductType::Footwear, &["sport"]),
            product(13, ProductType::Accessory, &["minimal"]),
        ];
        let selection = select_products(&catalog, &ids(&[404]), &prompt("Relaxed BOHO weekend"));

        assert_eq!(selection.source, SelectionSource::StyleTags);
        assert_eq!(selection.ids[0], ProductId::new(11));
        assert!(selection.ids.len() >= MIN_ITEMS);
    }

    #[test]
    fn test_tag_fallback_caps_at_four() {
        let catalog: Vec<Product> = (1..=8)
            .map(|id| product(id, ProductType::Top, &["office"]))
            .collect();
        let selection = select_products(&catalog, &[], &prompt("office"));
        assert_eq!(selection.ids, ids(&[1, 2, 3, 4]));
        assert_eq!(selection.source, SelectionSource::StyleTags);
    }

    #[test]
    fn test_listing_fallback_takes_first_four() {
        let selection = select_products(&office_catalog(), &[], &prompt("gothic"));
        assert_eq!(selection.ids, ids(&[1, 2, 3, 4]));
        assert_eq!(selection.source, SelectionSource::Listing);
    }

    #[test]
    fn test_single_stylist_pick_is_topped_up() {
        let selection = select_products(&office_catalog(), &ids(&[3]), &prompt("street"));
        assert_eq!(selection.ids, ids(&[3, 1, 2]));
        assert_eq!(selection.padded, 2);
    }

    #[test]
    fn test_tiny_catalog_is_used_whole() {
        let catalog = vec![product(1, ProductType::Dress, &[])];
        let selection = select_products(&catalog, &[], &prompt("anything"));
        assert_eq!(selection.ids, ids(&[1]));
    }

    #[test]
    fn test_bounds_for_any_stylist_answer() {
        let catalog: Vec<Product> = (1..=6)
            .map(|id| {
                let tags: &[&str] = if id % 2 == 0 { &["office"] } else { &[] };
                product(id, ProductType::Top, tags)
            })
            .collect();

        for len in 0..=20 {
            // Mix of valid, duplicate and unknown ids
            let answer: Vec<ProductId> = (0..len)
                .map(|i| ProductId::new(if i % 3 == 0 { 100 + i } else { i % 7 }))
                .collect();

            for style in ["office", "gothic"] {
                let selection = select_products(&catalog, &answer, &prompt(style));
                let n = selection.ids.len();
                assert!((MIN_ITEMS..=MAX_ITEMS).contains(&n), "len={len} style={style} n={n}");

                let distinct: HashSet<_> = selection.ids.iter().collect();
                assert_eq!(distinct.len(), n);
            }
        }
    }
}

use std::collections::{BTreeMap, HashSet};
use std::ops::Range;

use crate::error::LoadError;
use crate::loading::{ARTICLE, CONVENIENCE_VALUE, PRODUCT_PRICE, PRODUCT_TYPE, PRODUCT_VOLUME};
use crate::types::{Category, Product};

/// Index range `[start, end)` of each category in the sorted catalog.
pub type CategoryRange = BTreeMap<Category, Range<usize>>;

/// Products sorted by (category, article). Every category occupies one
/// contiguous run, so per-category sums are sums over an index range.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
    ranges: CategoryRange,
    columns: Vec<String>,
}

impl Catalog {
    pub fn new(records: &[Product]) -> Result<Self, LoadError> {
        let mut seen = HashSet::with_capacity(records.len());
        for product in records {
            if !seen.insert(&product.article) {
                return Err(LoadError::DuplicateArticle(product.article.to_string()));
            }
        }

        let mut products = records.to_vec();
        // Stable, so equal keys keep their input order.
        products.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.article.cmp(&b.article))
        });

        let ranges = category_ranges(&products);
        let columns = [ARTICLE, PRODUCT_TYPE, CONVENIENCE_VALUE, PRODUCT_VOLUME, PRODUCT_PRICE]
            .map(String::from)
            .to_vec();
        Ok(Catalog {
            products,
            ranges,
            columns,
        })
    }

    /// Set the input table header that product records follow.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn ranges(&self) -> &CategoryRange {
        &self.ranges
    }

    pub fn range(&self, category: &Category) -> Option<Range<usize>> {
        self.ranges.get(category).cloned()
    }

    /// Header of the table the products were read from.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Products that can never be selected: a selected product must
    /// contribute a positive convenience value.
    pub fn zero_value_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.convenience_value == 0)
    }
}

/// Single pass over sorted products. A category seen again after another
/// category started would break contiguity, which sorting rules out.
fn category_ranges(products: &[Product]) -> CategoryRange {
    let mut ranges = CategoryRange::new();
    let mut start = 0;

    for end in 1..=products.len() {
        let run_ends = end == products.len() || products[end].category != products[start].category;
        if run_ends {
            let category = products[start].category.clone();
            debug_assert!(!ranges.contains_key(&category));
            ranges.insert(category, start..end);
            start = end;
        }
    }

    ranges
}

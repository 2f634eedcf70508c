use std::borrow::Cow;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::catalog::Catalog;
use crate::error::Error;
use crate::RunReport;
use crate::solve::Allocation;
use crate::types::{Product, Shelter};

/// Render the output table: every input column of each selected product plus
/// `shelter`, shelters in allocation order. Fields are written as they were
/// read, so volumes stay in original units.
pub fn render_table(catalog: &Catalog, allocations: &[Allocation]) -> String {
    let mut out = String::new();
    for column in catalog.columns() {
        out.push_str(&field(column));
        out.push(',');
    }
    out.push_str("shelter\n");

    for allocation in allocations {
        for product in allocation.products(catalog) {
            for value in fields(product) {
                out.push_str(&field(&value));
                out.push(',');
            }
            let _ = writeln!(out, "{}", field(&allocation.shelter));
        }
    }
    out
}

/// A product's input record, or its model fields when it has none.
fn fields(product: &Product) -> Vec<Cow<'_, str>> {
    if !product.record.is_empty() {
        return product.record.iter().map(|f| Cow::Borrowed(f.as_str())).collect();
    }
    vec![
        Cow::Borrowed(product.article.0.as_str()),
        Cow::Borrowed(product.category.as_str()),
        Cow::Owned(product.convenience_value.to_string()),
        Cow::Owned(product.raw_volume.to_string()),
        Cow::Owned(product.price.to_string()),
    ]
}

fn field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

/// One summary per shelter in input order: the allocation's totals, or a
/// line saying no solution was found.
pub fn render_summaries(shelters: &[Shelter], report: &RunReport) -> String {
    let mut out = String::new();
    for shelter in shelters {
        let _ = match report.allocation(&shelter.name) {
            Some(allocation) => writeln!(out, "{allocation}"),
            None => writeln!(out, "Can't find solution for {}", shelter.name),
        };
    }
    out
}

pub fn write_table(path: &Path, catalog: &Catalog, allocations: &[Allocation]) -> Result<(), Error> {
    fs::write(path, render_table(catalog, allocations)).map_err(|source| Error::Output {
        path: path.to_owned(),
        source,
    })
}

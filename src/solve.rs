use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::catalog::Catalog;
use crate::engine::{Engine, SolveStatus};
use crate::error::ShelterError;
use crate::model::build_model;
use crate::types::{Category, Config, Product, Shelter};

/// Products chosen for one shelter, with totals recomputed from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub shelter: String,
    /// Catalog indices, ascending.
    pub selected: Vec<usize>,
    pub convenience_value: u64,
    /// In model units; divide by `volume_factor` for original units.
    pub scaled_volume: i64,
    pub volume: f64,
    pub price: i64,
    pub category_counts: BTreeMap<Category, usize>,
}

impl Allocation {
    pub fn from_selection(
        shelter: &str,
        catalog: &Catalog,
        selected: Vec<usize>,
        volume_factor: u32,
    ) -> Self {
        let products = catalog.products();
        let chosen = || selected.iter().map(|&i| &products[i]);

        let scaled_volume: i64 = chosen().map(|p| p.volume).sum();
        let mut category_counts = BTreeMap::new();
        for product in chosen() {
            *category_counts.entry(product.category.clone()).or_insert(0) += 1;
        }

        Allocation {
            shelter: shelter.to_owned(),
            convenience_value: chosen().map(|p| u64::from(p.convenience_value)).sum(),
            scaled_volume,
            volume: scaled_volume as f64 / f64::from(volume_factor),
            price: chosen().map(|p| p.price).sum(),
            category_counts,
            selected,
        }
    }

    pub fn products<'a>(&'a self, catalog: &'a Catalog) -> impl Iterator<Item = &'a Product> {
        self.selected.iter().map(|&i| &catalog.products()[i])
    }

    pub fn count(&self, category: &Category) -> usize {
        self.category_counts.get(category).copied().unwrap_or(0)
    }
}

/// Human-readable summary of an allocation.
impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Find solution for {} with params:", self.shelter)?;
        writeln!(f, "sum of convenience_value = {}", self.convenience_value)?;
        writeln!(f, "sum of product_volume = {:?}", self.volume)?;
        writeln!(f, "sum of product_price = {}", self.price)?;
        for (category, count) in &self.category_counts {
            writeln!(f, "num of {category} = {count}")?;
        }
        Ok(())
    }
}

/// Build and solve the model of one shelter.
///
/// Only a proven optimum counts as success. The selection is read from the
/// indicator variables; totals come from the catalog, not from the
/// contribution variables.
pub fn solve_shelter<E: Engine + ?Sized>(
    engine: &E,
    catalog: &Catalog,
    shelter: &Shelter,
    config: &Config,
) -> Result<Allocation, ShelterError> {
    let model = build_model(catalog, shelter, config)?;
    debug!(
        shelter = %shelter.name,
        variables = model.formulation.num_variables(),
        constraints = model.formulation.linear_constraints().len()
            + model.formulation.reified_constraints().len(),
        engine = engine.name(),
        "model built"
    );

    let outcome = engine.solve(&model.formulation);
    if outcome.status != SolveStatus::Optimal {
        return Err(ShelterError::NoSolution(outcome.status));
    }
    let values = outcome
        .values
        .ok_or_else(|| ShelterError::Engine("optimal status without values".into()))?;
    if values.len() != model.formulation.num_variables() {
        return Err(ShelterError::Engine(format!(
            "expected {} values, got {}",
            model.formulation.num_variables(),
            values.len()
        )));
    }

    let selected = model
        .selected
        .iter()
        .enumerate()
        .filter(|&(_, var)| values[var.index()] > 0)
        .map(|(i, _)| i)
        .collect();

    Ok(Allocation::from_selection(
        &shelter.name,
        catalog,
        selected,
        config.volume_factor,
    ))
}

pub mod catalog;
pub mod engine;
pub mod error;
pub mod formulation;
pub mod loading;
pub mod model;
pub mod output;
pub mod restriction;
pub mod solve;
pub mod types;

pub use catalog::{Catalog, CategoryRange};
pub use engine::{CbcEngine, Engine, SolveStatus};
pub use error::{Error, LoadError, ShelterError};
pub use solve::{Allocation, solve_shelter};
pub use loading::ProductTable;
pub use types::{ArticleId, Category, Config, Product, Shelter, ShelterRule};

use tracing::{info, warn};

/// A shelter that produced no allocation, and why.
#[derive(Debug)]
pub struct ShelterFailure {
    pub shelter: String,
    pub error: ShelterError,
}

/// Result of one run over all shelters, both lists in shelter input order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub allocations: Vec<Allocation>,
    pub failures: Vec<ShelterFailure>,
}

impl RunReport {
    /// No shelter could be allocated. Distinct from a run over zero shelters
    /// only through `failures`.
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn allocation(&self, shelter: &str) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.shelter == shelter)
    }
}

/// Solve every shelter independently against the shared catalog. A shelter
/// that fails is recorded and skipped; the loop always runs to the end.
pub fn allocate_shelters<E: Engine + ?Sized>(
    engine: &E,
    catalog: &Catalog,
    shelters: &[Shelter],
    config: &Config,
) -> RunReport {
    let unselectable: Vec<String> = catalog
        .zero_value_products()
        .map(|p| p.article.to_string())
        .collect();
    if !unselectable.is_empty() {
        warn!(
            articles = ?unselectable,
            "products with zero convenience value can never be selected"
        );
    }

    info!(
        products = catalog.len(),
        categories = catalog.ranges().len(),
        shelters = shelters.len(),
        engine = engine.name(),
        "allocating shelters"
    );

    let mut report = RunReport::default();
    for shelter in shelters {
        match solve_shelter(engine, catalog, shelter, config) {
            Ok(allocation) => {
                info!(
                    shelter = %shelter.name,
                    selected = allocation.selected.len(),
                    convenience_value = allocation.convenience_value,
                    "shelter allocated"
                );
                report.allocations.push(allocation);
            }
            Err(error) => {
                warn!(shelter = %shelter.name, %error, "no allocation for shelter");
                report.failures.push(ShelterFailure {
                    shelter: shelter.name.clone(),
                    error,
                });
            }
        }
    }

    report
}

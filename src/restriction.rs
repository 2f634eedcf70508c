use std::ops::Range;

use crate::catalog::Catalog;
use crate::error::ShelterError;
use crate::formulation::{Formulation, LinearConstraint, LinearExpr, VarId};
use crate::types::{Shelter, ShelterRule};

/// Count constraints for one category: the selected indicators in
/// `range` must satisfy `rule`. Rules are not checked against the size of
/// the category; an unreachable count shows up as infeasibility.
pub fn category_constraints(
    range: Range<usize>,
    rule: ShelterRule,
    indicators: &[VarId],
) -> Vec<LinearConstraint> {
    let selected = || LinearExpr::sum(&indicators[range.clone()]);
    match rule {
        ShelterRule::Exact(n) => vec![selected().eq(n)],
        ShelterRule::Range(lo, hi) => vec![selected().ge(lo), selected().le(hi)],
    }
}

/// Add the count constraints of every category to `formulation`.
///
/// Every rule must name a category present in the catalog, and every
/// catalog category must be governed by a rule.
pub fn constrain_categories(
    formulation: &mut Formulation,
    catalog: &Catalog,
    shelter: &Shelter,
    indicators: &[VarId],
) -> Result<(), ShelterError> {
    if let Some(missing) = shelter
        .rules
        .keys()
        .find(|category| catalog.range(category).is_none())
    {
        return Err(ShelterError::MissingCategory(missing.clone()));
    }

    for (category, range) in catalog.ranges() {
        let rule = shelter
            .rules
            .get(category)
            .ok_or_else(|| ShelterError::UnruledCategory(category.clone()))?;

        for constraint in category_constraints(range.clone(), *rule, indicators) {
            formulation.add(constraint);
        }
    }

    Ok(())
}

use crate::catalog::Catalog;
use crate::error::ShelterError;
use crate::formulation::{Formulation, LinearExpr, Sense, VarId};
use crate::restriction::constrain_categories;
use crate::types::{Config, Shelter};

/// The integer program for one shelter, together with the variables that
/// belong to each catalog product (same index as the product).
#[derive(Debug)]
pub struct ShelterModel {
    pub formulation: Formulation,
    pub selected: Vec<VarId>,
    pub convenience: Vec<VarId>,
    pub volume: Vec<VarId>,
    pub price: Vec<VarId>,
}

/// Build the allocation model of `shelter` over the shared catalog.
///
/// Per product `i` there is a selection indicator `b_i` and three
/// contributions:
/// - convenience `p_i` in `[0, value_i]`, with `b_i => p_i >= 1` and `!b_i => p_i == 0`
/// - volume `v_i` in `[0, volume_i]`, equal to `volume_i` if selected and zero otherwise
/// - price `w_i` in `[0, price_i]`, equal to `price_i` if selected and zero otherwise
///
/// The objective maximises the total convenience. Total volume must lie
/// within the scaled volume bounds and total price must equal `price_meet`.
pub fn build_model(
    catalog: &Catalog,
    shelter: &Shelter,
    config: &Config,
) -> Result<ShelterModel, ShelterError> {
    let mut formulation = Formulation::new();
    let n = catalog.len();
    let mut selected = Vec::with_capacity(n);
    let mut convenience = Vec::with_capacity(n);
    let mut volume = Vec::with_capacity(n);
    let mut price = Vec::with_capacity(n);

    for (i, product) in catalog.products().iter().enumerate() {
        let p = formulation.new_int(format!("p_{i}"), 0, i64::from(product.convenience_value));
        let v = formulation.new_int(format!("v_{i}"), 0, product.volume);
        let w = formulation.new_int(format!("w_{i}"), 0, product.price);
        let b = formulation.new_bool(format!("b_{i}"));

        formulation.add_reified(
            b,
            LinearExpr::term(p, 1).ge(1),
            LinearExpr::term(p, 1).eq(0),
        );
        formulation.add_reified(
            b,
            LinearExpr::term(v, 1).eq(product.volume as f64),
            LinearExpr::term(v, 1).eq(0),
        );
        formulation.add_reified(
            b,
            LinearExpr::term(w, 1).eq(product.price as f64),
            LinearExpr::term(w, 1).eq(0),
        );

        convenience.push(p);
        volume.push(v);
        price.push(w);
        selected.push(b);
    }

    formulation.set_objective(Sense::Maximise, LinearExpr::sum(&convenience));

    let (volume_min, volume_max) = config.scaled_volume_bounds();
    formulation.add(LinearExpr::sum(&volume).ge(volume_min));
    formulation.add(LinearExpr::sum(&volume).le(volume_max));
    formulation.add(LinearExpr::sum(&price).eq(config.price_meet as f64));

    constrain_categories(&mut formulation, catalog, shelter, &selected)?;

    Ok(ShelterModel {
        formulation,
        selected,
        convenience,
        volume,
        price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::product;
    use crate::formulation::Domain;
    use crate::types::{Category, ShelterRule};

    fn config(volume_min: f64, volume_max: f64, price_meet: i64) -> Config {
        Config {
            volume_factor: 1,
            volume_min,
            volume_max,
            price_meet,
            time_limit_seconds: None,
        }
    }

    fn shelter(rules: &[(&str, ShelterRule)]) -> Shelter {
        Shelter {
            name: "alpha".into(),
            rules: rules.iter().map(|(c, r)| (Category::from(*c), *r)).collect(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(&[
            product("1", "food", 5, 10, 2),
            product("2", "food", 3, 20, 4),
            product("3", "medicine", 8, 15, 4),
        ])
        .unwrap()
    }

    /// Values for every variable given a selection.
    fn assignment(model: &ShelterModel, catalog: &Catalog, picks: &[bool]) -> Vec<i64> {
        let mut values = vec![0; model.formulation.num_variables()];
        for (i, (&picked, product)) in picks.iter().zip(catalog.products()).enumerate() {
            if picked {
                values[model.selected[i].index()] = 1;
                values[model.convenience[i].index()] = i64::from(product.convenience_value);
                values[model.volume[i].index()] = product.volume;
                values[model.price[i].index()] = product.price;
            }
        }
        values
    }

    #[test]
    fn declares_four_bounded_variables_per_product() {
        let catalog = catalog();
        let shelter = shelter(&[
            ("food", ShelterRule::Exact(1)),
            ("medicine", ShelterRule::Exact(1)),
        ]);
        let model = build_model(&catalog, &shelter, &config(0.0, 100.0, 6)).unwrap();

        assert_eq!(model.formulation.num_variables(), 12);
        assert_eq!(model.formulation.reified_constraints().len(), 9);
        // volume min, volume max, price, one per exact rule
        assert_eq!(model.formulation.linear_constraints().len(), 5);
        assert_eq!(
            model.formulation.domain(model.convenience[0]),
            Domain::Integer { min: 0, max: 5 }
        );
        assert_eq!(
            model.formulation.domain(model.volume[1]),
            Domain::Integer { min: 0, max: 20 }
        );
        assert_eq!(model.formulation.domain(model.selected[2]), Domain::Boolean);
    }

    #[test]
    fn only_the_matching_selection_satisfies_the_model() {
        let catalog = catalog();
        let shelter = shelter(&[
            ("food", ShelterRule::Exact(1)),
            ("medicine", ShelterRule::Exact(1)),
        ]);
        let model = build_model(&catalog, &shelter, &config(0.0, 100.0, 6)).unwrap();

        let ok = |picks: &[bool]| {
            model
                .formulation
                .is_satisfied_by(&assignment(&model, &catalog, picks))
        };
        assert!(ok(&[true, false, true]));
        assert!(!ok(&[false, true, true]));
        assert!(!ok(&[true, true, false]));
        assert!(!ok(&[false, false, false]));
    }

    #[test]
    fn indicator_without_contribution_is_rejected() {
        let catalog = catalog();
        let shelter = shelter(&[
            ("food", ShelterRule::Range(0, 2)),
            ("medicine", ShelterRule::Range(0, 1)),
        ]);
        let model = build_model(&catalog, &shelter, &config(0.0, 100.0, 2)).unwrap();

        let mut values = assignment(&model, &catalog, &[true, false, false]);
        assert!(model.formulation.is_satisfied_by(&values));

        values[model.volume[0].index()] = 0;
        assert!(!model.formulation.is_satisfied_by(&values));
    }

    #[test]
    fn volume_bounds_are_scaled() {
        let catalog = catalog();
        let shelter = shelter(&[
            ("food", ShelterRule::Exact(1)),
            ("medicine", ShelterRule::Exact(1)),
        ]);
        let mut config = config(1.0, 2.0, 6);
        config.volume_factor = 20;
        let model = build_model(&catalog, &shelter, &config).unwrap();

        // food 1 + medicine: volume 25 lies in [20, 40]
        assert!(
            model
                .formulation
                .is_satisfied_by(&assignment(&model, &catalog, &[true, false, true]))
        );

        config.volume_max = 1.2;
        let model = build_model(&catalog, &shelter, &config).unwrap();
        assert!(
            !model
                .formulation
                .is_satisfied_by(&assignment(&model, &catalog, &[true, false, true]))
        );
    }

    #[test]
    fn zero_value_product_cannot_be_selected() {
        let catalog = Catalog::new(&[product("1", "food", 0, 1, 1)]).unwrap();
        let shelter = shelter(&[("food", ShelterRule::Exact(1))]);
        let model = build_model(&catalog, &shelter, &config(0.0, 10.0, 1)).unwrap();

        // p_0 is pinned to zero, so b_0 = 1 violates b => p >= 1
        assert!(
            !model
                .formulation
                .is_satisfied_by(&assignment(&model, &catalog, &[true]))
        );
    }

    #[test]
    fn missing_category_propagates() {
        let shelter = shelter(&[
            ("food", ShelterRule::Exact(1)),
            ("medicine", ShelterRule::Exact(1)),
            ("tools", ShelterRule::Exact(1)),
        ]);
        let err = build_model(&catalog(), &shelter, &config(0.0, 100.0, 6)).unwrap_err();
        assert!(matches!(err, ShelterError::MissingCategory(_)));
    }
}

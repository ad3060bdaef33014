//! Property tests for rounding, facility ranking, rollups and netting

use proptest::prelude::*;

use industry_calculator::models::{FacilityId, ItemInfo};
use industry_calculator::modifier::{AssemblyLine, ModifierTriple, best_facility};
use industry_calculator::process::ProcessDetail;
use industry_calculator::quantity::MaterialMap;
use industry_calculator::resolver::required_quantity;
use industry_calculator::{ProcessNode, RecipeActivity, TypeId};

fn ship() -> ItemInfo {
    ItemInfo {
        id: TypeId(587),
        name: "Rifter".to_string(),
        group_id: 25,
        category_id: 6,
        portion_size: 1,
        sellable: true,
    }
}

fn node(time: f64, cost: f64, material: f64) -> ProcessNode {
    ProcessNode::new(
        RecipeActivity::Manufacturing,
        TypeId(1),
        Some(TypeId(2)),
        1.0,
        ProcessDetail::Manufacture {
            me: 0,
            te: 0,
            portions: 1.0,
        },
    )
    .with_time(time)
    .with_cost(cost)
    .with_materials([(TypeId(34), material)].into_iter().collect())
}

fn map_strategy() -> impl Strategy<Value = MaterialMap> {
    prop::collection::vec((1u32..8, 1u32..1000), 0..8).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(id, qty)| (TypeId(id), f64::from(qty)))
            .collect()
    })
}

proptest! {
    #[test]
    fn whole_portions_round_to_integers_above_the_raw_amount(
        base in 1u32..10_000,
        factor in 0.5f64..1.0,
        portions in 1u32..500,
    ) {
        let base = f64::from(base);
        let portions = f64::from(portions);
        let qty = required_quantity(base, factor, portions);

        prop_assert_eq!(qty.fract(), 0.0);
        prop_assert!(qty >= portions);
        let raw = base * factor * portions;
        prop_assert!(qty >= raw - 1e-6);
        prop_assert!(qty < raw.max(portions) + 1.0);
    }

    #[test]
    fn fractional_portions_keep_the_exact_amount(
        base in 1u32..10_000,
        factor in 0.5f64..1.0,
        portions in 0.01f64..0.99,
    ) {
        let base = f64::from(base);
        prop_assert_eq!(required_quantity(base, factor, portions), base * factor * portions);
    }

    #[test]
    fn facility_choice_ignores_line_order(
        triples in prop::collection::vec((1u32..20, 1u32..20, 1u32..20), 1..8),
    ) {
        let lines: Vec<AssemblyLine> = triples
            .iter()
            .enumerate()
            .map(|(i, &(m, t, c))| {
                let triple = ModifierTriple::new(
                    f64::from(m) / 20.0,
                    f64::from(t) / 20.0,
                    f64::from(c) / 20.0,
                );
                AssemblyLine::new(FacilityId(i as u32), RecipeActivity::Manufacturing, triple)
                    .with_category(6, ModifierTriple::NEUTRAL)
            })
            .collect();
        let mut reversed = lines.clone();
        reversed.reverse();

        let item = ship();
        let (_, forward) = best_facility(RecipeActivity::Manufacturing, &item, &lines).unwrap();
        let (_, backward) = best_facility(RecipeActivity::Manufacturing, &item, &reversed).unwrap();
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn rollups_add_up_over_children(
        parent in (0u32..10_000, 0u32..10_000, 1u32..1000),
        children in prop::collection::vec((0u32..10_000, 0u32..10_000, 1u32..1000), 0..6),
    ) {
        let to_node = |(t, c, m): (u32, u32, u32)| node(f64::from(t), f64::from(c), f64::from(m));
        let tree = children
            .iter()
            .fold(to_node(parent), |tree, child| tree.with_child(to_node(*child)));

        let all: Vec<_> = std::iter::once(parent).chain(children.iter().copied()).collect();
        let time: u32 = all.iter().map(|(t, _, _)| t).sum();
        let cost: u32 = all.iter().map(|(_, c, _)| c).sum();
        let material: u32 = all.iter().map(|(_, _, m)| m).sum();

        prop_assert_eq!(tree.total_time(), f64::from(time));
        prop_assert_eq!(tree.total_process_cost(), f64::from(cost));
        prop_assert_eq!(tree.total_materials().get(TypeId(34)), f64::from(material));
        prop_assert_eq!(tree.node_count(), all.len());
    }

    #[test]
    fn symmetric_difference_leaves_no_shared_items(a in map_strategy(), b in map_strategy()) {
        let (mut left, mut right) = (a.clone(), b.clone());
        left.symmetric_difference(&mut right);

        for item in (1..8).map(TypeId) {
            prop_assert!(!(left.contains(item) && right.contains(item)));
            // Both sides lose the same amount.
            let removed_left = a.get(item) - left.get(item);
            let removed_right = b.get(item) - right.get(item);
            prop_assert!((removed_left - removed_right).abs() < 1e-9);
        }
    }
}

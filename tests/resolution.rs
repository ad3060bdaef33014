//! End-to-end resolution against small hand-built and sample catalogs

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use industry_calculator::catalog::MemoryCatalog;
use industry_calculator::character::CharacterProfile;
use industry_calculator::models::{
    ActivityData, Blueprint, FacilityId, InventionData, ItemInfo, LocationId, ManufacturingData,
    RegionId,
};
use industry_calculator::modifier::{AssemblyLine, IndustryModifier};
use industry_calculator::pricing::{PriceBook, PriceContext, PriceKind, Quote};
use industry_calculator::process::{InventionResult, ProcessDetail, Valuation};
use industry_calculator::quantity::SkillMap;
use industry_calculator::resolver::level_factor;
use industry_calculator::sample::{self, ids};
use industry_calculator::sources::Pricing;
use industry_calculator::{
    BlueprintLevels, CopyRuns, IndustryError, ProcessNode, RecipeActivity, RecursionBudget, Resolver,
    ResolverSettings, TypeId, db,
};
use rusqlite::Connection;

const WIDGET: TypeId = TypeId(500);
const WIDGET_BLUEPRINT: TypeId = TypeId(501);
const ORE: TypeId = TypeId(502);
const NOW: u64 = 1_000_000;

fn item(id: TypeId, name: &str, category_id: u32) -> ItemInfo {
    ItemInfo {
        id,
        name: name.to_string(),
        group_id: 1,
        category_id,
        portion_size: 1,
        sellable: true,
    }
}

/// One blueprint producing widgets five at a time from ore.
fn widget_fixture() -> (MemoryCatalog, PriceBook, CharacterProfile, IndustryModifier) {
    let mut catalog = MemoryCatalog::new();
    catalog.add_item(item(WIDGET, "Widget", 6));
    catalog.add_item(item(WIDGET_BLUEPRINT, "Widget Blueprint", 9));
    catalog.add_item(item(ORE, "Ore", 4));

    let mut blueprint = Blueprint::new(WIDGET_BLUEPRINT, 100);
    blueprint.manufacturing = Some(ManufacturingData {
        activity: ActivityData {
            time: 600,
            materials: [(ORE, 10.0)].into_iter().collect(),
            skills: SkillMap::new(),
        },
        product: WIDGET,
        portion_size: 5,
    });
    catalog.add_blueprint(blueprint);

    let mut prices = PriceBook::new().with_clock(NOW);
    let quote = |price| Quote {
        price,
        updated_at: NOW,
    };
    prices.set_adjusted(ORE, quote(2.0));
    prices.set_buy(ORE, RegionId(1), quote(2.5));

    let modifier = IndustryModifier::new(LocationId(9), 0.0)
        .with_line(AssemblyLine::station(FacilityId(1), RecipeActivity::Manufacturing));

    (catalog, prices, CharacterProfile::new(), modifier)
}

#[test]
fn manufacture_time_scales_with_portions_and_te() {
    let (catalog, prices, character, modifier) = widget_fixture();
    let resolver = Resolver::new(&catalog, &prices, &character, &modifier);

    let node = resolver
        .manufacture(WIDGET, 10.0, Some(BlueprintLevels::new(0, -4)), RecursionBudget::NONE)
        .unwrap();

    assert_eq!(node.time(), 1152.0);
    assert_eq!(node.quantity(), 10.0);
    assert_eq!(node.materials().get(ORE), 20.0);
    assert_eq!(node.facility(), Some(FacilityId(1)));
    assert_eq!(node.location(), Some(LocationId(9)));
    // 10 ore at adjusted price 2 per run, two runs, neutral cost index
    assert!((node.cost() - 40.0).abs() < 1e-9);
}

fn settings() -> ResolverSettings {
    ResolverSettings {
        max_price_age: Duration::from_secs(3600),
        reference_region: RegionId(1),
    }
}

#[test]
fn job_cost_falls_back_to_reference_buy_price() {
    let (catalog, _, character, modifier) = widget_fixture();
    let mut prices = PriceBook::new().with_clock(NOW);
    prices.set_buy(
        ORE,
        RegionId(1),
        Quote {
            price: 2.5,
            updated_at: NOW,
        },
    );
    let resolver = Resolver::new(&catalog, &prices, &character, &modifier).with_settings(settings());

    let node = resolver
        .manufacture(WIDGET, 10.0, Some(BlueprintLevels::new(0, 0)), RecursionBudget::NONE)
        .unwrap();
    // 10 ore at buy price 2.5 per run, two runs
    assert!((node.cost() - 50.0).abs() < 1e-9);
}

#[test]
fn stale_adjusted_price_is_not_replaced_by_buy_price() {
    let (catalog, _, character, modifier) = widget_fixture();
    let mut prices = PriceBook::new().with_clock(NOW);
    prices.set_adjusted(
        ORE,
        Quote {
            price: 2.0,
            updated_at: NOW - 2 * 86400,
        },
    );
    prices.set_buy(
        ORE,
        RegionId(1),
        Quote {
            price: 2.5,
            updated_at: NOW,
        },
    );
    let resolver = Resolver::new(&catalog, &prices, &character, &modifier).with_settings(settings());

    let err = resolver
        .manufacture(WIDGET, 10.0, None, RecursionBudget::NONE)
        .unwrap_err();
    assert!(matches!(err, IndustryError::PriceTooStale { item, .. } if item == ORE));
}

#[test]
fn missing_prices_everywhere_surface_unavailable() {
    let (catalog, _, character, modifier) = widget_fixture();
    let prices = PriceBook::new().with_clock(NOW);
    let resolver = Resolver::new(&catalog, &prices, &character, &modifier).with_settings(settings());

    let err = resolver
        .manufacture(WIDGET, 10.0, None, RecursionBudget::NONE)
        .unwrap_err();
    assert!(matches!(err, IndustryError::PriceUnavailable { item, .. } if item == ORE));
}

#[test]
fn material_efficiency_reduces_rounded_inputs() {
    let (catalog, prices, character, modifier) = widget_fixture();
    let resolver = Resolver::new(&catalog, &prices, &character, &modifier);

    let node = resolver
        .manufacture(WIDGET, 5.0, Some(BlueprintLevels::new(-10, 0)), RecursionBudget::NONE)
        .unwrap();
    assert_eq!(node.materials().get(ORE), 9.0);
}

#[test]
fn out_of_range_levels_are_rejected() {
    let (catalog, prices, character, modifier) = widget_fixture();
    let resolver = Resolver::new(&catalog, &prices, &character, &modifier);

    let err = resolver
        .manufacture(WIDGET, 1.0, Some(BlueprintLevels::new(-11, 0)), RecursionBudget::NONE)
        .unwrap_err();
    assert!(matches!(err, IndustryError::InvalidResearchLevels { .. }));
}

#[test]
fn incompatible_facility_makes_activity_impossible() {
    let (catalog, prices, character, _) = widget_fixture();
    let modifier = IndustryModifier::new(LocationId(9), 0.0).with_line(AssemblyLine::new(
        FacilityId(3),
        RecipeActivity::Manufacturing,
        Default::default(),
    ));
    let resolver = Resolver::new(&catalog, &prices, &character, &modifier);

    let err = resolver
        .manufacture(WIDGET, 1.0, None, RecursionBudget::NONE)
        .unwrap_err();
    assert_eq!(
        err,
        IndustryError::ActivityNotPossible {
            activity: RecipeActivity::Manufacturing,
            item: WIDGET,
        }
    );
}

#[test]
fn invention_success_metrics_divide_by_probability() {
    let node = ProcessNode::new(
        RecipeActivity::Inventing,
        WIDGET_BLUEPRINT,
        None,
        1.0,
        ProcessDetail::Invention(InventionResult {
            probability: 0.25,
            runs: 1,
            me: -2,
            te: -4,
            attempts: 1,
            target: None,
            decryptor: None,
        }),
    )
    .with_cost(100.0)
    .with_time(1000.0);

    assert!((node.success_process_cost() - 400.0).abs() < 1e-9);
    assert!((node.success_time() - 4000.0).abs() < 1e-9);
}

#[test]
fn copy_plans_are_pure_cost() {
    let env = sample::Environment::new();
    let node = env
        .resolver()
        .copy(ids::RIFTER_BLUEPRINT, 2, CopyRuns::Exact(10), RecursionBudget::NONE)
        .unwrap();
    let hour = Duration::from_secs(3600);
    let valuation = Valuation {
        catalog: &env.catalog,
        pricing: &env.prices,
        sell_tax_factor: 1.0,
        buy: PriceContext::new(sample::HUB, hour),
        sell: PriceContext::new(sample::HUB, hour),
    };

    let cost = node.total_cost(&env.prices, &valuation.buy).unwrap();
    assert!(cost > 0.0);
    assert!((node.total_profit(&valuation).unwrap() + cost).abs() < 1e-6);
}

#[test]
fn research_ranges_are_validated() {
    let env = sample::Environment::new();
    let resolver = env.resolver();

    let backwards = resolver.research_me(ids::RIFTER_BLUEPRINT, 5, 3, RecursionBudget::NONE);
    assert!(matches!(backwards, Err(IndustryError::InvalidResearchLevels { .. })));

    let odd = resolver.research_te(ids::RIFTER_BLUEPRINT, 1, 4, RecursionBudget::NONE);
    assert!(matches!(odd, Err(IndustryError::InvalidResearchLevels { .. })));

    assert!(resolver
        .research_me(ids::RIFTER_BLUEPRINT, 0, 10, RecursionBudget::NONE)
        .is_ok());
}

#[test]
fn level_factor_reduces_by_percent() {
    assert!((level_factor(-10) - 0.9).abs() < 1e-12);
    assert!((level_factor(10) - 0.9).abs() < 1e-12);
    assert_eq!(level_factor(0), 1.0);
}

#[test]
fn rollups_sum_time_and_keep_highest_skill() {
    let skill = TypeId(3380);
    let leaf = |time: f64, level: u8| {
        let mut skills = SkillMap::new();
        skills.require(skill, level);
        ProcessNode::new(
            RecipeActivity::Manufacturing,
            WIDGET_BLUEPRINT,
            Some(WIDGET),
            1.0,
            ProcessDetail::Manufacture {
                me: 0,
                te: 0,
                portions: 1.0,
            },
        )
        .with_time(time)
        .with_skills(skills)
    };

    let tree = leaf(5.0, 1)
        .with_child(leaf(10.0, 4))
        .with_child(leaf(20.0, 2));

    assert_eq!(tree.total_time(), 35.0);
    assert_eq!(tree.total_skills().level(skill), 4);
    assert_eq!(tree.node_count(), 3);
}

#[test]
fn invented_manufacture_carries_invention_children() {
    let env = sample::Environment::new();
    let node = env
        .resolver()
        .manufacture_invented(ids::WOLF, 1.0, None, RecursionBudget::NONE)
        .unwrap();

    let invention = node
        .children()
        .iter()
        .find(|c| c.activity() == RecipeActivity::Inventing)
        .unwrap();
    assert!(invention.probability().unwrap() > 0.0);
    assert!(node.total_success_time() >= node.total_time());
}

#[test]
fn relic_style_inventor_without_manufacturing_still_invents() {
    let mut catalog = MemoryCatalog::new();
    catalog.add_item(item(TypeId(600), "Relic", 34));
    catalog.add_item(item(WIDGET_BLUEPRINT, "Widget Blueprint", 9));
    catalog.add_item(item(WIDGET, "Widget", 6));
    catalog.add_item(item(ORE, "Ore", 4));

    let mut relic = Blueprint::new(TypeId(600), 1);
    relic.invention = Some(InventionData {
        activity: ActivityData {
            time: 3600,
            materials: [(ORE, 1.0)].into_iter().collect(),
            skills: SkillMap::new(),
        },
        products: vec![WIDGET_BLUEPRINT],
        base_probability: 0.5,
        base_runs: 3,
        science_skills: [TypeId(900), TypeId(901)],
        encryption_skill: TypeId(902),
    });
    catalog.add_blueprint(relic);

    let mut widget = Blueprint::new(WIDGET_BLUEPRINT, 10);
    widget.manufacturing = Some(ManufacturingData {
        activity: ActivityData {
            time: 60,
            materials: [(ORE, 4.0)].into_iter().collect(),
            skills: SkillMap::new(),
        },
        product: WIDGET,
        portion_size: 1,
    });
    catalog.add_blueprint(widget);

    let mut prices = PriceBook::new().with_clock(NOW);
    prices.set_adjusted(
        ORE,
        Quote {
            price: 10.0,
            updated_at: NOW,
        },
    );
    let modifier = IndustryModifier::new(LocationId(9), 0.0)
        .with_line(AssemblyLine::station(FacilityId(1), RecipeActivity::Inventing));
    let character = CharacterProfile::new();
    let resolver = Resolver::new(&catalog, &prices, &character, &modifier);

    let node = resolver
        .invent(TypeId(600), Some(WIDGET_BLUEPRINT), None, RecursionBudget::NONE)
        .unwrap();
    assert_eq!(node.probability(), Some(0.5));
    assert_eq!(node.time(), 3600.0);
    // 2% of 4 ore at 10
    assert!((node.cost() - 0.8).abs() < 1e-9);
    assert!((node.success_process_cost() - 1.6).abs() < 1e-9);
}

#[test]
fn sample_database_round_trip_resolves() {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    db::store_catalog(&conn, &sample::catalog()).unwrap();

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    for (kind, item, region, price) in sample::price_quotes() {
        db::upsert_price(&conn, kind, item, region, price, now).unwrap();
    }

    let catalog = db::load_catalog(&conn).unwrap();
    let prices = db::load_prices(&conn).unwrap();
    let character = sample::character();
    let modifier = sample::modifier();
    let resolver = Resolver::new(&catalog, &prices, &character, &modifier);

    let node = resolver
        .manufacture(ids::WOLF, 1.0, None, RecursionBudget::new(1, 1))
        .unwrap();
    assert!(node.node_count() > 1);

    let hour = Duration::from_secs(3600);
    let ctx = PriceContext::new(sample::HUB, hour);
    assert!(node.total_cost(&prices, &ctx).unwrap() > 0.0);
    assert!(prices.buy_price(ids::TRITANIUM, sample::HUB, hour).is_ok());
    assert!(sample::price_quotes()
        .iter()
        .any(|(kind, _, _, _)| *kind == PriceKind::Adjusted));
}

//! Small self-consistent data set: a frigate line with its tech II
//! invention, projectile ammunition and a fernite reaction chain
//! (including an alchemy formula).
//!
//! Seeds the store for `load-sample` and backs the unit tests.

use crate::character::{CharacterProfile, skills};
use crate::catalog::MemoryCatalog;
use crate::models::{
    ActivityData, Blueprint, Decryptor, FacilityId, InventionData, ItemInfo, LocationId,
    ManufacturingData, Reaction, RecipeActivity, RegionId, TypeId,
};
use crate::modifier::{AssemblyLine, IndustryModifier, ModifierTriple};
use crate::pricing::{PriceBook, PriceKind, Quote};
use crate::quantity::{MaterialMap, SkillMap};
use crate::resolver::Resolver;

pub mod ids {
    use crate::models::TypeId;

    pub const TRITANIUM: TypeId = TypeId(34);
    pub const PYERITE: TypeId = TypeId(35);
    pub const MEXALLON: TypeId = TypeId(36);
    pub const ISOGEN: TypeId = TypeId(37);

    pub const RIFTER: TypeId = TypeId(587);
    pub const RIFTER_BLUEPRINT: TypeId = TypeId(691);
    pub const WOLF: TypeId = TypeId(11371);
    pub const WOLF_BLUEPRINT: TypeId = TypeId(11372);
    pub const EMP_S: TypeId = TypeId(185);
    pub const EMP_S_BLUEPRINT: TypeId = TypeId(1136);

    pub const DATACORE_ELECTRONIC: TypeId = TypeId(20418);
    pub const DATACORE_MECHANICAL: TypeId = TypeId(20424);
    pub const ACCELERANT_DECRYPTOR: TypeId = TypeId(34201);

    pub const HYDROCARBONS: TypeId = TypeId(16633);
    pub const SILICATES: TypeId = TypeId(16636);
    pub const TITANIUM: TypeId = TypeId(16638);
    pub const SCANDIUM: TypeId = TypeId(16639);
    pub const FERNITE_ALLOY: TypeId = TypeId(16657);
    pub const UNREFINED_FERNITE_ALLOY: TypeId = TypeId(17960);
    pub const FERNITE_CARBIDE: TypeId = TypeId(16673);
    pub const FERNITE_ALLOY_REACTION: TypeId = TypeId(46166);
    pub const UNREFINED_FERNITE_ALLOY_REACTION: TypeId = TypeId(46182);
    pub const FERNITE_CARBIDE_REACTION: TypeId = TypeId(46205);

    pub const MECHANICAL_ENGINEERING: TypeId = TypeId(3392);
    pub const ELECTRONIC_ENGINEERING: TypeId = TypeId(3394);
    pub const MINMATAR_ENCRYPTION: TypeId = TypeId(21791);
}

/// Market hub used for every sample buy and sell quote.
pub const HUB: RegionId = RegionId(10000002);

/// Station the sample modifier operates from.
pub const STATION: LocationId = LocationId(60003760);

/// Fixed clock for sample prices used in tests.
pub const SAMPLE_EPOCH: u64 = 1_700_000_000;

fn materials(entries: &[(TypeId, f64)]) -> MaterialMap {
    entries.iter().copied().collect()
}

fn skill_set(entries: &[(TypeId, u8)]) -> SkillMap {
    entries.iter().copied().collect()
}

fn activity(time: u32, mats: &[(TypeId, f64)], skills: &[(TypeId, u8)]) -> ActivityData {
    ActivityData {
        time,
        materials: materials(mats),
        skills: skill_set(skills),
    }
}

fn item(id: TypeId, name: &str, group_id: u32, category_id: u32, portion_size: u32) -> ItemInfo {
    ItemInfo {
        id,
        name: name.to_string(),
        group_id,
        category_id,
        portion_size,
        // Blueprints and reaction formulas
        sellable: !matches!(category_id, 9 | 24),
    }
}

pub fn items() -> Vec<ItemInfo> {
    use ids::*;
    vec![
        item(TRITANIUM, "Tritanium", 18, 4, 1),
        item(PYERITE, "Pyerite", 18, 4, 1),
        item(MEXALLON, "Mexallon", 18, 4, 1),
        item(ISOGEN, "Isogen", 18, 4, 1),
        item(RIFTER, "Rifter", 25, 6, 1),
        item(RIFTER_BLUEPRINT, "Rifter Blueprint", 105, 9, 1),
        item(WOLF, "Wolf", 324, 6, 1),
        item(WOLF_BLUEPRINT, "Wolf Blueprint", 105, 9, 1),
        item(EMP_S, "EMP S", 83, 8, 100),
        item(EMP_S_BLUEPRINT, "EMP S Blueprint", 166, 9, 1),
        item(DATACORE_ELECTRONIC, "Datacore - Electronic Engineering", 333, 17, 1),
        item(DATACORE_MECHANICAL, "Datacore - Mechanical Engineering", 333, 17, 1),
        item(ACCELERANT_DECRYPTOR, "Accelerant Decryptor", 1304, 17, 1),
        item(HYDROCARBONS, "Hydrocarbons", 427, 4, 1),
        item(SILICATES, "Silicates", 427, 4, 1),
        item(TITANIUM, "Titanium", 427, 4, 1),
        item(SCANDIUM, "Scandium", 427, 4, 1),
        item(FERNITE_ALLOY, "Fernite Alloy", 428, 4, 1),
        item(UNREFINED_FERNITE_ALLOY, "Unrefined Fernite Alloy", 428, 4, 100),
        item(FERNITE_CARBIDE, "Fernite Carbide", 429, 4, 1),
        item(FERNITE_ALLOY_REACTION, "Fernite Alloy Reaction Formula", 1888, 24, 1),
        item(
            UNREFINED_FERNITE_ALLOY_REACTION,
            "Unrefined Fernite Alloy Reaction Formula",
            1888,
            24,
            1,
        ),
        item(FERNITE_CARBIDE_REACTION, "Fernite Carbide Reaction Formula", 1888, 24, 1),
    ]
}

pub fn blueprints() -> Vec<Blueprint> {
    use ids::*;

    let mut rifter = Blueprint::new(RIFTER_BLUEPRINT, 300);
    rifter.manufacturing = Some(ManufacturingData {
        activity: activity(
            6000,
            &[
                (TRITANIUM, 25000.0),
                (PYERITE, 6000.0),
                (MEXALLON, 2500.0),
                (ISOGEN, 500.0),
            ],
            &[(skills::INDUSTRY, 1)],
        ),
        product: RIFTER,
        portion_size: 1,
    });
    rifter.copying = Some(activity(4800, &[], &[(skills::SCIENCE, 1)]));
    rifter.research_material = Some(activity(2100, &[], &[(skills::METALLURGY, 1)]));
    rifter.research_time = Some(activity(2100, &[], &[(skills::RESEARCH, 1)]));
    rifter.invention = Some(InventionData {
        activity: activity(
            63900,
            &[(DATACORE_MECHANICAL, 2.0), (DATACORE_ELECTRONIC, 2.0)],
            &[
                (MECHANICAL_ENGINEERING, 1),
                (ELECTRONIC_ENGINEERING, 1),
                (MINMATAR_ENCRYPTION, 1),
            ],
        ),
        products: vec![WOLF_BLUEPRINT],
        base_probability: 0.3,
        base_runs: 1,
        science_skills: [MECHANICAL_ENGINEERING, ELECTRONIC_ENGINEERING],
        encryption_skill: MINMATAR_ENCRYPTION,
    });

    let mut wolf = Blueprint::new(WOLF_BLUEPRINT, 10);
    wolf.manufacturing = Some(ManufacturingData {
        activity: activity(
            10000,
            &[(RIFTER, 1.0), (FERNITE_CARBIDE, 1500.0), (TRITANIUM, 10000.0)],
            &[(skills::INDUSTRY, 5), (MECHANICAL_ENGINEERING, 1)],
        ),
        product: WOLF,
        portion_size: 1,
    });

    let mut emp = Blueprint::new(EMP_S_BLUEPRINT, 10000);
    emp.manufacturing = Some(ManufacturingData {
        activity: activity(300, &[(TRITANIUM, 500.0)], &[(skills::INDUSTRY, 1)]),
        product: EMP_S,
        portion_size: 100,
    });
    emp.copying = Some(activity(240, &[], &[(skills::SCIENCE, 1)]));
    emp.research_material = Some(activity(105, &[], &[(skills::METALLURGY, 1)]));
    emp.research_time = Some(activity(105, &[], &[(skills::RESEARCH, 1)]));

    vec![rifter, wolf, emp]
}

pub fn reactions() -> Vec<Reaction> {
    use ids::*;
    let reacting = skill_set(&[(skills::REACTIONS, 1)]);
    vec![
        Reaction {
            id: FERNITE_ALLOY_REACTION,
            inputs: materials(&[(SCANDIUM, 100.0), (HYDROCARBONS, 100.0)]),
            outputs: materials(&[(FERNITE_ALLOY, 200.0)]),
            skills: reacting.clone(),
            primary_output: FERNITE_ALLOY,
        },
        Reaction {
            id: UNREFINED_FERNITE_ALLOY_REACTION,
            inputs: materials(&[(SCANDIUM, 100.0), (SILICATES, 100.0)]),
            outputs: materials(&[(UNREFINED_FERNITE_ALLOY, 200.0)]),
            skills: reacting.clone(),
            primary_output: UNREFINED_FERNITE_ALLOY,
        },
        Reaction {
            id: FERNITE_CARBIDE_REACTION,
            inputs: materials(&[(FERNITE_ALLOY, 100.0), (TITANIUM, 100.0)]),
            outputs: materials(&[(FERNITE_CARBIDE, 10000.0)]),
            skills: reacting,
            primary_output: FERNITE_CARBIDE,
        },
    ]
}

pub fn decryptors() -> Vec<Decryptor> {
    vec![Decryptor {
        id: ids::ACCELERANT_DECRYPTOR,
        probability_modifier: 1.2,
        run_modifier: 1,
        me_modifier: 2,
        te_modifier: 10,
    }]
}

/// Per-portion reprocessing yields.
pub fn reprocessing() -> Vec<(TypeId, MaterialMap)> {
    use ids::*;
    vec![(
        UNREFINED_FERNITE_ALLOY,
        materials(&[(FERNITE_ALLOY, 50.0), (SCANDIUM, 20.0)]),
    )]
}

/// (item, adjusted, buy, sell) at [`HUB`].
const PRICES: &[(TypeId, f64, f64, f64)] = &[
    (ids::TRITANIUM, 4.0, 4.5, 5.0),
    (ids::PYERITE, 9.0, 10.0, 11.0),
    (ids::MEXALLON, 60.0, 65.0, 70.0),
    (ids::ISOGEN, 100.0, 110.0, 120.0),
    (ids::RIFTER, 300_000.0, 320_000.0, 350_000.0),
    (ids::WOLF, 25_000_000.0, 28_000_000.0, 30_000_000.0),
    (ids::EMP_S, 8.0, 9.0, 10.0),
    (ids::DATACORE_ELECTRONIC, 40_000.0, 45_000.0, 50_000.0),
    (ids::DATACORE_MECHANICAL, 40_000.0, 45_000.0, 50_000.0),
    (ids::ACCELERANT_DECRYPTOR, 500_000.0, 550_000.0, 600_000.0),
    (ids::HYDROCARBONS, 450.0, 500.0, 550.0),
    (ids::SILICATES, 20.0, 20.0, 25.0),
    (ids::TITANIUM, 60.0, 65.0, 70.0),
    (ids::SCANDIUM, 100.0, 100.0, 110.0),
    (ids::FERNITE_ALLOY, 250.0, 260.0, 280.0),
    (ids::UNREFINED_FERNITE_ALLOY, 100.0, 110.0, 120.0),
    (ids::FERNITE_CARBIDE, 20.0, 22.0, 25.0),
];

/// Every sample quote as (kind, item, region, price). Adjusted prices have no region.
pub fn price_quotes() -> Vec<(PriceKind, TypeId, Option<RegionId>, f64)> {
    PRICES
        .iter()
        .flat_map(|&(item, adjusted, buy, sell)| {
            [
                (PriceKind::Adjusted, item, None, adjusted),
                (PriceKind::Buy, item, Some(HUB), buy),
                (PriceKind::Sell, item, Some(HUB), sell),
            ]
        })
        .collect()
}

pub fn catalog() -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();
    for item in items() {
        catalog.add_item(item);
    }
    for blueprint in blueprints() {
        catalog.add_blueprint(blueprint);
    }
    for reaction in reactions() {
        catalog.add_reaction(reaction);
    }
    for decryptor in decryptors() {
        catalog.add_decryptor(decryptor);
    }
    for (item, yields) in reprocessing() {
        catalog.set_reprocessing(item, yields);
    }
    catalog
}

/// Sample quotes observed at `now`, with age checks pinned to `now`.
pub fn prices(now: u64) -> PriceBook {
    let mut book = PriceBook::new().with_clock(now);
    for (kind, item, region, price) in price_quotes() {
        let quote = Quote {
            price,
            updated_at: now,
        };
        match (kind, region) {
            (PriceKind::Adjusted, _) => book.set_adjusted(item, quote),
            (PriceKind::Buy, Some(region)) => book.set_buy(item, region, quote),
            (PriceKind::Sell, Some(region)) => book.set_sell(item, region, quote),
            _ => {}
        }
    }
    book
}

/// A neutral station for every activity plus an engineering complex with
/// ship and research bonuses.
pub fn modifier() -> IndustryModifier {
    let mut modifier = IndustryModifier::new(STATION, 0.1)
        .with_cost_index(RecipeActivity::Manufacturing, 0.05)
        .with_cost_index(RecipeActivity::Copying, 0.02)
        .with_cost_index(RecipeActivity::MaterialResearch, 0.03)
        .with_cost_index(RecipeActivity::TimeResearch, 0.03)
        .with_cost_index(RecipeActivity::Inventing, 0.04)
        .with_cost_index(RecipeActivity::Reacting, 0.03);

    for activity in RecipeActivity::ALL {
        modifier.add_line(AssemblyLine::station(FacilityId(1), activity));
    }

    let complex = ModifierTriple::new(1.0, 0.85, 0.97);
    modifier.add_line(
        AssemblyLine::new(FacilityId(2), RecipeActivity::Manufacturing, complex)
            .with_category(6, ModifierTriple::new(0.99, 1.0, 1.0))
            .with_category(7, ModifierTriple::NEUTRAL),
    );
    for activity in [RecipeActivity::MaterialResearch, RecipeActivity::TimeResearch] {
        modifier.add_line(
            AssemblyLine::new(FacilityId(2), activity, complex)
                .with_category(9, ModifierTriple::NEUTRAL),
        );
    }
    modifier
}

/// A capable industrialist who owns researched originals of the tech I blueprints.
pub fn character() -> CharacterProfile {
    let mut character = CharacterProfile::new();
    for (skill, level) in [
        (skills::INDUSTRY, 5),
        (skills::ADVANCED_INDUSTRY, 4),
        (skills::SCIENCE, 5),
        (skills::RESEARCH, 4),
        (skills::METALLURGY, 4),
        (skills::REACTIONS, 4),
        (skills::REPROCESSING, 5),
        (skills::REPROCESSING_EFFICIENCY, 5),
        (skills::ACCOUNTING, 4),
        (skills::BROKER_RELATIONS, 3),
        (ids::MECHANICAL_ENGINEERING, 4),
        (ids::ELECTRONIC_ENGINEERING, 4),
        (ids::MINMATAR_ENCRYPTION, 3),
    ] {
        character.set_skill(skill, level);
    }
    character.set_blueprint_levels(ids::RIFTER_BLUEPRINT, 10, 20);
    character.set_blueprint_levels(ids::EMP_S_BLUEPRINT, 10, 20);
    character
}

/// Everything a resolver borrows, owned in one place.
pub struct Environment {
    pub catalog: MemoryCatalog,
    pub prices: PriceBook,
    pub character: CharacterProfile,
    pub modifier: IndustryModifier,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            catalog: catalog(),
            prices: prices(SAMPLE_EPOCH),
            character: character(),
            modifier: modifier(),
        }
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.catalog, &self.prices, &self.character, &self.modifier)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

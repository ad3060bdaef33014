//! In-memory recipe catalog

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{IndustryError, Result};
use crate::models::{Blueprint, Decryptor, ItemClass, ItemInfo, Reaction, TypeId};
use crate::quantity::MaterialMap;
use crate::sources::Catalog;

/// Catalog held fully in memory, loaded from the SQLite store or built by hand.
///
/// Indices from product to blueprint, from invented blueprint to inventor and
/// of every reaction product (direct or through reprocessing an alchemy
/// output) are maintained as records are added, so classification is a lookup.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    items: HashMap<TypeId, ItemInfo>,
    blueprints: HashMap<TypeId, Blueprint>,
    reactions: BTreeMap<TypeId, Reaction>,
    decryptors: HashMap<TypeId, Decryptor>,
    reprocessing: HashMap<TypeId, MaterialMap>,
    product_index: HashMap<TypeId, TypeId>,
    invented_by: HashMap<TypeId, TypeId>,
    reaction_products: HashSet<TypeId>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, item: ItemInfo) {
        self.items.insert(item.id, item);
    }

    pub fn add_blueprint(&mut self, blueprint: Blueprint) {
        if let Some(manufacturing) = &blueprint.manufacturing {
            self.product_index.insert(manufacturing.product, blueprint.id);
        }
        if let Some(invention) = &blueprint.invention {
            for product in &invention.products {
                self.invented_by.insert(*product, blueprint.id);
            }
        }
        self.blueprints.insert(blueprint.id, blueprint);
    }

    pub fn add_reaction(&mut self, reaction: Reaction) {
        self.reactions.insert(reaction.id, reaction);
        self.index_reaction_products();
    }

    pub fn add_decryptor(&mut self, decryptor: Decryptor) {
        self.decryptors.insert(decryptor.id, decryptor);
    }

    pub fn set_reprocessing(&mut self, item: TypeId, materials: MaterialMap) {
        self.reprocessing.insert(item, materials);
        self.index_reaction_products();
    }

    fn index_reaction_products(&mut self) {
        let mut products = HashSet::new();
        for reaction in self.reactions.values() {
            for out in reaction.outputs.items() {
                products.insert(out);
                if let Some(yields) = self.reprocessing.get(&out) {
                    products.extend(yields.items());
                }
            }
        }
        self.reaction_products = products;
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemInfo> {
        self.items.values()
    }

    pub fn blueprints(&self) -> impl Iterator<Item = &Blueprint> {
        self.blueprints.values()
    }

    pub fn reactions(&self) -> impl Iterator<Item = &Reaction> {
        self.reactions.values()
    }

    pub fn decryptors(&self) -> impl Iterator<Item = &Decryptor> {
        self.decryptors.values()
    }

    pub fn reprocessing(&self) -> impl Iterator<Item = (TypeId, &MaterialMap)> {
        self.reprocessing.iter().map(|(item, yields)| (*item, yields))
    }

    /// Display name, falling back to the numeric id.
    pub fn name(&self, id: TypeId) -> String {
        self.items
            .get(&id)
            .map(|i| i.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }

    /// Find an item by exact (case-insensitive) name.
    pub fn find_by_name(&self, name: &str) -> Option<TypeId> {
        let mut found: Vec<&ItemInfo> = self
            .items
            .values()
            .filter(|i| i.name.eq_ignore_ascii_case(name))
            .collect();
        found.sort_by_key(|i| i.id);
        found.first().map(|i| i.id)
    }

    fn classify_blueprint(&self, blueprint: &Blueprint) -> ItemClass {
        if blueprint.invention.is_some() && blueprint.manufacturing.is_none() {
            return ItemClass::Relic;
        }
        if let Some(inventor) = self.invented_by.get(&blueprint.id) {
            let from_relic = self
                .blueprints
                .get(inventor)
                .is_some_and(|b| b.manufacturing.is_none());
            return if from_relic {
                ItemClass::T3Blueprint
            } else {
                ItemClass::InventableBlueprint
            };
        }
        if blueprint.invention.is_some() {
            return ItemClass::InventorBlueprint;
        }
        ItemClass::Item
    }

    fn alchemy_yields(&self, reaction: &Reaction, item: TypeId) -> bool {
        reaction.outputs.items().any(|out| {
            self.reprocessing
                .get(&out)
                .is_some_and(|yields| yields.contains(item))
        })
    }
}

impl Catalog for MemoryCatalog {
    fn item(&self, id: TypeId) -> Result<&ItemInfo> {
        self.items.get(&id).ok_or(IndustryError::ItemNotFound(id))
    }

    fn classify(&self, id: TypeId) -> ItemClass {
        if self.decryptors.contains_key(&id) {
            return ItemClass::Decryptor;
        }
        if let Some(blueprint) = self.blueprints.get(&id) {
            return self.classify_blueprint(blueprint);
        }
        if self.reactions.contains_key(&id) {
            return ItemClass::Reaction;
        }
        if let Some(blueprint) = self.product_index.get(&id) {
            return ItemClass::Manufacturable {
                blueprint: *blueprint,
            };
        }
        if self.reaction_products.contains(&id) {
            return ItemClass::ReactionProduct;
        }
        ItemClass::Item
    }

    fn blueprint(&self, id: TypeId) -> Result<&Blueprint> {
        self.blueprints
            .get(&id)
            .ok_or(IndustryError::RecipeNotFound(id))
    }

    fn blueprint_for_product(&self, product: TypeId) -> Result<&Blueprint> {
        self.product_index
            .get(&product)
            .and_then(|bp| self.blueprints.get(bp))
            .ok_or(IndustryError::RecipeNotFound(product))
    }

    fn reactions_producing(&self, item: TypeId) -> Vec<&Reaction> {
        self.reactions
            .values()
            .filter(|r| r.outputs.contains(item) || self.alchemy_yields(r, item))
            .collect()
    }

    fn reaction(&self, id: TypeId) -> Result<&Reaction> {
        self.reactions
            .get(&id)
            .ok_or(IndustryError::RecipeNotFound(id))
    }

    fn inventor_of(&self, blueprint: TypeId) -> Option<TypeId> {
        self.invented_by.get(&blueprint).copied()
    }

    fn decryptor(&self, id: TypeId) -> Result<&Decryptor> {
        self.decryptors
            .get(&id)
            .ok_or(IndustryError::ItemNotFound(id))
    }

    fn reprocessing_materials(&self, item: TypeId) -> Option<&MaterialMap> {
        self.reprocessing.get(&item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityData, InventionData, ManufacturingData};
    use crate::quantity::SkillMap;

    fn manufacturing(product: u32) -> ManufacturingData {
        ManufacturingData {
            activity: ActivityData::default(),
            product: TypeId(product),
            portion_size: 1,
        }
    }

    fn invention(products: &[u32]) -> InventionData {
        InventionData {
            activity: ActivityData::default(),
            products: products.iter().map(|p| TypeId(*p)).collect(),
            base_probability: 0.3,
            base_runs: 10,
            science_skills: [TypeId(900), TypeId(901)],
            encryption_skill: TypeId(902),
        }
    }

    #[test]
    fn classifies_blueprint_family() {
        let mut catalog = MemoryCatalog::new();

        let mut t1 = Blueprint::new(TypeId(10), 300);
        t1.manufacturing = Some(manufacturing(11));
        t1.invention = Some(invention(&[20]));
        catalog.add_blueprint(t1);

        let mut t2 = Blueprint::new(TypeId(20), 10);
        t2.manufacturing = Some(manufacturing(21));
        catalog.add_blueprint(t2);

        let mut relic = Blueprint::new(TypeId(30), 1);
        relic.invention = Some(invention(&[40]));
        catalog.add_blueprint(relic);

        let mut t3 = Blueprint::new(TypeId(40), 10);
        t3.manufacturing = Some(manufacturing(41));
        catalog.add_blueprint(t3);

        assert_eq!(catalog.classify(TypeId(10)), ItemClass::InventorBlueprint);
        assert_eq!(catalog.classify(TypeId(20)), ItemClass::InventableBlueprint);
        assert_eq!(catalog.classify(TypeId(30)), ItemClass::Relic);
        assert_eq!(catalog.classify(TypeId(40)), ItemClass::T3Blueprint);
        assert_eq!(
            catalog.classify(TypeId(21)),
            ItemClass::Manufacturable {
                blueprint: TypeId(20)
            }
        );
        assert!(catalog.is_manufacturable(TypeId(11)));
        assert_eq!(catalog.classify(TypeId(999)), ItemClass::Item);
    }

    #[test]
    fn alchemy_reactions_are_found_through_reprocessing() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_reaction(Reaction {
            id: TypeId(100),
            inputs: [(TypeId(1), 100.0)].into_iter().collect(),
            outputs: [(TypeId(5), 200.0)].into_iter().collect(),
            skills: SkillMap::new(),
            primary_output: TypeId(5),
        });
        catalog.add_reaction(Reaction {
            id: TypeId(101),
            inputs: [(TypeId(2), 100.0)].into_iter().collect(),
            outputs: [(TypeId(6), 1.0)].into_iter().collect(),
            skills: SkillMap::new(),
            primary_output: TypeId(6),
        });
        catalog.set_reprocessing(TypeId(6), [(TypeId(5), 150.0)].into_iter().collect());

        let producers: Vec<TypeId> = catalog
            .reactions_producing(TypeId(5))
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(producers, vec![TypeId(100), TypeId(101)]);
        assert!(catalog.is_reaction_product(TypeId(5)));
        assert!(catalog.is_reprocessable(TypeId(6)));
        assert!(catalog.is_reaction_product(TypeId(6)));
        assert!(!catalog.is_reaction_product(TypeId(1)));
        assert_eq!(catalog.classify(TypeId(100)), ItemClass::Reaction);
    }

    #[test]
    fn items_only_reachable_by_alchemy_are_reaction_products() {
        let mut catalog = MemoryCatalog::new();
        // Reprocessing registered before the formula that yields the item.
        catalog.set_reprocessing(TypeId(6), [(TypeId(5), 150.0)].into_iter().collect());
        catalog.add_reaction(Reaction {
            id: TypeId(101),
            inputs: [(TypeId(2), 100.0)].into_iter().collect(),
            outputs: [(TypeId(6), 1.0)].into_iter().collect(),
            skills: SkillMap::new(),
            primary_output: TypeId(6),
        });

        assert_eq!(catalog.reactions_producing(TypeId(5)).len(), 1);
        assert_eq!(catalog.classify(TypeId(5)), ItemClass::ReactionProduct);
        assert!(catalog.is_reaction_product(TypeId(5)));
    }

    #[test]
    fn missing_records_surface_errors() {
        let catalog = MemoryCatalog::new();
        assert_eq!(
            catalog.blueprint_for_product(TypeId(7)).unwrap_err(),
            IndustryError::RecipeNotFound(TypeId(7))
        );
        assert_eq!(
            catalog.item(TypeId(7)).unwrap_err(),
            IndustryError::ItemNotFound(TypeId(7))
        );
    }
}

//! Reprocessing yield calculation

use crate::error::{IndustryError, Result};
use crate::models::TypeId;
use crate::quantity::MaterialMap;
use crate::sources::{Catalog, Character, Reprocessor};

/// Yield = base materials per portion × portions × character factor × (1 − tax).
///
/// Portions are not rounded: reaction cycles are fractional and the netted
/// result feeds further arithmetic rather than an inventory.
pub struct StandardReprocessing<'a> {
    catalog: &'a dyn Catalog,
    character: &'a dyn Character,
}

impl<'a> StandardReprocessing<'a> {
    pub fn new(catalog: &'a dyn Catalog, character: &'a dyn Character) -> Self {
        Self { catalog, character }
    }
}

impl Reprocessor for StandardReprocessing<'_> {
    fn reprocess(&self, item: TypeId, quantity: f64) -> Result<MaterialMap> {
        let base = self
            .catalog
            .reprocessing_materials(item)
            .ok_or(IndustryError::RecipeNotFound(item))?;
        let portion = f64::from(self.catalog.item(item)?.portion_size.max(1));
        let factor = self.character.reprocessing_factor(item) * (1.0 - self.character.reprocessing_tax());

        Ok(base.scaled(quantity / portion * factor)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::character::{CharacterProfile, skills};
    use crate::models::ItemInfo;

    #[test]
    fn yield_scales_with_portions_and_skills() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_item(ItemInfo {
            id: TypeId(7),
            name: "Unrefined Alloy".to_string(),
            group_id: 1,
            category_id: 4,
            portion_size: 100,
            sellable: true,
        });
        catalog.set_reprocessing(TypeId(7), [(TypeId(8), 50.0)].into_iter().collect());

        let mut character = CharacterProfile::new().with_skill(skills::REPROCESSING, 5);
        character.reprocessing_tax = 0.1;
        let reprocessor = StandardReprocessing::new(&catalog, &character);

        let out = reprocessor.reprocess(TypeId(7), 200.0).unwrap();
        let expected = 50.0 * 2.0 * (0.5 * 1.15) * 0.9;
        assert!((out.get(TypeId(8)) - expected).abs() < 1e-9);
    }

    #[test]
    fn unknown_item_cannot_be_reprocessed() {
        let catalog = MemoryCatalog::new();
        let character = CharacterProfile::new();
        let reprocessor = StandardReprocessing::new(&catalog, &character);
        assert!(reprocessor.reprocess(TypeId(1), 1.0).is_err());
    }
}

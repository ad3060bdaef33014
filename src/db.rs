//! Database schema and operations

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;

use crate::catalog::MemoryCatalog;
use crate::models::{
    ActivityData, Blueprint, Decryptor, InventionData, ItemInfo, ManufacturingData, Reaction,
    RecipeActivity, RegionId, TypeId,
};
use crate::pricing::{PriceBook, PriceKind, Quote};
use crate::quantity::{MaterialMap, SkillMap};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Static item data
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            group_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            portion_size INTEGER NOT NULL DEFAULT 1,
            sellable INTEGER NOT NULL DEFAULT 1
        );

        -- Blueprints and relics
        CREATE TABLE IF NOT EXISTS blueprints (
            id INTEGER PRIMARY KEY,
            max_production_limit INTEGER NOT NULL
        );

        -- One row per activity a blueprint supports
        CREATE TABLE IF NOT EXISTS activities (
            blueprint_id INTEGER,
            activity TEXT,
            time INTEGER NOT NULL,
            PRIMARY KEY (blueprint_id, activity)
        );

        CREATE TABLE IF NOT EXISTS activity_materials (
            blueprint_id INTEGER,
            activity TEXT,
            type_id INTEGER,
            quantity REAL NOT NULL,
            PRIMARY KEY (blueprint_id, activity, type_id)
        );

        CREATE TABLE IF NOT EXISTS activity_skills (
            blueprint_id INTEGER,
            activity TEXT,
            skill_id INTEGER,
            level INTEGER NOT NULL,
            PRIMARY KEY (blueprint_id, activity, skill_id)
        );

        -- Manufacturing product (quantity = portion size) or invention candidates
        CREATE TABLE IF NOT EXISTS activity_products (
            blueprint_id INTEGER,
            activity TEXT,
            product_id INTEGER,
            quantity INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (blueprint_id, activity, product_id)
        );

        CREATE TABLE IF NOT EXISTS invention (
            blueprint_id INTEGER PRIMARY KEY,
            base_probability REAL NOT NULL,
            base_runs INTEGER NOT NULL,
            science_skill_1 INTEGER NOT NULL,
            science_skill_2 INTEGER NOT NULL,
            encryption_skill INTEGER NOT NULL
        );

        -- Reaction formulas, quantities per cycle
        CREATE TABLE IF NOT EXISTS reactions (
            id INTEGER PRIMARY KEY,
            primary_output INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reaction_materials (
            reaction_id INTEGER,
            type_id INTEGER,
            is_input INTEGER NOT NULL,
            quantity REAL NOT NULL,
            PRIMARY KEY (reaction_id, type_id, is_input)
        );

        CREATE TABLE IF NOT EXISTS reaction_skills (
            reaction_id INTEGER,
            skill_id INTEGER,
            level INTEGER NOT NULL,
            PRIMARY KEY (reaction_id, skill_id)
        );

        -- Yield of one reprocessing portion
        CREATE TABLE IF NOT EXISTS reprocessing (
            item_id INTEGER,
            material_id INTEGER,
            quantity REAL NOT NULL,
            PRIMARY KEY (item_id, material_id)
        );

        CREATE TABLE IF NOT EXISTS decryptors (
            id INTEGER PRIMARY KEY,
            probability_modifier REAL NOT NULL,
            run_modifier INTEGER NOT NULL,
            me_modifier INTEGER NOT NULL,
            te_modifier INTEGER NOT NULL
        );

        -- Market quotes; region 0 holds adjusted prices
        CREATE TABLE IF NOT EXISTS prices (
            type_id INTEGER,
            kind TEXT,
            region_id INTEGER,
            price REAL NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (type_id, kind, region_id)
        );

        CREATE INDEX IF NOT EXISTS idx_activity_products_product ON activity_products(product_id);
        CREATE INDEX IF NOT EXISTS idx_reaction_materials_type ON reaction_materials(type_id);
        "#,
    )?;
    Ok(())
}

/// Insert or replace an item
pub fn upsert_item(conn: &Connection, item: &ItemInfo) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO items (id, name, group_id, category_id, portion_size, sellable)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            item.id.0,
            &item.name,
            item.group_id,
            item.category_id,
            item.portion_size,
            item.sellable,
        ),
    )?;
    Ok(())
}

fn insert_activity(
    conn: &Connection,
    blueprint: TypeId,
    activity: RecipeActivity,
    data: &ActivityData,
) -> Result<()> {
    let key = activity.as_str();
    conn.execute(
        "INSERT INTO activities (blueprint_id, activity, time) VALUES (?1, ?2, ?3)",
        (blueprint.0, key, data.time),
    )?;
    for (item, qty) in data.materials.iter() {
        conn.execute(
            "INSERT INTO activity_materials (blueprint_id, activity, type_id, quantity)
             VALUES (?1, ?2, ?3, ?4)",
            (blueprint.0, key, item.0, qty),
        )?;
    }
    for (skill, level) in data.skills.iter() {
        conn.execute(
            "INSERT INTO activity_skills (blueprint_id, activity, skill_id, level)
             VALUES (?1, ?2, ?3, ?4)",
            (blueprint.0, key, skill.0, level),
        )?;
    }
    Ok(())
}

fn insert_product(
    conn: &Connection,
    blueprint: TypeId,
    activity: RecipeActivity,
    product: TypeId,
    quantity: u32,
) -> Result<()> {
    conn.execute(
        "INSERT INTO activity_products (blueprint_id, activity, product_id, quantity)
         VALUES (?1, ?2, ?3, ?4)",
        (blueprint.0, activity.as_str(), product.0, quantity),
    )?;
    Ok(())
}

/// Insert or replace a blueprint with all of its activities
pub fn upsert_blueprint(conn: &Connection, blueprint: &Blueprint) -> Result<()> {
    let id = blueprint.id.0;
    for table in [
        "activities",
        "activity_materials",
        "activity_skills",
        "activity_products",
        "invention",
    ] {
        conn.execute(&format!("DELETE FROM {table} WHERE blueprint_id = ?1"), [id])?;
    }
    conn.execute(
        "INSERT OR REPLACE INTO blueprints (id, max_production_limit) VALUES (?1, ?2)",
        (id, blueprint.max_production_limit),
    )?;

    if let Some(m) = &blueprint.manufacturing {
        insert_activity(conn, blueprint.id, RecipeActivity::Manufacturing, &m.activity)?;
        insert_product(
            conn,
            blueprint.id,
            RecipeActivity::Manufacturing,
            m.product,
            m.portion_size,
        )?;
    }
    for (activity, data) in [
        (RecipeActivity::Copying, &blueprint.copying),
        (RecipeActivity::MaterialResearch, &blueprint.research_material),
        (RecipeActivity::TimeResearch, &blueprint.research_time),
    ] {
        if let Some(data) = data {
            insert_activity(conn, blueprint.id, activity, data)?;
        }
    }
    if let Some(inv) = &blueprint.invention {
        insert_activity(conn, blueprint.id, RecipeActivity::Inventing, &inv.activity)?;
        for product in &inv.products {
            insert_product(conn, blueprint.id, RecipeActivity::Inventing, *product, 1)?;
        }
        conn.execute(
            "INSERT INTO invention (blueprint_id, base_probability, base_runs,
                                    science_skill_1, science_skill_2, encryption_skill)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                id,
                inv.base_probability,
                inv.base_runs,
                inv.science_skills[0].0,
                inv.science_skills[1].0,
                inv.encryption_skill.0,
            ),
        )?;
    }
    Ok(())
}

/// Insert or replace a reaction formula
pub fn upsert_reaction(conn: &Connection, reaction: &Reaction) -> Result<()> {
    let id = reaction.id.0;
    conn.execute("DELETE FROM reaction_materials WHERE reaction_id = ?1", [id])?;
    conn.execute("DELETE FROM reaction_skills WHERE reaction_id = ?1", [id])?;
    conn.execute(
        "INSERT OR REPLACE INTO reactions (id, primary_output) VALUES (?1, ?2)",
        (id, reaction.primary_output.0),
    )?;
    for (is_input, map) in [(true, &reaction.inputs), (false, &reaction.outputs)] {
        for (item, qty) in map.iter() {
            conn.execute(
                "INSERT INTO reaction_materials (reaction_id, type_id, is_input, quantity)
                 VALUES (?1, ?2, ?3, ?4)",
                (id, item.0, is_input, qty),
            )?;
        }
    }
    for (skill, level) in reaction.skills.iter() {
        conn.execute(
            "INSERT INTO reaction_skills (reaction_id, skill_id, level) VALUES (?1, ?2, ?3)",
            (id, skill.0, level),
        )?;
    }
    Ok(())
}

/// Insert or replace a decryptor
pub fn upsert_decryptor(conn: &Connection, decryptor: &Decryptor) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO decryptors (id, probability_modifier, run_modifier, me_modifier, te_modifier)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            decryptor.id.0,
            decryptor.probability_modifier,
            decryptor.run_modifier,
            decryptor.me_modifier,
            decryptor.te_modifier,
        ),
    )?;
    Ok(())
}

/// Replace the reprocessing yield of one portion of `item`
pub fn set_reprocessing(conn: &Connection, item: TypeId, yields: &MaterialMap) -> Result<()> {
    conn.execute("DELETE FROM reprocessing WHERE item_id = ?1", [item.0])?;
    for (material, qty) in yields.iter() {
        conn.execute(
            "INSERT INTO reprocessing (item_id, material_id, quantity) VALUES (?1, ?2, ?3)",
            (item.0, material.0, qty),
        )?;
    }
    Ok(())
}

/// Insert or replace a price quote. Adjusted prices carry no region.
pub fn upsert_price(
    conn: &Connection,
    kind: PriceKind,
    item: TypeId,
    region: Option<RegionId>,
    price: f64,
    updated_at: u64,
) -> Result<()> {
    let updated_at = i64::try_from(updated_at).context("timestamp out of range")?;
    conn.execute(
        "INSERT OR REPLACE INTO prices (type_id, kind, region_id, price, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            item.0,
            kind.as_str(),
            region.map_or(0, |r| r.0),
            price,
            updated_at,
        ),
    )?;
    Ok(())
}

/// Write every record of an in-memory catalog
pub fn store_catalog(conn: &Connection, catalog: &MemoryCatalog) -> Result<()> {
    for item in catalog.items() {
        upsert_item(conn, item)?;
    }
    for blueprint in catalog.blueprints() {
        upsert_blueprint(conn, blueprint)?;
    }
    for reaction in catalog.reactions() {
        upsert_reaction(conn, reaction)?;
    }
    for decryptor in catalog.decryptors() {
        upsert_decryptor(conn, decryptor)?;
    }
    for (item, yields) in catalog.reprocessing() {
        set_reprocessing(conn, item, yields)?;
    }
    Ok(())
}

/// Clear all catalog data (for re-import)
pub fn clear_catalog_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM reprocessing;
        DELETE FROM decryptors;
        DELETE FROM reaction_skills;
        DELETE FROM reaction_materials;
        DELETE FROM reactions;
        DELETE FROM invention;
        DELETE FROM activity_products;
        DELETE FROM activity_skills;
        DELETE FROM activity_materials;
        DELETE FROM activities;
        DELETE FROM blueprints;
        DELETE FROM items;
        DELETE FROM prices;
        "#,
    )?;
    Ok(())
}

fn parse_activity(key: &str) -> Result<RecipeActivity> {
    RecipeActivity::parse(key).ok_or_else(|| anyhow!("unknown activity '{key}' in database"))
}

fn load_items(conn: &Connection, catalog: &mut MemoryCatalog) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT id, name, group_id, category_id, portion_size, sellable FROM items",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ItemInfo {
            id: TypeId(row.get(0)?),
            name: row.get(1)?,
            group_id: row.get(2)?,
            category_id: row.get(3)?,
            portion_size: row.get(4)?,
            sellable: row.get(5)?,
        })
    })?;
    for row in rows {
        catalog.add_item(row?);
    }
    Ok(())
}

type ActivityKey = (TypeId, RecipeActivity);

fn load_activities(conn: &Connection) -> Result<BTreeMap<ActivityKey, ActivityData>> {
    let mut activities = BTreeMap::new();

    let mut stmt = conn.prepare("SELECT blueprint_id, activity, time FROM activities")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?, row.get::<_, u32>(2)?))
    })?;
    for row in rows {
        let (bp, key, time) = row?;
        let data = ActivityData {
            time,
            ..ActivityData::default()
        };
        activities.insert((TypeId(bp), parse_activity(&key)?), data);
    }

    let mut stmt =
        conn.prepare("SELECT blueprint_id, activity, type_id, quantity FROM activity_materials")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, u32>(2)?,
            row.get::<_, f64>(3)?,
        ))
    })?;
    for row in rows {
        let (bp, key, item, qty) = row?;
        if let Some(data) = activities.get_mut(&(TypeId(bp), parse_activity(&key)?)) {
            data.materials.add(TypeId(item), qty)?;
        }
    }

    let mut stmt =
        conn.prepare("SELECT blueprint_id, activity, skill_id, level FROM activity_skills")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, u32>(2)?,
            row.get::<_, u8>(3)?,
        ))
    })?;
    for row in rows {
        let (bp, key, skill, level) = row?;
        if let Some(data) = activities.get_mut(&(TypeId(bp), parse_activity(&key)?)) {
            data.skills.require(TypeId(skill), level);
        }
    }

    Ok(activities)
}

fn load_products(conn: &Connection) -> Result<HashMap<ActivityKey, Vec<(TypeId, u32)>>> {
    let mut products: HashMap<ActivityKey, Vec<(TypeId, u32)>> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT blueprint_id, activity, product_id, quantity FROM activity_products
         ORDER BY blueprint_id, product_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, u32>(2)?,
            row.get::<_, u32>(3)?,
        ))
    })?;
    for row in rows {
        let (bp, key, product, qty) = row?;
        products
            .entry((TypeId(bp), parse_activity(&key)?))
            .or_default()
            .push((TypeId(product), qty));
    }
    Ok(products)
}

fn load_blueprints(conn: &Connection, catalog: &mut MemoryCatalog) -> Result<()> {
    let mut activities = load_activities(conn)?;
    let products = load_products(conn)?;

    let mut invention_params = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT blueprint_id, base_probability, base_runs, science_skill_1, science_skill_2, encryption_skill
         FROM invention",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, f64>(1)?,
            row.get::<_, u32>(2)?,
            [TypeId(row.get(3)?), TypeId(row.get(4)?)],
            TypeId(row.get(5)?),
        ))
    })?;
    for row in rows {
        let (bp, probability, runs, science, encryption) = row?;
        invention_params.insert(TypeId(bp), (probability, runs, science, encryption));
    }

    let mut stmt = conn.prepare("SELECT id, max_production_limit FROM blueprints")?;
    let rows = stmt.query_map([], |row| {
        Ok(Blueprint::new(TypeId(row.get(0)?), row.get(1)?))
    })?;

    for row in rows {
        let mut blueprint = row?;
        let id = blueprint.id;
        let mut take = |activity| activities.remove(&(id, activity));

        if let Some(activity) = take(RecipeActivity::Manufacturing) {
            let (product, portion_size) = products
                .get(&(id, RecipeActivity::Manufacturing))
                .and_then(|p| p.first().copied())
                .with_context(|| format!("blueprint {id} manufactures nothing"))?;
            blueprint.manufacturing = Some(ManufacturingData {
                activity,
                product,
                portion_size,
            });
        }
        blueprint.copying = take(RecipeActivity::Copying);
        blueprint.research_material = take(RecipeActivity::MaterialResearch);
        blueprint.research_time = take(RecipeActivity::TimeResearch);
        if let Some(activity) = take(RecipeActivity::Inventing) {
            let (base_probability, base_runs, science_skills, encryption_skill) = invention_params
                .get(&id)
                .copied()
                .with_context(|| format!("blueprint {id} has no invention parameters"))?;
            blueprint.invention = Some(InventionData {
                activity,
                products: products
                    .get(&(id, RecipeActivity::Inventing))
                    .map(|p| p.iter().map(|(product, _)| *product).collect())
                    .unwrap_or_default(),
                base_probability,
                base_runs,
                science_skills,
                encryption_skill,
            });
        }
        catalog.add_blueprint(blueprint);
    }
    Ok(())
}

fn load_reactions(conn: &Connection, catalog: &mut MemoryCatalog) -> Result<()> {
    let mut reactions = BTreeMap::new();
    let mut stmt = conn.prepare("SELECT id, primary_output FROM reactions")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?))
    })?;
    for row in rows {
        let (id, primary) = row?;
        reactions.insert(
            TypeId(id),
            Reaction {
                id: TypeId(id),
                inputs: MaterialMap::new(),
                outputs: MaterialMap::new(),
                skills: SkillMap::new(),
                primary_output: TypeId(primary),
            },
        );
    }

    let mut stmt =
        conn.prepare("SELECT reaction_id, type_id, is_input, quantity FROM reaction_materials")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, u32>(1)?,
            row.get::<_, bool>(2)?,
            row.get::<_, f64>(3)?,
        ))
    })?;
    for row in rows {
        let (id, item, is_input, qty) = row?;
        if let Some(reaction) = reactions.get_mut(&TypeId(id)) {
            let side = if is_input {
                &mut reaction.inputs
            } else {
                &mut reaction.outputs
            };
            side.add(TypeId(item), qty)?;
        }
    }

    let mut stmt = conn.prepare("SELECT reaction_id, skill_id, level FROM reaction_skills")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?, row.get::<_, u8>(2)?))
    })?;
    for row in rows {
        let (id, skill, level) = row?;
        if let Some(reaction) = reactions.get_mut(&TypeId(id)) {
            reaction.skills.require(TypeId(skill), level);
        }
    }

    for reaction in reactions.into_values() {
        catalog.add_reaction(reaction);
    }
    Ok(())
}

fn load_extras(conn: &Connection, catalog: &mut MemoryCatalog) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT id, probability_modifier, run_modifier, me_modifier, te_modifier FROM decryptors",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Decryptor {
            id: TypeId(row.get(0)?),
            probability_modifier: row.get(1)?,
            run_modifier: row.get(2)?,
            me_modifier: row.get(3)?,
            te_modifier: row.get(4)?,
        })
    })?;
    for row in rows {
        catalog.add_decryptor(row?);
    }

    let mut yields: BTreeMap<TypeId, MaterialMap> = BTreeMap::new();
    let mut stmt = conn.prepare("SELECT item_id, material_id, quantity FROM reprocessing")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?, row.get::<_, f64>(2)?))
    })?;
    for row in rows {
        let (item, material, qty) = row?;
        yields.entry(TypeId(item)).or_default().add(TypeId(material), qty)?;
    }
    for (item, materials) in yields {
        catalog.set_reprocessing(item, materials);
    }
    Ok(())
}

/// Load the whole catalog into memory
pub fn load_catalog(conn: &Connection) -> Result<MemoryCatalog> {
    let mut catalog = MemoryCatalog::new();
    load_items(conn, &mut catalog).context("loading items")?;
    load_blueprints(conn, &mut catalog).context("loading blueprints")?;
    load_reactions(conn, &mut catalog).context("loading reactions")?;
    load_extras(conn, &mut catalog).context("loading decryptors and reprocessing")?;
    Ok(catalog)
}

/// Load every stored quote into a price book using the system clock
pub fn load_prices(conn: &Connection) -> Result<PriceBook> {
    let mut book = PriceBook::new();
    let mut stmt =
        conn.prepare("SELECT type_id, kind, region_id, price, updated_at FROM prices")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, u32>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, i64>(4)?,
        ))
    })?;
    for row in rows {
        let (item, kind, region, price, updated_at) = row?;
        let quote = Quote {
            price,
            updated_at: u64::try_from(updated_at).unwrap_or(0),
        };
        let kind = PriceKind::parse(&kind).ok_or_else(|| anyhow!("unknown price kind '{kind}'"))?;
        match kind {
            PriceKind::Adjusted => book.set_adjusted(TypeId(item), quote),
            PriceKind::Buy => book.set_buy(TypeId(item), RegionId(region), quote),
            PriceKind::Sell => book.set_sell(TypeId(item), RegionId(region), quote),
        }
    }
    Ok(book)
}

/// List every blueprint with its name and manufactured product
pub fn list_blueprints(conn: &Connection) -> Result<Vec<(TypeId, String, Option<String>)>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, COALESCE(i.name, '#' || b.id), p.name
         FROM blueprints b
         LEFT JOIN items i ON i.id = b.id
         LEFT JOIN activity_products ap ON ap.blueprint_id = b.id AND ap.activity = 'manufacturing'
         LEFT JOIN items p ON p.id = ap.product_id
         ORDER BY 2",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((TypeId(row.get(0)?), row.get(1)?, row.get(2)?))
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

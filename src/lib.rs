pub mod config;
pub mod entities;
pub mod error;
pub mod persistence;
pub mod telemetry;
pub mod world;

pub use entities::inventory::{InvWhere, Inventory};
pub use entities::item::ItemInstance;
pub use entities::slots::{SlotCodec, SlotLocation, SlotScheme, SlotType};
pub use error::{StoreError, StoreResult};
pub use world::item_types::{ItemCatalog, ItemDefinition, ItemRepository};
pub use world::limits::{ClientVersion, InventoryLimits};

use persistence::store::InventoryStore;
use std::path::Path;
use world::definition_cache::DefinitionCache;
use world::limits::LimitsProvider;

pub const CATALOG_FILE: &str = "items.yaml";
pub const DEFINITION_DIR: &str = "items";

pub fn run(args: &[String]) -> StoreResult<()> {
    let config = config::AppConfig::from_args(args)?;
    telemetry::logging::init(Some(&config.root))?;
    let settings = config::SatchelConfig::load(&config.root)?;
    let client = config.client_version.unwrap_or(settings.client_version);
    let client_limits = settings.limits_provider().limits_for(client);

    let mut repo = open_repository(&config.root, settings.cache_capacity)?;
    let store = InventoryStore::from_root(&config.root);
    let mut inventory = Inventory::new(InventoryLimits::server(), settings.slot_scheme);
    let restore_report = store.load_inventory(&config.character, repo.as_mut(), &mut inventory)?;
    let save_report = store.validate_saves();

    tracing::info!(character = %config.character, client = %client, "inventory loaded");
    println!("satchel: {}", config.character);
    println!("- root: {}", config.root.display());
    if let Some(path) = telemetry::logging::log_file_path() {
        println!("- log: {}", path.display());
    }
    println!("- client: {} ({:?} slot ids)", client, settings.slot_scheme);
    println!("- server limits: {}", inventory.limits().summary());
    println!("- client limits: {}", client_limits.summary());
    match &restore_report {
        Some(report) => println!(
            "- restored: items={}, skipped={}, migrated slots={}",
            report.restored,
            report.skipped(),
            report.migrated_slots
        ),
        None => println!("- restored: no save for {}", config.character),
    }
    if let Some(report) = &restore_report {
        for id in &report.unknown_definitions {
            eprintln!("satchel: unknown item definition {}", id);
        }
    }
    let records = persistence::records::snapshot(&inventory);
    let packed = persistence::wire::encode_records(&records);
    println!(
        "- items: {} ({} records, {} bytes packed, {} base64 chars)",
        inventory.total_items(),
        records.len(),
        packed.len(),
        persistence::wire::to_base64(&packed).len()
    );
    if save_report.missing_dir {
        println!("- saves: missing save directory");
    } else {
        println!(
            "- saves: files={}, parsed={}, errors={}, skipped={}",
            save_report.save_files,
            save_report.parsed,
            save_report.errors.len(),
            save_report.skipped
        );
    }
    for err in &save_report.errors {
        eprintln!("satchel: save validate {}", err);
    }
    print!("{}", inventory.dump_entire_inventory());
    Ok(())
}

/// The catalog file when present, otherwise the per-definition directory.
fn open_repository(root: &Path, cache_capacity: usize) -> StoreResult<Box<dyn ItemRepository>> {
    let catalog_path = root.join(CATALOG_FILE);
    if catalog_path.exists() {
        let catalog = ItemCatalog::load_yaml(&catalog_path)?;
        tracing::info!(definitions = catalog.len(), "item catalog loaded");
        return Ok(Box::new(catalog));
    }
    let dir = root.join(DEFINITION_DIR);
    tracing::info!(dir = %dir.display(), capacity = cache_capacity, "loading item definitions on demand");
    Ok(Box::new(DefinitionCache::new(cache_capacity, dir)))
}

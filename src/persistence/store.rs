use crate::entities::inventory::Inventory;
use crate::error::{StoreError, StoreResult};
use crate::persistence::records::{restore, snapshot, RestoreReport, SlotRecord};
use crate::world::item_types::ItemRepository;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk layout of one character's save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveFile {
    pub character: String,
    #[serde(default)]
    pub records: Vec<SlotRecord>,
}

#[derive(Debug, Clone)]
pub struct InventoryStore {
    root: PathBuf,
}

#[derive(Debug, Default)]
pub struct SaveValidationReport {
    pub save_files: usize,
    pub parsed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub missing_dir: bool,
}

impl InventoryStore {
    pub fn from_root(root: &Path) -> Self {
        Self {
            root: root.join("save"),
        }
    }

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn save_dir(&self) -> &Path {
        &self.root
    }

    /// Records saved for `character`, or `None` when nothing was ever saved.
    ///
    /// An unreadable or corrupt primary file falls back to its backup.
    pub fn load(&self, character: &str) -> StoreResult<Option<Vec<SlotRecord>>> {
        let path = self.save_path(character)?;
        let backup_path = self.backup_path(character)?;
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return self.load_backup(character, &backup_path);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "save read failed, trying backup");
                return match self.load_backup(character, &backup_path)? {
                    Some(records) => Ok(Some(records)),
                    None => Err(StoreError::io(&path, err)),
                };
            }
        };
        match parse_save(&data, character, &path) {
            Ok(records) => Ok(Some(records)),
            Err(err) => match self.load_backup(character, &backup_path)? {
                Some(records) => {
                    tracing::warn!(path = %path.display(), error = %err, "save parse failed, using backup");
                    Ok(Some(records))
                }
                None => Err(err),
            },
        }
    }

    /// Writes `records`, keeping the previous save as `<character>.yaml.bak`.
    pub fn save(&self, character: &str, records: &[SlotRecord]) -> StoreResult<()> {
        fs::create_dir_all(&self.root).map_err(|err| StoreError::io(&self.root, err))?;
        let path = self.save_path(character)?;
        let backup_path = self.backup_path(character)?;
        let file = SaveFile {
            character: character.to_string(),
            records: records.to_vec(),
        };
        let data = serde_yaml::to_string(&file).map_err(|err| StoreError::yaml(path.display().to_string(), err))?;
        if path.exists() {
            fs::copy(&path, &backup_path).map_err(|err| StoreError::io(&backup_path, err))?;
        }
        fs::write(&path, data).map_err(|err| StoreError::io(&path, err))?;
        tracing::debug!(character, records = records.len(), "inventory saved");
        Ok(())
    }

    pub fn save_inventory(&self, character: &str, inventory: &Inventory) -> StoreResult<()> {
        self.save(character, &snapshot(inventory))
    }

    /// Restores the saved inventory of `character` into `inventory`.
    pub fn load_inventory<R>(
        &self,
        character: &str,
        repo: &mut R,
        inventory: &mut Inventory,
    ) -> StoreResult<Option<RestoreReport>>
    where
        R: ItemRepository + ?Sized,
    {
        match self.load(character)? {
            Some(records) => restore(&records, repo, inventory).map(Some),
            None => Ok(None),
        }
    }

    pub fn validate_saves(&self) -> SaveValidationReport {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return SaveValidationReport {
                    missing_dir: true,
                    ..SaveValidationReport::default()
                };
            }
            Err(err) => {
                return SaveValidationReport {
                    errors: vec![format!("save dir read failed for {}: {}", self.root.display(), err)],
                    ..SaveValidationReport::default()
                };
            }
        };

        let mut report = SaveValidationReport::default();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    report
                        .errors
                        .push(format!("save dir entry failed for {}: {}", self.root.display(), err));
                    continue;
                }
            };
            let path = entry.path();
            let is_save = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml"));
            if !is_save {
                report.skipped += 1;
                continue;
            }
            report.save_files += 1;
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                report.errors.push(format!("save file name missing stem: {}", path.display()));
                continue;
            };
            let data = match fs::read_to_string(&path) {
                Ok(data) => data,
                Err(err) => {
                    report.errors.push(format!("save read failed for {}: {}", path.display(), err));
                    continue;
                }
            };
            match parse_save(&data, stem, &path) {
                Ok(_) => report.parsed += 1,
                Err(err) => report.errors.push(err.to_string()),
            }
        }
        report
    }

    fn save_path(&self, character: &str) -> StoreResult<PathBuf> {
        check_character(character)?;
        Ok(self.root.join(format!("{character}.yaml")))
    }

    fn backup_path(&self, character: &str) -> StoreResult<PathBuf> {
        check_character(character)?;
        Ok(self.root.join(format!("{character}.yaml.bak")))
    }

    fn load_backup(&self, character: &str, backup_path: &Path) -> StoreResult<Option<Vec<SlotRecord>>> {
        let data = match fs::read_to_string(backup_path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::io(backup_path, err)),
        };
        parse_save(&data, character, backup_path).map(Some)
    }
}

fn parse_save(data: &str, character: &str, path: &Path) -> StoreResult<Vec<SlotRecord>> {
    let file: SaveFile = serde_yaml::from_str(data).map_err(|err| StoreError::yaml(path.display().to_string(), err))?;
    if file.character != character {
        return Err(StoreError::Config(format!(
            "save {} belongs to '{}', expected '{}'",
            path.display(),
            file.character,
            character
        )));
    }
    Ok(file.records)
}

fn check_character(character: &str) -> StoreResult<()> {
    let valid = !character.is_empty()
        && character
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::Config(format!("invalid character name '{character}'")))
    }
}

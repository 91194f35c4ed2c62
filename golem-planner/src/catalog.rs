//! Reference catalog of domain-valid identifiers.
//!
//! Built-in entity, ore and structure lists plus the normalization rules the
//! validator applies before comparing model output against them. Structure
//! templates come from the external template store and are re-queried on
//! every call so on-disk edits are visible immediately.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use once_cell::sync::Lazy;

pub const PASSIVE_ENTITIES: &[&str] = &["sheep", "cow", "pig", "chicken"];

pub const HOSTILE_ENTITIES: &[&str] = &["zombie", "skeleton", "spider", "creeper"];

pub const ORES: &[&str] = &[
    "iron_ore",
    "diamond_ore",
    "coal_ore",
    "gold_ore",
    "copper_ore",
    "redstone_ore",
    "emerald_ore",
];

/// Structures the builder can generate without a template.
pub const PROCEDURAL_STRUCTURES: &[&str] = &["castle", "tower", "barn", "modern"];

/// Targets accepted for `attack` tasks: the literal "hostile" keyword (any
/// hostile mob) union all named entities.
static ATTACK_TARGETS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    let mut targets = BTreeSet::new();
    targets.insert("hostile");
    targets.extend(PASSIVE_ENTITIES);
    targets.extend(HOSTILE_ENTITIES);
    targets
});

/// Canonical form used for all catalog comparisons: trimmed, lowercased,
/// namespace prefix stripped, spaces replaced with underscores.
pub fn normalize(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .replace("minecraft:", "")
        .replace(' ', "_")
}

pub fn valid_attack_targets() -> &'static BTreeSet<&'static str> {
    &ATTACK_TARGETS
}

pub fn is_valid_attack_target(target: &str) -> bool {
    if target.trim().is_empty() {
        return false;
    }
    ATTACK_TARGETS.contains(normalize(target).as_str())
}

/// External store of named structure templates. Implementations must return
/// the current on-disk state on every call; the catalog never caches it.
pub trait TemplateStore: Send + Sync {
    fn available_structures(&self) -> Vec<String>;
}

/// Template store backed by a directory of template files; each file stem is
/// one structure name.
pub struct FsTemplateStore {
    root: PathBuf,
}

impl FsTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateStore for FsTemplateStore {
    fn available_structures(&self) -> Vec<String> {
        let mut names = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return names,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        names
    }
}

/// Sorted, de-duplicated union of template names and procedural structures.
/// Sorted so rejection diagnostics are stable.
pub fn all_structure_options(store: &dyn TemplateStore) -> Vec<String> {
    let mut options: BTreeSet<String> = store.available_structures().into_iter().collect();
    options.extend(PROCEDURAL_STRUCTURES.iter().map(|s| s.to_string()));
    options.into_iter().collect()
}

pub fn is_valid_structure_name(store: &dyn TemplateStore, name: &str) -> bool {
    if name.trim().is_empty() {
        return false;
    }
    let normalized = normalize(name);
    store
        .available_structures()
        .iter()
        .any(|t| normalize(t) == normalized)
        || PROCEDURAL_STRUCTURES
            .iter()
            .any(|p| normalize(p) == normalized)
}

/// Render a list as prompt-ready bullet lines.
pub fn format_list<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        return "- none found".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_strips_case_whitespace_and_namespace() {
        assert_eq!(normalize("Zombie "), "zombie");
        assert_eq!(normalize("minecraft:sheep"), "sheep");
        assert_eq!(normalize("  Stone Bricks"), "stone_bricks");
    }

    #[test]
    fn attack_targets_accept_normalized_entities() {
        assert!(is_valid_attack_target("Zombie "));
        assert!(is_valid_attack_target("minecraft:sheep"));
        assert!(is_valid_attack_target("hostile"));
        assert!(!is_valid_attack_target("dragon"));
        assert!(!is_valid_attack_target("   "));
    }

    #[test]
    fn structure_names_match_procedurals_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsTemplateStore::new(dir.path());

        assert!(is_valid_structure_name(&store, "Castle"));
        assert!(!is_valid_structure_name(&store, "pyramid"));
    }

    #[test]
    fn structure_names_match_templates_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pyramid.nbt"), b"").unwrap();
        let store = FsTemplateStore::new(dir.path());

        assert!(is_valid_structure_name(&store, "pyramid"));
        assert!(is_valid_structure_name(&store, "Pyramid "));
    }

    #[test]
    fn template_store_reflects_directory_edits_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsTemplateStore::new(dir.path());
        assert!(store.available_structures().is_empty());

        std::fs::write(dir.path().join("house.nbt"), b"").unwrap();
        assert_eq!(store.available_structures(), vec!["house".to_string()]);
    }

    #[test]
    fn structure_options_are_sorted_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("castle.nbt"), b"").unwrap();
        std::fs::write(dir.path().join("house.nbt"), b"").unwrap();
        let store = FsTemplateStore::new(dir.path());

        let options = all_structure_options(&store);
        assert_eq!(options, vec!["barn", "castle", "house", "modern", "tower"]);
    }

    #[test]
    fn format_list_renders_bullets_or_placeholder() {
        assert_eq!(format_list(&["a", "b"]), "- a\n- b");
        assert_eq!(format_list::<&str>(&[]), "- none found");
    }
}

//! Settings
//!
//! Persisted key-value settings for the offer. Every value is sanitised on
//! write, so whatever ends up in the store is always well formed and
//! [`SettingsStore::load_config`] never fails.

use std::{fs, io, path::Path};

use serde::{Deserialize, Deserializer, Serialize};
use serde_norway::Value;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::{
    config::{BogoConfig, Scope},
    products::ProductId,
};

/// Settings Errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// IO error reading or writing the settings file
    #[error("Failed to access settings file: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing or serialisation error
    #[error("Failed to parse settings YAML: {0}")]
    Yaml(#[from] serde_norway::Error),
}

/// A selection as submitted by an admin: a comma-separated string or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionInput {
    /// Comma-separated IDs, e.g. `"42, 7"`.
    Csv(String),

    /// A list of IDs, numeric or textual.
    List(Vec<SelectionEntry>),
}

/// One entry of a [`SelectionInput::List`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionEntry {
    /// Numeric entry
    Number(i64),

    /// Textual entry, coerced like a form field
    Text(String),
}

impl From<&[u64]> for SelectionInput {
    fn from(ids: &[u64]) -> Self {
        SelectionInput::List(
            ids.iter()
                .map(|&id| SelectionEntry::Text(id.to_string()))
                .collect(),
        )
    }
}

/// Coerce the raw enabled flag; only `"yes"` enables the offer.
pub fn sanitize_enabled(raw: &str) -> bool {
    raw == "yes"
}

/// Coerce a raw selection into positive, de-duplicated IDs in first-seen order.
pub fn sanitize_selection(input: &SelectionInput) -> Vec<ProductId> {
    let raw: SmallVec<[i64; 16]> = match input {
        SelectionInput::Csv(csv) => csv.split(',').map(coerce_int).collect(),
        SelectionInput::List(entries) => entries
            .iter()
            .map(|entry| match entry {
                SelectionEntry::Number(n) => *n,
                SelectionEntry::Text(text) => coerce_int(text),
            })
            .collect(),
    };

    let mut ids = Vec::with_capacity(raw.len());

    for id in raw
        .into_iter()
        .filter_map(|n| u64::try_from(n).ok())
        .filter_map(ProductId::new)
    {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    ids
}

/// Integer coercion of a form value: the leading optionally-signed digits, or `0`.
fn coerce_int(raw: &str) -> i64 {
    let trimmed = raw.trim();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    digits
        .get(..end)
        .and_then(|d| d.parse::<i64>().ok())
        .map_or(0, |n| sign * n)
}

/// Persisted settings owned by the host platform.
pub trait SettingsStore {
    /// Whether the offer is enabled.
    fn enabled(&self) -> bool;

    /// Offer scope.
    fn scope(&self) -> Scope;

    /// Selected product and variation IDs.
    fn selected_products(&self) -> &[ProductId];

    /// Store the enabled flag, coercing anything but `"yes"` to disabled.
    fn set_enabled(&mut self, raw: &str);

    /// Store the scope, coercing anything but `"selected"` to all products.
    fn set_scope(&mut self, raw: &str);

    /// Store the selection, dropping non-positive and duplicate IDs.
    fn set_selected_products(&mut self, raw: &SelectionInput);

    /// Build the configuration snapshot for one request.
    fn load_config(&self) -> BogoConfig {
        BogoConfig::new(
            self.enabled(),
            self.scope(),
            self.selected_products().iter().copied(),
        )
    }

    /// Status summary for admin overviews.
    fn status(&self) -> StatusSummary {
        StatusSummary {
            enabled: self.enabled(),
            scope: self.scope(),
            selected_count: self.selected_products().len(),
        }
    }
}

/// Admin overview of the current settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSummary {
    /// Whether the offer is enabled
    pub enabled: bool,

    /// Offer scope
    pub scope: Scope,

    /// Number of selected products
    pub selected_count: usize,
}

impl StatusSummary {
    /// `ACTIVE` or `INACTIVE`.
    pub const fn status_label(&self) -> &'static str {
        if self.enabled { "ACTIVE" } else { "INACTIVE" }
    }
}

/// Raw, unsanitised settings values as found in a settings file or admin form.
///
/// Every field is optional and read leniently, so partial or damaged files
/// still load: absent fields leave the stored value unchanged and values of
/// the wrong shape sanitise to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    /// Raw enabled flag
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub enabled: Option<String>,

    /// Raw scope
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub scope: Option<String>,

    /// Raw selection
    #[serde(
        default,
        deserialize_with = "lenient_selection",
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_products: Option<SelectionInput>,
}

/// Read any scalar as text; sequences and mappings become an empty string.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) => Some(text),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => Some(String::new()),
    })
}

/// Read a selection of any shape.
///
/// A single number is a one-element list; list entries that are neither
/// integers nor text are dropped; anything else is an empty selection.
fn lenient_selection<'de, D>(deserializer: D) -> Result<Option<SelectionInput>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(csv) => Some(SelectionInput::Csv(csv)),
        Value::Sequence(items) => Some(SelectionInput::List(
            items.into_iter().filter_map(selection_entry).collect(),
        )),
        value @ Value::Number(_) => Some(SelectionInput::List(
            selection_entry(value).into_iter().collect(),
        )),
        Value::Bool(_) | Value::Mapping(_) | Value::Tagged(_) => {
            Some(SelectionInput::List(Vec::new()))
        }
    })
}

fn selection_entry(value: Value) -> Option<SelectionEntry> {
    match value {
        Value::Number(number) => number.as_i64().map(SelectionEntry::Number),
        Value::String(text) => Some(SelectionEntry::Text(text)),
        _ => None,
    }
}

/// In-memory settings store with YAML file persistence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySettings {
    enabled: bool,
    scope: Scope,
    selected: Vec<ProductId>,
}

impl MemorySettings {
    /// Create a store holding the defaults: disabled, all products, nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from YAML, sanitising every value.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Yaml`] if the document is not valid YAML for the settings layout.
    pub fn from_yaml(contents: &str) -> Result<Self, SettingsError> {
        let raw: Option<SettingsPatch> = serde_norway::from_str(contents)?;

        let mut settings = Self::new();

        if let Some(raw) = raw {
            settings.apply(&raw);
        }

        Ok(settings)
    }

    /// Load settings from a YAML file; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(contents) => Self::from_yaml(&contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "settings file missing, using defaults");

                Ok(Self::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Serialise the settings to YAML.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Yaml`] if serialisation fails.
    pub fn to_yaml(&self) -> Result<String, SettingsError> {
        let ids: Vec<u64> = self.selected.iter().map(|id| id.get()).collect();

        let raw = SettingsPatch {
            enabled: Some(if self.enabled { "yes" } else { "no" }.to_string()),
            scope: Some(self.scope.as_str().to_string()),
            selected_products: Some(SelectionInput::List(
                ids.into_iter()
                    .filter_map(|id| i64::try_from(id).ok())
                    .map(SelectionEntry::Number)
                    .collect(),
            )),
        };

        Ok(serde_norway::to_string(&raw)?)
    }

    /// Write the settings to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] if serialisation or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        fs::write(path, self.to_yaml()?)?;

        Ok(())
    }

    /// Sanitise and store every value present in `raw`.
    pub fn apply(&mut self, raw: &SettingsPatch) {
        if let Some(enabled) = raw.enabled.as_deref() {
            self.set_enabled(enabled);
        }

        if let Some(scope) = raw.scope.as_deref() {
            self.set_scope(scope);
        }

        if let Some(selected) = raw.selected_products.as_ref() {
            self.set_selected_products(selected);
        }
    }
}

impl SettingsStore for MemorySettings {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn selected_products(&self) -> &[ProductId] {
        &self.selected
    }

    fn set_enabled(&mut self, raw: &str) {
        self.enabled = sanitize_enabled(raw);
    }

    fn set_scope(&mut self, raw: &str) {
        self.scope = Scope::sanitize(raw);
    }

    fn set_selected_products(&mut self, raw: &SelectionInput) {
        self.selected = sanitize_selection(raw);
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::test_support::id;

    use super::*;

    #[test]
    fn enabled_only_accepts_yes() {
        assert!(sanitize_enabled("yes"));
        assert!(!sanitize_enabled("no"));
        assert!(!sanitize_enabled("YES"));
        assert!(!sanitize_enabled("1"));
    }

    #[test]
    fn csv_selection_is_trimmed_filtered_and_deduplicated() {
        let input = SelectionInput::Csv(" 42, 7,abc, -3, 0, 42, 12x ".to_string());

        assert_eq!(sanitize_selection(&input), vec![id(42), id(7), id(12)]);
    }

    #[test]
    fn list_selection_accepts_numbers_and_text() {
        let input = SelectionInput::List(vec![
            SelectionEntry::Number(5),
            SelectionEntry::Text("9".to_string()),
            SelectionEntry::Number(-1),
            SelectionEntry::Text("5".to_string()),
        ]);

        assert_eq!(sanitize_selection(&input), vec![id(5), id(9)]);
    }

    #[test]
    fn empty_selection_is_empty() {
        assert!(sanitize_selection(&SelectionInput::Csv(String::new())).is_empty());
        assert!(sanitize_selection(&SelectionInput::List(Vec::new())).is_empty());
    }

    #[test]
    fn defaults_are_conservative() {
        let settings = MemorySettings::new();
        let config = settings.load_config();

        assert!(!config.enabled());
        assert_eq!(config.scope(), Scope::All);
        assert!(config.selected_ids().is_empty());
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() -> TestResult {
        let settings = MemorySettings::from_yaml(
            "enabled: maybe\nscope: everything\nselected_products: \"none\"\n",
        )?;

        assert!(!settings.enabled());
        assert_eq!(settings.scope(), Scope::All);
        assert!(settings.selected_products().is_empty());

        Ok(())
    }

    #[test]
    fn single_numeric_selection_is_a_one_element_list() -> TestResult {
        let settings = MemorySettings::from_yaml("selected_products: 42\n")?;

        assert_eq!(settings.selected_products(), &[id(42)]);

        Ok(())
    }

    #[test]
    fn selection_lists_drop_entries_of_the_wrong_shape() -> TestResult {
        let settings = MemorySettings::from_yaml("selected_products: [1.5, 2, [3], \"4\"]\n")?;

        assert_eq!(settings.selected_products(), &[id(2), id(4)]);

        Ok(())
    }

    #[test]
    fn wrongly_shaped_values_load_as_defaults() -> TestResult {
        for yaml in [
            "selected_products: {a: 1}\n",
            "selected_products: true\n",
            "scope: [1]\n",
            "scope: {selected: true}\n",
            "enabled: [yes]\n",
            "enabled: true\n",
            "enabled: 1\n",
        ] {
            let settings = MemorySettings::from_yaml(yaml)?;

            assert_eq!(settings, MemorySettings::new(), "{yaml}");
        }

        Ok(())
    }

    #[test]
    fn wrongly_shaped_values_keep_the_rest_of_the_file() -> TestResult {
        let settings = MemorySettings::from_yaml(
            "enabled: \"yes\"\nscope: [1]\nselected_products: {a: 1}\n",
        )?;

        assert!(settings.enabled());
        assert_eq!(settings.scope(), Scope::All);
        assert!(settings.selected_products().is_empty());

        Ok(())
    }

    #[test]
    fn empty_document_loads_defaults() -> TestResult {
        assert_eq!(MemorySettings::from_yaml("")?, MemorySettings::new());

        Ok(())
    }

    #[test]
    fn yaml_round_trip_preserves_sanitised_values() -> TestResult {
        let mut settings = MemorySettings::new();
        settings.set_enabled("yes");
        settings.set_scope("selected");
        settings.set_selected_products(&SelectionInput::Csv("42,7".to_string()));

        let reloaded = MemorySettings::from_yaml(&settings.to_yaml()?)?;

        assert_eq!(reloaded, settings);
        assert!(reloaded.load_config().is_selected(id(7)));

        Ok(())
    }

    #[test]
    fn load_missing_file_yields_defaults() -> TestResult {
        let dir = tempfile::tempdir()?;
        let settings = MemorySettings::load(dir.path().join("missing.yml"))?;

        assert_eq!(settings, MemorySettings::new());

        Ok(())
    }

    #[test]
    fn save_then_load() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bogo.yml");

        let mut settings = MemorySettings::new();
        settings.set_enabled("yes");
        settings.save(&path)?;

        assert!(MemorySettings::load(&path)?.enabled());

        Ok(())
    }

    #[test]
    fn status_summary_reports_counts() {
        let mut settings = MemorySettings::new();
        settings.set_selected_products(&SelectionInput::from([1_u64, 2, 3].as_slice()));

        let status = settings.status();

        assert_eq!(status.status_label(), "INACTIVE");
        assert_eq!(status.scope.label(), "All products");
        assert_eq!(status.selected_count, 3);
    }
}

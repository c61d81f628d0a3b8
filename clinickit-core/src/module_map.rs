use crate::error::{AnnotateError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Page file names and the module identifiers their permission checks use
const DEFAULT_ENTRIES: &[(&str, &str)] = &[
    ("Appointments.jsx", "appointments"),
    ("Budgets.jsx", "budgets"),
    ("Payments.jsx", "payments"),
    ("Products.jsx", "products"),
    ("Suppliers.jsx", "suppliers"),
    ("Campaigns.jsx", "campaigns"),
    ("Exams.jsx", "exams"),
    ("MedicalRecords.jsx", "medical_records"),
    ("Prescriptions.jsx", "prescriptions"),
];

/// Mapping from page file name to module identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMap {
    entries: BTreeMap<String, String>,
}

impl ModuleMap {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add an entry. Module identifiers end up inside single-quoted string
    /// literals, so they must be non-empty and free of quotes and backslashes.
    pub fn insert(&mut self, file_name: &str, module: &str) -> std::result::Result<(), String> {
        if file_name.trim().is_empty() {
            return Err("file name must not be empty".to_string());
        }
        if module.is_empty() || module.contains(['\'', '"', '\\', '\n']) {
            return Err(format!("invalid module identifier '{}' for {}", module, file_name));
        }
        self.entries.insert(file_name.to_string(), module.to_string());
        Ok(())
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.entries.get(file_name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a JSON object of `"File.jsx": "module"` pairs
    pub fn from_json_str(json: &str) -> std::result::Result<Self, String> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| format!("not valid JSON: {}", e))?;
        let object = value
            .as_object()
            .ok_or_else(|| "expected a JSON object of file name to module".to_string())?;

        let mut map = Self::empty();
        for (file_name, module) in object {
            let module = module
                .as_str()
                .ok_or_else(|| format!("module for {} must be a string", file_name))?;
            map.insert(file_name, module)?;
        }

        if map.is_empty() {
            return Err("module map has no entries".to_string());
        }

        Ok(map)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| AnnotateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json).map_err(|reason| AnnotateError::InvalidModuleMap {
            path: path.to_path_buf(),
            reason,
        })
    }
}

impl Default for ModuleMap {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ENTRIES
                .iter()
                .map(|(file, module)| (file.to_string(), module.to_string()))
                .collect(),
        }
    }
}

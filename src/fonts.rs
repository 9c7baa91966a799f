use std::collections::BTreeSet;

/// Font-catalog collaborator: which font families are installed. Family
/// matching is case-insensitive throughout.
pub trait FontCatalog {
    fn installed_families(&self) -> &BTreeSet<String>;

    fn contains_family(&self, family: &str) -> bool {
        let wanted = family.to_lowercase();
        self.installed_families()
            .iter()
            .any(|name| name.to_lowercase() == wanted)
    }
}

/// Font catalog backed by a fixed family list, normally fed from
/// configuration.
#[derive(Debug, Clone)]
pub struct StaticFontCatalog {
    families: BTreeSet<String>,
}

impl StaticFontCatalog {
    pub fn new(families: impl IntoIterator<Item = String>) -> Self {
        StaticFontCatalog {
            families: families.into_iter().collect(),
        }
    }
}

impl Default for StaticFontCatalog {
    fn default() -> Self {
        StaticFontCatalog::new(
            [
                "Arial",
                "Helvetica",
                "Times New Roman",
                "DejaVu Sans",
                "Liberation Sans",
            ]
            .map(String::from),
        )
    }
}

impl FontCatalog for StaticFontCatalog {
    fn installed_families(&self) -> &BTreeSet<String> {
        &self.families
    }
}

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A single chemical component definition.
///
/// This carries the identifying subset of the `_chem_comp` category. The full
/// mmCIF schema has many more fields which are not needed for lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChemComp {
    /// The three-letter (or longer) component identifier, e.g. `ALA`.
    ///
    /// Identifiers are case-sensitive and unique within a dictionary.
    pub id: String,
    /// The human-readable component name, e.g. `ALANINE`.
    pub name: String,
    /// The component type, e.g. `L-PEPTIDE LINKING`.
    #[serde(rename = "type")]
    pub comp_type: String,
    /// The chemical formula, e.g. `C3 H7 N O2`.
    pub formula: String,
}

/// The in-memory dictionary mapping component identifiers to their records.
///
/// A `Dictionary` is built up once by the load pipeline and treated as
/// immutable afterwards, which makes unsynchronized concurrent reads safe.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    components: FxHashMap<String, ChemComp>,
}

impl Dictionary {
    /// Inserts a component, replacing any previous record with the same id.
    pub fn insert(&mut self, component: ChemComp) {
        self.components.insert(component.id.clone(), component);
    }

    /// Looks up a component by its case-sensitive identifier.
    pub fn get(&self, id: &str) -> Option<&ChemComp> {
        self.components.get(id)
    }

    /// The number of components in this dictionary.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl FromIterator<ChemComp> for Dictionary {
    fn from_iter<I: IntoIterator<Item = ChemComp>>(iter: I) -> Self {
        let mut dictionary = Dictionary::default();
        for component in iter {
            dictionary.insert(component);
        }
        dictionary
    }
}

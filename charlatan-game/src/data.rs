use serde::{Deserialize, Serialize};

const DEFAULT_CATEGORIES_DATA: &str = include_str!("../assets/categories.json");

/// A civil/impostor word pairing within a category.
///
/// The civil word is what everyone but the impostors sees; the impostor word
/// is a near-miss used by some table variants and kept for results screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
    pub civil: String,
    pub impostor: String,
    /// Hint candidates shown to impostors under hint mode.
    #[serde(default)]
    pub hints: Vec<String>,
}

/// A named category holding its word pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub words: Vec<WordPair>,
}

/// Container for the full word catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Lexicon {
    pub categories: Vec<Category>,
}

impl Lexicon {
    /// Create an empty lexicon (useful for tests).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            categories: Vec::new(),
        }
    }

    /// Load a lexicon from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a valid catalog.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Create a lexicon from pre-built categories.
    #[must_use]
    pub fn from_categories(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Load the catalog embedded at build time.
    #[must_use]
    pub fn load_from_static() -> Self {
        serde_json::from_str(DEFAULT_CATEGORIES_DATA).unwrap_or_default()
    }

    /// All category names in catalog order.
    #[must_use]
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a category by name.
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(|c| c.words.is_empty())
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Maximum number of records a snapshot keeps per category.
pub const MAX_ITEMS_PER_CATEGORY: usize = 3;

/// The six collectible kinds that feed a personality analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Books,
    Movies,
    Pets,
    Quotes,
    Recipes,
    Travel,
}

impl Category {
    /// Every category, in snapshot/prompt order.
    pub const ALL: [Category; 6] = [
        Category::Books,
        Category::Movies,
        Category::Pets,
        Category::Quotes,
        Category::Recipes,
        Category::Travel,
    ];

    /// Name of the backing document collection.
    pub fn collection(&self) -> &'static str {
        match self {
            Category::Books => "books",
            Category::Movies => "movies",
            Category::Pets => "pets",
            Category::Quotes => "quotes",
            Category::Recipes => "recipes",
            Category::Travel => "travels",
        }
    }

    /// Fields carried by a record of this category, in display order.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Category::Books => &["book_name", "reason"],
            Category::Movies => &["title", "type", "reason"],
            Category::Pets => &["name", "reason"],
            Category::Quotes => &["quote"],
            Category::Recipes => &["name", "reason"],
            Category::Travel => &["place_name", "reason"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Books => "books",
            Category::Movies => "movies",
            Category::Pets => "pets",
            Category::Quotes => "quotes",
            Category::Recipes => "recipes",
            Category::Travel => "travel",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s || c.collection() == s)
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

/// A normalized record: field name to string value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryRecord(BTreeMap<String, String>);

impl CategoryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Value of `field`, or the empty string when absent.
    pub fn get_or_empty(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }
}

/// Per-user top records from every category, assembled for one analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDataSnapshot {
    #[serde(default)]
    pub books: Vec<CategoryRecord>,
    #[serde(default)]
    pub movies: Vec<CategoryRecord>,
    #[serde(default)]
    pub pets: Vec<CategoryRecord>,
    #[serde(default)]
    pub quotes: Vec<CategoryRecord>,
    #[serde(default)]
    pub recipes: Vec<CategoryRecord>,
    #[serde(default)]
    pub travel: Vec<CategoryRecord>,
}

impl UserDataSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self, category: Category) -> &[CategoryRecord] {
        match category {
            Category::Books => &self.books,
            Category::Movies => &self.movies,
            Category::Pets => &self.pets,
            Category::Quotes => &self.quotes,
            Category::Recipes => &self.recipes,
            Category::Travel => &self.travel,
        }
    }

    fn slot_mut(&mut self, category: Category) -> &mut Vec<CategoryRecord> {
        match category {
            Category::Books => &mut self.books,
            Category::Movies => &mut self.movies,
            Category::Pets => &mut self.pets,
            Category::Quotes => &mut self.quotes,
            Category::Recipes => &mut self.recipes,
            Category::Travel => &mut self.travel,
        }
    }

    /// Replace a category's records, keeping at most [`MAX_ITEMS_PER_CATEGORY`].
    pub fn set(&mut self, category: Category, mut records: Vec<CategoryRecord>) {
        records.truncate(MAX_ITEMS_PER_CATEGORY);
        *self.slot_mut(category) = records;
    }

    pub fn total_records(&self) -> usize {
        Category::ALL.iter().map(|c| self.records(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }
}

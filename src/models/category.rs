use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Stem,
    Root,
    Bulb,
    Leaves,
    Fruits,
    Herb,
    Seeds,
    Vegetable,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Stem,
        Category::Root,
        Category::Bulb,
        Category::Leaves,
        Category::Fruits,
        Category::Herb,
        Category::Seeds,
        Category::Vegetable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Stem => "stem",
            Category::Root => "root",
            Category::Bulb => "bulb",
            Category::Leaves => "leaves",
            Category::Fruits => "fruits",
            Category::Herb => "herb",
            Category::Seeds => "seeds",
            Category::Vegetable => "vegetable",
        }
    }

    /// Comma-separated list of every valid category, in declaration order.
    pub fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Matching is exact: the stored catalog only ever holds the lowercase names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid category '{}'. Valid options: {}",
                    s,
                    Self::valid_values()
                )
            })
    }
}

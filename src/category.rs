//! Sprite categories and their registry key prefixes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed set of sprite categories exposed by the atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Plant,
    TallPlant,
    Crop,
    Decor,
    Item,
    Pet,
    Seed,
    Mutation,
    MutationOverlay,
    /// Matches every concrete category, searched in [`Category::CONCRETE`] order
    Any,
}

impl Category {
    /// Concrete categories in lookup order for [`Category::Any`].
    pub const CONCRETE: [Category; 9] = [
        Category::Plant,
        Category::TallPlant,
        Category::Crop,
        Category::Decor,
        Category::Item,
        Category::Pet,
        Category::Seed,
        Category::Mutation,
        Category::MutationOverlay,
    ];

    /// Registry key prefix for this category (`sprite/plant/`, ...).
    ///
    /// [`Category::Any`] has no prefix of its own.
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            Category::Plant => Some("sprite/plant/"),
            Category::TallPlant => Some("sprite/tallplant/"),
            Category::Crop => Some("sprite/crop/"),
            Category::Decor => Some("sprite/decor/"),
            Category::Item => Some("sprite/item/"),
            Category::Pet => Some("sprite/pet/"),
            Category::Seed => Some("sprite/seed/"),
            Category::Mutation => Some("sprite/mutation/"),
            Category::MutationOverlay => Some("sprite/mutation-overlay/"),
            Category::Any => None,
        }
    }

    /// Categories to search for this category, in order.
    pub fn search_order(&self) -> &'static [Category] {
        match self {
            Category::Any => &Self::CONCRETE,
            Category::Plant => &[Category::Plant],
            Category::TallPlant => &[Category::TallPlant],
            Category::Crop => &[Category::Crop],
            Category::Decor => &[Category::Decor],
            Category::Item => &[Category::Item],
            Category::Pet => &[Category::Pet],
            Category::Seed => &[Category::Seed],
            Category::Mutation => &[Category::Mutation],
            Category::MutationOverlay => &[Category::MutationOverlay],
        }
    }

    /// Build the registry key of `id` in this category.
    pub fn key(&self, id: &str) -> Option<String> {
        self.prefix().map(|p| format!("{}{}", p, id))
    }

    /// Split a registry key into its category and id.
    pub fn classify(key: &str) -> Option<(Category, &str)> {
        Self::CONCRETE.iter().find_map(|c| {
            let prefix = c.prefix()?;
            key.strip_prefix(prefix).filter(|id| !id.is_empty()).map(|id| (*c, id))
        })
    }

    /// Sprites of this category are eligible for overlay effects.
    pub fn is_tall(&self) -> bool {
        matches!(self, Category::TallPlant)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Plant => "plant",
            Category::TallPlant => "tall-plant",
            Category::Crop => "crop",
            Category::Decor => "decor",
            Category::Item => "item",
            Category::Pet => "pet",
            Category::Seed => "seed",
            Category::Mutation => "mutation",
            Category::MutationOverlay => "mutation-overlay",
            Category::Any => "any",
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
        match s.to_lowercase().as_str() {
            "plant" => Ok(Category::Plant),
            "tall-plant" | "tallplant" => Ok(Category::TallPlant),
            "crop" => Ok(Category::Crop),
            "decor" => Ok(Category::Decor),
            "item" => Ok(Category::Item),
            "pet" => Ok(Category::Pet),
            "seed" => Ok(Category::Seed),
            "mutation" => Ok(Category::Mutation),
            "mutation-overlay" => Ok(Category::MutationOverlay),
            "any" => Ok(Category::Any),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

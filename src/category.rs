//! Article categories and their per-locale display names
//!
//! Category names are static bidirectional lookup tables (enum to localized
//! slug and back), not runtime string building. English uses the canonical
//! category value itself.

use crate::locale::Locale;
use phf::phf_map;

/// The fixed category set articles are filed under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Health,
    Fitness,
    Nutrition,
    Wellness,
    Lifestyle,
    Recipes,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Health,
        Category::Fitness,
        Category::Nutrition,
        Category::Wellness,
        Category::Lifestyle,
        Category::Recipes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Health => "health",
            Category::Fitness => "fitness",
            Category::Nutrition => "nutrition",
            Category::Wellness => "wellness",
            Category::Lifestyle => "lifestyle",
            Category::Recipes => "recipes",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "health" => Some(Category::Health),
            "fitness" => Some(Category::Fitness),
            "nutrition" => Some(Category::Nutrition),
            "wellness" => Some(Category::Wellness),
            "lifestyle" => Some(Category::Lifestyle),
            "recipes" => Some(Category::Recipes),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static NAMES_ES: phf::Map<&'static str, &'static str> = phf_map! {
    "health" => "salud",
    "fitness" => "fitness",
    "nutrition" => "nutricion",
    "wellness" => "bienestar",
    "lifestyle" => "estilo-de-vida",
    "recipes" => "recetas",
};

static NAMES_FR: phf::Map<&'static str, &'static str> = phf_map! {
    "health" => "sante",
    "fitness" => "fitness",
    "nutrition" => "nutrition",
    "wellness" => "bien-etre",
    "lifestyle" => "style-de-vie",
    "recipes" => "recettes",
};

static NAMES_DE: phf::Map<&'static str, &'static str> = phf_map! {
    "health" => "gesundheit",
    "fitness" => "fitness",
    "nutrition" => "ernaehrung",
    "wellness" => "wohlbefinden",
    "lifestyle" => "lifestyle",
    "recipes" => "rezepte",
};

static NAMES_IT: phf::Map<&'static str, &'static str> = phf_map! {
    "health" => "salute",
    "fitness" => "fitness",
    "nutrition" => "nutrizione",
    "wellness" => "benessere",
    "lifestyle" => "stile-di-vita",
    "recipes" => "ricette",
};

static NAMES_PT: phf::Map<&'static str, &'static str> = phf_map! {
    "health" => "saude",
    "fitness" => "fitness",
    "nutrition" => "nutricao",
    "wellness" => "bem-estar",
    "lifestyle" => "estilo-de-vida",
    "recipes" => "receitas",
};

fn names_for(locale: Locale) -> Option<&'static phf::Map<&'static str, &'static str>> {
    match locale {
        Locale::En => None,
        Locale::Es => Some(&NAMES_ES),
        Locale::Fr => Some(&NAMES_FR),
        Locale::De => Some(&NAMES_DE),
        Locale::It => Some(&NAMES_IT),
        Locale::Pt => Some(&NAMES_PT),
    }
}

/// URL-safe display name of a category in the given locale.
pub fn localized_name(category: Category, locale: Locale) -> &'static str {
    match names_for(locale) {
        Some(map) => map.get(category.as_str()).copied().unwrap_or(category.as_str()),
        None => category.as_str(),
    }
}

/// Reverse lookup: localized name back to the category.
///
/// The canonical English value is accepted in every locale so canonical
/// URLs keep working on localized routes.
pub fn from_localized(name: &str, locale: Locale) -> Option<Category> {
    if let Some(category) = Category::parse(name) {
        return Some(category);
    }
    let map = names_for(locale)?;
    for category in Category::ALL {
        if map.get(category.as_str()) == Some(&name) {
            return Some(category);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_bidirectional_and_total() {
        for locale in Locale::ALL {
            for category in Category::ALL {
                let name = localized_name(category, locale);
                assert!(!name.is_empty());
                assert_eq!(
                    from_localized(name, locale),
                    Some(category),
                    "round trip failed for {} in {}",
                    category,
                    locale
                );
            }
        }
    }

    #[test]
    fn canonical_value_accepted_in_any_locale() {
        assert_eq!(from_localized("health", Locale::Fr), Some(Category::Health));
        assert_eq!(from_localized("sante", Locale::Fr), Some(Category::Health));
        assert_eq!(from_localized("sante", Locale::Es), None);
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(from_localized("astrology", Locale::En), None);
    }
}

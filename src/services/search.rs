//! Client-side product search.

use crate::domain::product::Product;

/// Fields a search query is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchScope {
    pub name: bool,
    pub category: bool,
    pub description: bool,
}

impl SearchScope {
    pub const ALL: Self = Self {
        name: true,
        category: true,
        description: true,
    };

    pub const NAME: Self = Self {
        name: true,
        category: false,
        description: false,
    };
}

impl Default for SearchScope {
    fn default() -> Self {
        Self::ALL
    }
}

/// Products whose in-scope fields contain `query`, ignoring case.
///
/// A blank query yields no results rather than the whole list: nothing is
/// shown until the user types something. Order follows `products`.
pub fn search_products(products: &[Product], query: &str, scope: SearchScope) -> Vec<Product> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    let contains = |value: &str| value.to_lowercase().contains(&needle);

    products
        .iter()
        .filter(|p| {
            (scope.name && contains(p.name.as_str()))
                || (scope.category && p.category.as_deref().is_some_and(contains))
                || (scope.description && contains(&p.description))
        })
        .cloned()
        .collect()
}

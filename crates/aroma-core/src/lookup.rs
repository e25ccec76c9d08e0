//! # Lookups
//!
//! The engine never fetches anything. Costing and validation are handed the
//! referenced records through a [`Lookup`], which the caller fills from
//! storage (a `HashMap` built with [`index_by_id`]) or from a plain slice.
//!
//! ```text
//!   aroma-db                        aroma-core
//!   ─────────                       ──────────
//!   fetch ingredients by id ──►  HashMap<String, Ingredient>
//!                                       │ impl Lookup<Ingredient>
//!                                       ▼
//!                               recipe_total_cost(entries, &map)
//! ```

use std::collections::HashMap;

/// Anything with a string id.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Resolves an id to a record, or `None` when it is unknown.
pub trait Lookup<T> {
    fn lookup(&self, id: &str) -> Option<&T>;
}

impl<T> Lookup<T> for HashMap<String, T> {
    fn lookup(&self, id: &str) -> Option<&T> {
        self.get(id)
    }
}

impl<T: Identified> Lookup<T> for [T] {
    fn lookup(&self, id: &str) -> Option<&T> {
        self.iter().find(|item| item.id() == id)
    }
}

impl<T: Identified> Lookup<T> for Vec<T> {
    fn lookup(&self, id: &str) -> Option<&T> {
        self.as_slice().lookup(id)
    }
}

/// Indexes records by id. Later duplicates replace earlier ones.
pub fn index_by_id<T: Identified>(items: impl IntoIterator<Item = T>) -> HashMap<String, T> {
    items
        .into_iter()
        .map(|item| (item.id().to_string(), item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Thing(&'static str);

    impl Identified for Thing {
        fn id(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_slice_and_map_lookup_agree() {
        let things = vec![Thing("a"), Thing("b")];
        assert_eq!(things.lookup("b"), Some(&Thing("b")));
        assert_eq!(things.lookup("z"), None);

        let map = index_by_id(things);
        assert_eq!(map.lookup("a"), Some(&Thing("a")));
        assert_eq!(map.lookup("z"), None);
    }
}

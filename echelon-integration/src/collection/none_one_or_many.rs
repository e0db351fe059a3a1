use serde::{Deserialize, Serialize};

/// Sibling of [`OneOrMany`](super::one_or_many::OneOrMany) that additionally represents the
/// empty case, useful for optional config fields (eg/ `invite_list`) that may be absent, a
/// single value, or a collection.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum NoneOneOrMany<T> {
    None,
    One(T),
    Many(Vec<T>),
}

impl<T> Default for NoneOneOrMany<T> {
    fn default() -> Self {
        Self::None
    }
}

impl<T> NoneOneOrMany<T> {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::None => Vec::new(),
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

impl<T> FromIterator<T> for NoneOneOrMany<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = iter.into_iter().collect::<Vec<_>>();
        match collection.len() {
            0 => Self::None,
            1 => Self::One(collection.swap_remove(0)),
            _ => Self::Many(collection),
        }
    }
}

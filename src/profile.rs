use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

/// User profile carried inside the session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default, deserialize_with = "deserialize_favorites")]
    pub favorites: Vec<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

impl Profile {
    pub fn is_favorite(&self, request_id: i32) -> bool {
        self.favorites.contains(&request_id)
    }

    pub fn toggled_favorites(&self, request_id: i32) -> Vec<i32> {
        toggle_favorite(&self.favorites, request_id)
    }
}

/// Returns the favorites list with `request_id` removed if present, appended otherwise.
pub fn toggle_favorite(favorites: &[i32], request_id: i32) -> Vec<i32> {
    match favorites.iter().position(|id| *id == request_id) {
        Some(index) => {
            let mut updated = favorites.to_vec();
            updated.remove(index);
            updated
        }
        None => {
            let mut updated = Vec::with_capacity(favorites.len() + 1);
            updated.extend_from_slice(favorites);
            updated.push(request_id);
            updated
        }
    }
}

// The server persists favorites as "1,2,3" and may hand back either that
// string, a real array, or null.
fn deserialize_favorites<'de, D>(deserializer: D) -> Result<Vec<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FavoritesVisitor;

    impl<'de> Visitor<'de> for FavoritesVisitor {
        type Value = Vec<i32>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of request ids, a comma-separated string, or null")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
            deserializer.deserialize_any(FavoritesVisitor)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            value
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| part.parse::<i32>().map_err(E::custom))
                .collect()
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut ids = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(id) = seq.next_element::<i32>()? {
                ids.push(id);
            }
            Ok(ids)
        }
    }

    deserializer.deserialize_option(FavoritesVisitor)
}

use std::sync::Arc;

use serde::{Deserialize, Deserializer};

/// A selectable breed as returned by `GET /breeds`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Breed {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub name: String,
}

impl Breed {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The API returns numeric ids; accept strings too.
fn id_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Num(i64),
        Str(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Num(n) => n.to_string(),
        RawId::Str(s) => s,
    })
}

/// Breeds fetched once at startup. Read-only afterwards and cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct BreedCatalog {
    breeds: Arc<[Breed]>,
}

impl BreedCatalog {
    pub fn new(breeds: Vec<Breed>) -> Self {
        Self {
            breeds: breeds.into(),
        }
    }

    pub fn breeds(&self) -> &[Breed] {
        &self.breeds
    }

    pub fn len(&self) -> usize {
        self.breeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breeds.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Breed> {
        self.breeds.iter().find(|b| b.id == id)
    }
}

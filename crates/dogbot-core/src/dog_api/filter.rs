use std::collections::BTreeMap;

/// What kind of image a send asks for.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageFilter {
    pub breed: Option<String>,
    pub want_gif: bool,
}

impl ImageFilter {
    pub fn random() -> Self {
        Self::default()
    }

    pub fn gif() -> Self {
        Self {
            breed: None,
            want_gif: true,
        }
    }

    pub fn breed(id: impl Into<String>) -> Self {
        Self {
            breed: Some(id.into()),
            want_gif: false,
        }
    }

    /// Breed id to filter on, ignoring blank ids.
    pub fn breed_id(&self) -> Option<&str> {
        self.breed
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }

    /// Value recorded in the delivery log's `breed` column.
    pub fn breed_label(&self) -> String {
        self.breed_id().unwrap_or("random").to_string()
    }

    /// Query parameters for the image search endpoint.
    ///
    /// A breed always wins and drops the media-type filter; otherwise gifs are
    /// requested when asked for, and static jpg/png images by default.
    pub fn query_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        if let Some(breed) = self.breed_id() {
            params.insert("breed_ids".to_string(), breed.to_string());
        } else if self.want_gif {
            params.insert("mime_types".to_string(), "gif".to_string());
        } else {
            params.insert("mime_types".to_string(), "jpg,png".to_string());
        }
        params
    }
}

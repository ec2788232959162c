//! Breed picker keyboard.
//!
//! Breeds are shuffled once per keyboard and laid out three per row. The
//! shuffle seed travels in the page-turn callback data so every page of one
//! keyboard comes from the same ordering.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use dogbot_core::{
    dog_api::{Breed, BreedCatalog},
    messaging::types::{InlineButton, InlineKeyboard},
};

pub const BREEDS_PER_ROW: usize = 3;
pub const CHOOSE_PROMPT: &str = "Please choose:";

const BREED_PREFIX: &str = "breed:";
const PAGE_PREFIX: &str = "breeds:";

/// Parsed callback data of a breed keyboard button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Breed { id: String },
    Page { seed: u64, page: usize },
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(id) = data.strip_prefix(BREED_PREFIX) {
            let id = id.trim();
            if id.is_empty() {
                return None;
            }
            return Some(Self::Breed { id: id.to_string() });
        }

        let rest = data.strip_prefix(PAGE_PREFIX)?;
        let (seed, page) = rest.split_once(':')?;
        Some(Self::Page {
            seed: seed.parse().ok()?,
            page: page.parse().ok()?,
        })
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Breed { id } => format!("{BREED_PREFIX}{id}"),
            Self::Page { seed, page } => format!("{PAGE_PREFIX}{seed}:{page}"),
        }
    }
}

pub fn new_seed() -> u64 {
    rand::random()
}

pub fn shuffled(catalog: &BreedCatalog, seed: u64) -> Vec<&Breed> {
    let mut breeds: Vec<&Breed> = catalog.breeds().iter().collect();
    breeds.shuffle(&mut StdRng::seed_from_u64(seed));
    breeds
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BreedPager {
    pub seed: u64,
    pub rows_per_page: usize,
}

impl BreedPager {
    pub fn new(seed: u64, rows_per_page: usize) -> Self {
        Self {
            seed,
            rows_per_page: rows_per_page.max(1),
        }
    }

    pub fn per_page(&self) -> usize {
        self.rows_per_page * BREEDS_PER_ROW
    }

    /// Number of pages, never zero.
    pub fn page_count(&self, catalog: &BreedCatalog) -> usize {
        catalog.len().div_ceil(self.per_page()).max(1)
    }

    pub fn prompt(&self, catalog: &BreedCatalog, page: usize) -> String {
        let pages = self.page_count(catalog);
        if pages == 1 {
            return CHOOSE_PROMPT.to_string();
        }
        let page = page.min(pages - 1);
        format!("{CHOOSE_PROMPT} (page {}/{pages})", page + 1)
    }

    /// Keyboard for `page` (clamped to the last page), with a navigation row
    /// when there is more than one page.
    pub fn keyboard(&self, catalog: &BreedCatalog, page: usize) -> InlineKeyboard {
        let pages = self.page_count(catalog);
        let page = page.min(pages - 1);

        let buttons = shuffled(catalog, self.seed)
            .into_iter()
            .skip(page * self.per_page())
            .take(self.per_page())
            .map(|b| {
                InlineButton::new(
                    b.name.clone(),
                    CallbackAction::Breed { id: b.id.clone() }.encode(),
                )
            })
            .collect();
        let mut keyboard = InlineKeyboard::grid(buttons, BREEDS_PER_ROW);

        let mut nav = Vec::new();
        if page > 0 {
            nav.push(InlineButton::new(
                "« Prev",
                CallbackAction::Page {
                    seed: self.seed,
                    page: page - 1,
                }
                .encode(),
            ));
        }
        if page + 1 < pages {
            nav.push(InlineButton::new(
                "Next »",
                CallbackAction::Page {
                    seed: self.seed,
                    page: page + 1,
                }
                .encode(),
            ));
        }
        keyboard.push_row(nav);
        keyboard
    }
}

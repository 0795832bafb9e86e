//! Deterministic complaint body generation from curated templates.
//!
//! Templates are authored in Arabic and English, mixed the way they appear
//! on Egyptian social media. All generation is deterministic
//! (same RNG seed = same text).

use crate::{config::ComplaintCategory, rng::StreamRng};

/// Placeholder substituted with the complaint's governorate.
pub const LOCATION_TOKEN: &str = "{location}";

pub struct ComplaintTextGenerator;

impl ComplaintTextGenerator {
    /// Pick one of the category's templates and fill in the location.
    pub fn generate(rng: &mut StreamRng, category: &ComplaintCategory, location: &str) -> String {
        let template = rng
            .pick(&category.templates)
            .map(String::as_str)
            .unwrap_or_default();
        Self::render(template, location)
    }

    /// Substitute every location token. Templates without a token pass through.
    pub fn render(template: &str, location: &str) -> String {
        template.replace(LOCATION_TOKEN, location)
    }
}

//! Complaint generator: the leaf stage of the pipeline.
//!
//! Produces exactly N synthetic complaint records:
//!   - operator drawn by market share
//!   - category drawn uniformly, then one of its templates
//!   - governorate attached with `location_probability`, else "Unknown"
//!   - date uniform over the trailing window ending at `now`
//!   - sentiment uniform over the configured (negative-skewed) range
//!   - likes / replies uniform over small bounded ranges
//!
//! Every attribute draws from its own RNG stream, so generation is fully
//! reproducible from (seed, now).

use crate::{
    complaint_text::ComplaintTextGenerator,
    config::PulseConfig,
    error::{PulseError, PulseResult},
    rng::{RngBank, StreamRng, StreamSlot},
    types::{round3, ComplaintId, UNKNOWN_LOCATION},
};
use chrono::{Days, NaiveDate, NaiveDateTime};
use rand::distributions::WeightedIndex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplaintRecord {
    pub complaint_id: ComplaintId,
    pub operator: String,
    pub complaint_text: String,
    pub complaint_category: String,
    pub sentiment_score: f64,
    pub date: NaiveDate,
    pub governorate: String,
    pub likes: u32,
    pub replies: u32,
    pub source: String,
    pub collection_timestamp: NaiveDateTime,
}

impl ComplaintRecord {
    pub fn has_known_location(&self) -> bool {
        self.governorate != UNKNOWN_LOCATION
    }
}

struct GeneratorStreams {
    operator: StreamRng,
    category: StreamRng,
    template: StreamRng,
    location: StreamRng,
    date: StreamRng,
    sentiment: StreamRng,
    engagement: StreamRng,
}

impl GeneratorStreams {
    fn from_bank(bank: &RngBank) -> Self {
        Self {
            operator: bank.for_stream(StreamSlot::Operator),
            category: bank.for_stream(StreamSlot::Category),
            template: bank.for_stream(StreamSlot::Template),
            location: bank.for_stream(StreamSlot::Location),
            date: bank.for_stream(StreamSlot::Date),
            sentiment: bank.for_stream(StreamSlot::Sentiment),
            engagement: bank.for_stream(StreamSlot::Engagement),
        }
    }
}

pub struct ComplaintGenerator {
    config: PulseConfig,
    operator_weights: WeightedIndex<f64>,
    streams: GeneratorStreams,
}

impl ComplaintGenerator {
    pub fn new(config: PulseConfig, bank: &RngBank) -> PulseResult<Self> {
        config.validate()?;
        let operator_weights = WeightedIndex::new(config.operators.iter().map(|op| op.market_share))
            .map_err(|e| PulseError::Config {
                reason: format!("operator market shares: {e}"),
            })?;
        Ok(Self {
            config,
            operator_weights,
            streams: GeneratorStreams::from_bank(bank),
        })
    }

    /// Generate `count` complaints with ids 1..=count. `count == 0` yields
    /// an empty collection.
    pub fn generate(
        &mut self,
        count: usize,
        now: NaiveDateTime,
    ) -> PulseResult<Vec<ComplaintRecord>> {
        let mut complaints = Vec::with_capacity(count);
        for i in 0..count {
            complaints.push(self.make_complaint(i as ComplaintId + 1, now)?);
        }
        log::info!(
            "generated {} complaints over a {}-day window ending {}",
            complaints.len(),
            self.config.generator.window_days,
            now.date(),
        );
        Ok(complaints)
    }

    fn make_complaint(
        &mut self,
        complaint_id: ComplaintId,
        now: NaiveDateTime,
    ) -> PulseResult<ComplaintRecord> {
        let settings = &self.config.generator;
        let streams = &mut self.streams;

        let operator_idx = streams.operator.weighted(&self.operator_weights);
        let operator = self.config.operators[operator_idx].id.clone();

        let category = streams
            .category
            .pick(&self.config.categories)
            .ok_or_else(|| PulseError::Config {
                reason: "no complaint categories configured".into(),
            })?;

        let governorate = if streams.location.chance(settings.location_probability) {
            streams
                .location
                .pick(&self.config.governorates)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
        } else {
            UNKNOWN_LOCATION.to_string()
        };

        let complaint_text =
            ComplaintTextGenerator::generate(&mut streams.template, category, &governorate);

        let days_back = streams.date.next_u64_below(settings.window_days + 1);
        let anchor = now.date();
        let date = anchor
            .checked_sub_days(Days::new(days_back))
            .ok_or(PulseError::DateOutOfRange {
                anchor,
                days: days_back,
            })?;

        let sentiment_score = round3(
            streams
                .sentiment
                .uniform(settings.sentiment_min, settings.sentiment_max),
        );

        let likes = streams.engagement.uniform_u32(0, settings.likes_max);
        let replies = streams.engagement.uniform_u32(0, settings.replies_max);

        Ok(ComplaintRecord {
            complaint_id,
            operator,
            complaint_text,
            complaint_category: category.id.clone(),
            sentiment_score,
            date,
            governorate,
            likes,
            replies,
            source: settings.source_tag.clone(),
            collection_timestamp: now,
        })
    }
}

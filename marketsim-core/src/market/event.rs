//! Market event model.
//!
//! Maps a named event to a signed price-impact fraction and applies it to a
//! base quote. The mapping is total: tags this model does not recognize have
//! zero impact, so composite simulations never fail on an event name.

use crate::domain::{Quote, PRICE_FLOOR};

/// Volume multiplier applied around a recognized event.
const EVENT_VOLUME_MULT: f64 = 2.0;
/// Book-size multiplier applied around a recognized event.
const EVENT_BOOK_MULT: f64 = 1.5;

/// Event categories with a known price impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketEventKind {
    EarningsBeat,
    EarningsMiss,
    EconomicPositive,
    EconomicNegative,
    MergerAnnouncement,
    RegulatoryIssue,
}

impl MarketEventKind {
    /// `None` for tags the model does not recognize; callers treat that as
    /// zero impact.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "EARNINGS_BEAT" => Some(Self::EarningsBeat),
            "EARNINGS_MISS" => Some(Self::EarningsMiss),
            "ECONOMIC_POSITIVE" => Some(Self::EconomicPositive),
            "ECONOMIC_NEGATIVE" => Some(Self::EconomicNegative),
            "MERGER_ANNOUNCEMENT" => Some(Self::MergerAnnouncement),
            "REGULATORY_ISSUE" => Some(Self::RegulatoryIssue),
            _ => None,
        }
    }

    /// Signed impact fraction at magnitude 1.0.
    pub fn base_impact(&self) -> f64 {
        match self {
            Self::EarningsBeat => 0.05,
            Self::EarningsMiss => -0.06,
            Self::EconomicPositive => 0.02,
            Self::EconomicNegative => -0.025,
            Self::MergerAnnouncement => 0.12,
            Self::RegulatoryIssue => -0.08,
        }
    }
}

/// Apply a named event at `magnitude` to `quote`, returning the post-event
/// quote.
///
/// Prices scale by the event's signed impact fraction and are clamped to a
/// strictly positive floor; volume and book sizes scale up to reflect the
/// increased activity around the event. Unrecognized tags and non-positive
/// magnitudes leave the quote unchanged.
pub fn apply_event(quote: &Quote, event_tag: &str, magnitude: f64) -> Quote {
    let impact = MarketEventKind::parse(event_tag)
        .map(|kind| kind.base_impact() * magnitude.max(0.0))
        .unwrap_or(0.0);

    if impact == 0.0 {
        return quote.clone();
    }

    let scale = |price: f64| (price * (1.0 + impact)).max(PRICE_FLOOR);

    let mut shocked = quote.clone();
    shocked.open = scale(quote.open);
    shocked.high = scale(quote.high);
    shocked.low = scale(quote.low);
    shocked.close = scale(quote.close);
    shocked.bid = scale(quote.bid);
    shocked.ask = scale(quote.ask).max(shocked.bid);
    shocked.volume = (quote.volume as f64 * EVENT_VOLUME_MULT) as u64;
    shocked.bid_size = (quote.bid_size as f64 * EVENT_BOOK_MULT) as u64;
    shocked.ask_size = (quote.ask_size as f64 * EVENT_BOOK_MULT) as u64;
    shocked
}

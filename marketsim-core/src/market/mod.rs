//! Market data simulation — quote generation and event shocks.

pub mod event;
pub mod generator;

pub use event::{apply_event, MarketEventKind};
pub use generator::{MarketCondition, PriceTable, QuoteGenerator, QuoteSeries};

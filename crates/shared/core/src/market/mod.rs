//! Market data pushed by the broker: ticks, sentiment, candles, signals and
//! the instrument list.

mod candle;
mod instrument;
mod signal;
mod tick;

pub use candle::{Candle, CandleHistory, CandleSeries};
pub use instrument::Instrument;
pub use signal::SignalRecord;
pub use tick::{Sentiment, Tick};

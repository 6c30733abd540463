//! 외부 소스 수집기.

pub mod fundamental;
pub mod news;
pub mod price;

pub use fundamental::{process_statements, FundamentalCollector};
pub use news::NewsCollector;
pub use price::{PriceCollector, DEFAULT_LOOKBACK_DAYS};

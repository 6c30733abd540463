//! 수집 파이프라인의 도메인 모델.

mod analysis;
mod fundamental;
mod news;
mod price;
mod scraping;
mod symbol;

pub use analysis::*;
pub use fundamental::*;
pub use news::*;
pub use price::*;
pub use scraping::*;
pub use symbol::*;

//! Free phone-number inventory and endpoint registration

pub mod endpoints;
pub mod extract;
pub mod fallback;
pub mod fetcher;
pub mod normalize;
pub mod phone;
pub mod snapshot;
pub mod stats;

pub use fetcher::{fetch_available_numbers, FetchReport, PageFetcher};
pub use phone::PhoneNumberSet;

//! Pattern based extraction of scheduling details from free text.
pub mod datetime;
pub mod slots;
pub mod timezone;

pub use datetime::{LONG_DATETIME, Resolution, ResolvedTime, format_datetime, resolve_datetime};
pub use slots::{Platform, Slots, is_confirmation};
pub use timezone::extract_timezone;

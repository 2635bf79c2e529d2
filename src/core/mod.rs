//! Pure domain logic: analytics bucketing, slugs and the dictation assistant.

pub mod ai;
pub mod data;
pub mod slug;

//! Announcement System
//!
//! Turns the stream of state changes from every detector into a coherent,
//! non-overlapping sequence of spoken messages: per-category toggles and
//! cooldowns, priority arbitration, one message in flight at a time.

mod announcement;
mod queue;

pub use announcement::{Announcement, Category, Priority};
pub use queue::{AnnounceOutcome, AnnouncementConfig, AnnouncementQueue, CategoryState};

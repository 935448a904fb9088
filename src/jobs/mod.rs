//! Scheduled background jobs.
//!
//! - `daily_update_job`: weekday close-of-day refresh of prices, news and
//!   the earnings calendar for every watchlist ticker.
//! - `weekly_brief_job`: Sunday evening run that regenerates
//!   recommendations and writes the weekly markdown brief.

pub mod daily_update_job;
pub mod weekly_brief_job;

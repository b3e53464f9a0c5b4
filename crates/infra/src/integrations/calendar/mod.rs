//! Google Calendar integration
//!
//! Implements the `CalendarProvider` port over the Calendar v3 REST API:
//! event writes tagged with the appointment marker, the `syncToken` change
//! feed, and `events.watch` / `channels.stop` push channels.

pub mod auth;
pub mod google;
pub mod types;

pub use auth::AccessTokenSource;
pub use google::GoogleCalendarClient;

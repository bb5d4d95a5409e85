//! Helpers shared by commands and scheduled tasks. Everything but `ratelimit`
//! is pure and doesn't touch Discord.

pub mod datetime;
pub mod message_formatter;
pub mod messages;
pub mod ratelimit;
pub mod role_logic;
pub mod string_utils;
pub mod timezone;
pub mod validation;

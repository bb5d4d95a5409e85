/// Long-lived services shared through `Data`
pub mod birthday_cacher;
pub mod guild_birthdays;
pub mod weeb;

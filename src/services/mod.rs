pub mod accounts;
pub mod media;

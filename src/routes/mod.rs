pub mod analytics;
pub mod application;
pub mod health;
pub mod interview;

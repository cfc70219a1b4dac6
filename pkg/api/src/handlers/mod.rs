pub mod alerts;
pub mod health;
pub mod report;
pub mod slack;

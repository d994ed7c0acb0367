pub mod analytics;
pub mod health;
pub mod realtime;
pub mod sites;
pub mod track;

pub mod access;
pub mod api;
pub mod db;
pub mod export;
pub mod integrations;
pub mod models;
pub mod realtime;
pub mod workflow;

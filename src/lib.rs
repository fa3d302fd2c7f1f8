//! Proof-of-participation tokens for events, with achievements, points,
//! levels and streaks layered on top.

pub mod achievements;
pub mod app_config;
pub mod cache;
pub mod chain;
pub mod db;
pub mod models;
pub mod orm;
pub mod stats;
pub mod store;
pub mod web;

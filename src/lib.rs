//! Campaign collaboration backend for a tabletop-RPG SaaS.
//!
//! The crate is split the usual way: `db` owns the Postgres schema and
//! queries, `game` holds the pure table-top rules (dice, invite codes,
//! character-sheet math), `service` enforces who may do what, and `http`
//! is the actix-web surface on top.

pub mod config;
pub mod db;
pub mod error;
pub mod game;
pub mod generator;
pub mod http;
pub mod metrics;
pub mod service;

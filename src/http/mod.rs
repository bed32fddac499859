pub mod auth;
pub mod campaigns;
pub mod characters;
pub mod dice;
pub mod extract;
pub mod health;
pub mod pcs;
pub mod response;
pub mod routes;

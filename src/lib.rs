#![doc = "The `toytrader` library crate."]
#![doc = ""]
#![doc = "A small marketplace where users register, sign in and list toys for rent or sale."]
#![doc = "The crate holds the domain models, the user and listing stores, sessions with flash"]
#![doc = "messages, image uploads, the access guards and the HTTP routes. The binary"]
#![doc = "(`main.rs`) wires them into a running server."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;
pub mod upload;
pub mod views;

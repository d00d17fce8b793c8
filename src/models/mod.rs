//! Domain models and request/response DTOs

pub mod audit;
pub mod auth;
pub mod billing;
pub mod business;
pub mod category;
pub mod customer;
pub mod damaged;
pub mod inventory;
pub mod notification;
pub mod product;
pub mod sale;
pub mod user;

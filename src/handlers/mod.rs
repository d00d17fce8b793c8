//! HTTP handlers.
//! Thin layer over repositories and services: extract, authorize,
//! delegate, shape the response.

pub mod admin;
pub mod auth;
pub mod business;
pub mod business_payment;
pub mod category;
pub mod customer;
pub mod damaged;
pub mod health;
pub mod inventory;
pub mod metrics;
pub mod notification;
pub mod product;
pub mod sale;
pub mod user;

use serde::Serialize;

/// Paginated list envelope
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        Self {
            items,
            total,
            page,
            limit,
        }
    }
}

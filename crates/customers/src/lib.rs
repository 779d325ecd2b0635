//! `ordermill-customers` — the Customer entity and its input validation.

pub mod customer;

pub use customer::{Customer, CustomerPatch, NewCustomer};

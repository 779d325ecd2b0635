//! `ordermill-products` — the Product entity and its input validation.

pub mod product;

pub use product::{NewProduct, Product, ProductPatch};

#![cfg(not(doctest))]

#[macro_use]
extern crate diesel;

pub mod aggregation;
pub mod categories;
pub mod db;
pub mod models;
pub mod money;
pub mod partner;
pub mod recurrence;
pub mod request_io;
pub mod schema;
pub mod threadrand;
pub mod token;
pub mod validators;

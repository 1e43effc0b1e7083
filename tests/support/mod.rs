#![allow(dead_code)]

pub mod fake_catalog;
pub mod socket_guard;

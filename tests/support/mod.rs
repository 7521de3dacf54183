#![allow(dead_code)]

pub mod bugs;
pub mod env;

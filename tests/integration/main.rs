//! Integration tests exercising the crate end-to-end against mock sites

mod api_tests;
mod common;
mod crawl_tests;

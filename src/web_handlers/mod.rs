pub mod interfaces;
pub mod pages;

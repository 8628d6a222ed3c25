pub mod family_link;
pub mod repository;
pub mod service;

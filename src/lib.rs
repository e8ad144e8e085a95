pub mod controller;
pub mod domain;
pub mod fetch;
pub mod inputter;
pub mod loader;
pub mod model;
pub mod pages;
pub mod table;
pub mod ui;

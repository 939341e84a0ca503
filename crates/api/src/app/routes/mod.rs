pub mod access;
pub mod admin;
pub mod menu;
pub mod system;

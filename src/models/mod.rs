pub mod cart;
pub mod catalog;
pub mod category;
pub mod common;
pub mod contact;
pub mod guest;
pub mod newsletter;
pub mod order;
pub mod report;
pub mod user;

pub mod auth_service;
pub mod cart_service;
pub mod catalog_service;
pub mod category_service;
pub mod contact_service;
pub mod guest_service;
pub mod image_store;
pub mod mailer;
pub mod maintenance_service;
pub mod newsletter_service;
pub mod order_service;
pub mod report_service;
pub mod user_service;

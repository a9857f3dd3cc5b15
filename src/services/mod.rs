pub mod billing_views;
pub mod formatting;
pub mod portal_api;
pub mod registration;
pub mod stay_cost;

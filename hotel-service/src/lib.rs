pub mod account_handlers;
pub mod accounts;
pub mod app;
pub mod auth_handlers;
pub mod catalog;
pub mod config;
pub mod customer_handlers;
pub mod employee_handlers;
pub mod gate;
pub mod inventory_handlers;
pub mod issue_handlers;
pub mod menu_handlers;
pub mod metrics;
pub mod purchase_handlers;
pub mod records;
pub mod routes;
pub mod units;
pub mod validation;

pub use app::AppState;
pub use routes::build_router;

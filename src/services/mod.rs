pub mod auth_service;
pub mod ledger;
pub mod portfolio_service;
pub mod quote_service;
pub mod session_service;
pub mod trade_service;

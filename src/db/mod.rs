pub mod holding_queries;
pub mod order_queries;
pub mod session_queries;
pub mod user_queries;

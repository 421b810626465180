mod forms;
mod holding;
pub mod money;
mod order;
mod portfolio;
mod user;

pub use forms::{CashForm, LoginForm, QuoteForm, RegisterForm, TradeForm};
pub use holding::Holding;
pub use order::{NewOrder, Order, Side};
pub use portfolio::{HoldingLine, PortfolioView, QuoteView};
pub use user::{User, UserSummary};

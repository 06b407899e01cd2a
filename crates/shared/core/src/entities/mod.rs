mod account;
mod deal;
mod order;
mod order_status;
mod session;

pub use account::{Balance, Profile};
pub use deal::Deal;
pub use order::{Direction, OrderKind, PendingOrder};
pub use order_status::OrderStatus;
pub use session::Session;

pub mod session;
pub mod transaction_store;

#[cfg(test)]
mod test;

pub use session::{PaymentSession, PaymentStatus, TokenOption};
pub use transaction_store::{CycleKind, StoreHealth, StoreSnapshot, TransactionStore};

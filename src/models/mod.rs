pub mod user;

pub use user::{
    Investment, Transaction, TransactionKind, TransactionStatus, TrendingStock, User,
    UserValidationError, Wallets,
};

pub mod balance;
pub mod evaluate;
pub mod genetic;
pub mod inspect;

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod competition;
pub mod designs;
pub mod orders;
pub mod products;

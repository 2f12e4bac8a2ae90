pub mod checkout;
pub mod packages;
pub mod payments;
pub mod programs;
pub mod root;
pub mod webhooks;

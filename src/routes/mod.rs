pub(crate) mod assets;
pub(crate) mod health;
pub(crate) mod holdings;
pub(crate) mod market;
pub(crate) mod portfolios;
pub(crate) mod transactions;

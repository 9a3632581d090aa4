pub mod account_index;
pub mod chain_rpc;
mod http;
pub mod price_quote;

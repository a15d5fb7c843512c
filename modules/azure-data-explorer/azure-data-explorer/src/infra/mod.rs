pub mod credentials;
pub mod http;
pub mod kusto_client;

// Infrastructure layer - External dependencies and adapters
pub mod api_error;
pub mod chunked_json;
pub mod config;
pub mod http_response;
pub mod nasa_client;
pub mod openaq_client;
pub mod preference_store;
#[cfg(test)]
pub mod test_support;
pub mod webhook_client;

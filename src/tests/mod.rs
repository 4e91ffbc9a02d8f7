#[cfg(test)]
pub mod common;

mod identity_provider_flows;

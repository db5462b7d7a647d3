//! HTTP adapter for the external impact-model service.

mod impact_model_client;

pub use impact_model_client::HttpImpactModel;

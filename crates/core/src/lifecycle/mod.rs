pub mod detector;
pub mod model;
pub mod model_context;
pub mod model_factory;
pub mod predictor;
#[cfg(test)]
pub(crate) mod test_support;
pub mod weight_slot;

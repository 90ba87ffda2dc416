pub mod option_bag;
pub mod resolver;
pub mod training_config;

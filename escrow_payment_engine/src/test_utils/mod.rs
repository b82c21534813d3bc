pub mod memory_gateway;
pub mod prepare_env;
pub mod seed;

pub mod model;
pub mod snowflake;
pub mod validation;

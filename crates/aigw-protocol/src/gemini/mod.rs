pub mod generate_content;
pub mod models;
pub mod types;

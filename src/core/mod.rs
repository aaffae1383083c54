pub mod db;
pub mod errors;
pub mod helpers;
pub mod multipart;
pub mod query_params;

pub mod db;
pub mod options;
pub mod transient;

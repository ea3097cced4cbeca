pub mod threading;

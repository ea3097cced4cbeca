#[macro_use]
extern crate log;

pub mod config;
pub mod driver;
pub mod gate;
pub mod utils;
pub mod worker;

use std::process;

use config::{Config, ConfigError};

fn main() {
    env_logger::init();

    let config = match Config::from_args(std::env::args_os()) {
        Ok(config) => config,
        Err(ConfigError::Arguments(e)) if !e.use_stderr() => {
            // --help and --version
            print!("{}", e);
            return;
        }
        Err(e) => {
            debug!("Rejected arguments: {:?}", e);
            println!("{}", e);
            process::exit(1);
        }
    };

    println!("Executing... please wait...");

    match driver::run(&config, |report| println!("{}", report)) {
        Ok(summary) => println!("Final counter = {}", summary.final_counter),
        Err(e) => {
            error!("{}", e);
            println!("{}", e);
            process::exit(1);
        }
    }
}

use std::{env, process::ExitCode};

use anyhow::Context;
use tokio::runtime;

use tcp_stress_tool::RunConfig;

const BANNER: &str = "\
This tool will spawn a number of TCP clients and will request
the tflite server to run an inference on random data.

Usage:
tcp-stress-tool [server ip] [server port] [number of clients]
";

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("{BANNER}");

    let config = match RunConfig::from_args(env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("Using:\n{config}\n");

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let summary = runtime.block_on(tcp_stress_tool::run(config));

    println!("\n----------------------");
    println!("{summary}");

    Ok(ExitCode::SUCCESS)
}

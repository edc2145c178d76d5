//! Basic example: print the device's output to stdout
//!
//! Opens one handle, optionally writes a pattern to it, then copies a
//! number of bytes of the repeated output to stdout.
//!
//! # Usage
//!
//! Default `y` lines:
//! ```bash
//! cargo run --example yes -- --bytes 20
//! ```
//!
//! Custom pattern:
//! ```bash
//! cargo run --example yes -- --pattern "no" --bytes 30
//! ```

use std::env;
use std::io::{self, Read, Write};

use yesdev::DeviceBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=trace for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let device = DeviceBuilder::new("yes")
        .minimum_size(args.minimum_size)
        .build()?;
    let mut file = device.open_file();

    if let Some(pattern) = &args.pattern {
        file.write_all(pattern.as_bytes())?;
        file.write_all(b"\n")?;
    }

    let mut remaining = args.bytes;
    let mut buffer = vec![0u8; args.minimum_size.min(remaining).max(1)];
    let stdout = io::stdout();
    let mut out = stdout.lock();

    while remaining > 0 {
        let want = remaining.min(buffer.len());
        let n = file.read(&mut buffer[..want])?;
        out.write_all(&buffer[..n])?;
        remaining -= n;
    }
    out.flush()?;

    file.close()?;
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    pattern: Option<String>,
    bytes: usize,
    minimum_size: usize,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut pattern = None;
        let mut bytes = 64usize;
        let mut minimum_size = 8192usize;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--pattern" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        pattern = Some(args[i].clone());
                    }
                }
                "--bytes" | "-n" => {
                    i += 1;
                    if i < args.len() {
                        bytes = args[i].parse().unwrap_or(64);
                    }
                }
                "--min-size" | "-m" => {
                    i += 1;
                    if i < args.len() {
                        minimum_size = args[i].parse().unwrap_or(8192);
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        Self {
            pattern,
            bytes,
            minimum_size,
        }
    }

    fn print_help() {
        println!(
            r#"yesdev yes example

USAGE:
    cargo run --example yes -- [OPTIONS]

OPTIONS:
    -p, --pattern <TEXT>     Line to repeat instead of "y"
    -n, --bytes <N>          Number of bytes to print [default: 64]
    -m, --min-size <N>       Minimum buffer size [default: 8192]
    --help                   Print this help message
"#
        );
    }
}

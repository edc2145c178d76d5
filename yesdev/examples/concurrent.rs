//! Concurrent example: several tasks share one handle
//!
//! Spawns readers on a single handle and a writer that extends the pattern
//! partway through, then prints what each reader saw.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example concurrent
//! ```

use std::time::Duration;

use futures_util::StreamExt;
use yesdev::{DeviceBuilder, YesDevice};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let device = DeviceBuilder::new("yes").minimum_size(64).build()?;
    let handle = device.open();

    let mut readers = Vec::new();
    for id in 0..3 {
        let device: YesDevice = device.clone();
        readers.push(tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..4 {
                let chunk = device.read(handle, 6)?;
                seen.push(String::from_utf8_lossy(&chunk).escape_debug().to_string());
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Ok::<_, yesdev::Error>((id, seen))
        }));
    }

    tokio::time::sleep(Duration::from_millis(8)).await;
    device.write(handle, b"ok\n")?;

    for reader in readers {
        let (id, seen) = reader.await??;
        println!("reader {}: {:?}", id, seen);
    }

    // A file handle can also be consumed as a stream of chunks
    let file = device.open_file();
    let chunks: Vec<_> = file.chunks_of(8).take(2).collect().await;
    for chunk in chunks {
        println!("chunk: {:?}", chunk?);
    }

    device.close(handle)?;
    Ok(())
}

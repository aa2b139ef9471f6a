use citrine::config::{self, Config};
use citrine_log::CitrineLogger;
use citrine_transport::segment::Segmenter;
use citrine_transport::stop_and_wait::StopAndWait;
use log::{error, info, logger, Level};
use std::fs::File;
use std::io::BufReader;
use std::process;
use std::time::Instant;

#[tokio::main]
async fn main() {
    CitrineLogger::init(Level::Info).unwrap();

    let start_time = Instant::now();

    let config = match config::handle(Config::with_input("file.mp3")) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            logger().flush();
            process::exit(1);
        }
    };

    let (bind_addr, peer_addr) = match (config.bind_addr(), config.peer_addr()) {
        (Ok(bind), Ok(peer)) => (bind, peer),
        (Err(e), _) | (_, Err(e)) => {
            error!("{}", e);
            logger().flush();
            process::exit(1);
        }
    };

    let input = match File::open(&config.transfer.input) {
        Ok(file) => BufReader::new(file),
        Err(e) => {
            error!(
                "Failed to open input file '{}': {}",
                config.transfer.input, e
            );
            logger().flush();
            process::exit(1);
        }
    };

    info!(
        "Stop-and-wait sender: '{}' -> {}",
        config.transfer.input, peer_addr
    );

    let sender = match StopAndWait::bind(
        bind_addr,
        peer_addr,
        config.recv_timeout(),
        Segmenter::new(input),
    )
    .await
    {
        Ok(sender) => sender,
        Err(e) => {
            error!("{}", e);
            logger().flush();
            process::exit(1);
        }
    };

    match sender.run().await {
        Ok(report) => {
            info!(
                "Transfer done in {:.2}s",
                start_time.elapsed().as_secs_f64()
            );
            logger().flush();
            println!("{}", report);
        }
        Err(e) => {
            error!("Transfer failed: {}", e);
            logger().flush();
            process::exit(1);
        }
    }
}

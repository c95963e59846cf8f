use std::env;
use std::time::Duration;

use stokercloud::{MetricValue, StokerClient, StokerMonitor};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let serial = args.get(1).expect("usage: monitor <serial> <token>");
    let token = args.get(2).expect("usage: monitor <serial> <token>");

    let client = StokerClient::builder(serial, token).build();
    let mut monitor = StokerMonitor::new(client);

    println!("Polling StokerCloud for {serial}...");
    monitor.start().await;

    loop {
        let mut keys: Vec<&str> = monitor.metric_keys().collect();
        keys.sort_unstable();
        for key in keys {
            match monitor.value(key) {
                MetricValue::Unset => println!("{key}: unknown"),
                MetricValue::Number(n) => println!("{key}: {n}"),
                MetricValue::Text(s) => println!("{key}: {s}"),
                MetricValue::Flag(b) => println!("{key}: {b}"),
            }
        }
        println!("---");
        tokio::time::sleep(Duration::from_secs(20)).await;
    }
}

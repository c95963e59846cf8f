use std::env;

use stokercloud::{StokerClient, StokerMonitor};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let usage = "usage: setpoint <serial> <token> <degrees_c>";
    let serial = args.get(1).expect(usage);
    let token = args.get(2).expect(usage);
    let degrees: f64 = args.get(3).expect(usage).parse().expect("not a number");

    let client = StokerClient::builder(serial, token).build();
    let mut monitor = StokerMonitor::new(client);
    monitor.start().await;

    println!(
        "Current wanted boiler temperature: {:?}",
        monitor.value("wanted_boiler_temperature")
    );

    if monitor.set_value("wanted_boiler_temperature", degrees).await {
        println!("Setpoint accepted; now {:?}", monitor.value("wanted_boiler_temperature"));
    } else {
        eprintln!("Setpoint write failed; displayed value unchanged");
    }
}

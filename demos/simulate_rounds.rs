use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    cluster_acquisition::example_apps::run_simulation(std::env::args().skip(1))
}

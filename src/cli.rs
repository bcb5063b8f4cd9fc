use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "irrigation-analytics-rs",
    version,
    about = "Irrigation analytics server (migration)"
)]
pub struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    /// Seed the database with demo farms, sectors and irrigation events, then exit.
    #[arg(long, default_value_t = false)]
    pub seed: bool,
    #[arg(long, default_value_t = false)]
    pub print_openapi: bool,
}

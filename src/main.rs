use dotenv::dotenv;
use std::io::Read;
use structopt::StructOpt;
use tracing::{error, info};

use oracle_gateway::{init_logging, GatewayConfig, GenerationInput, InterpretationService};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "oracle_gateway",
    about = "Reads one interpretation request as JSON on stdin and prints the outcome"
)]
struct Opt {
    /// Caller the request is made on behalf of
    #[structopt(short, long)]
    caller: Option<String>,

    /// Use the premium rate-limit tier
    #[structopt(short, long)]
    premium: bool,

    /// Pretty-print the JSON outcome
    #[structopt(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();
    let opt = Opt::from_args();

    let config = GatewayConfig::from_env()?;
    let service = InterpretationService::from_config(config).await?;
    info!("Oracle gateway starting up");

    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;
    let input: GenerationInput = serde_json::from_str(&raw)?;

    let outcome = match service
        .generate(&input, opt.caller.as_deref(), opt.premium)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Request could not be served");
            return Err(e.into());
        }
    };

    let rendered = if opt.pretty {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string(&outcome)?
    };
    println!("{}", rendered);

    Ok(())
}

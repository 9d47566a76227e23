use crate::demo::{run_demo, DemoArgs};
use crate::infra::read_situation;
use crate::server;
use clap::{Args, Parser, Subcommand};
use maltraitance_affectation::error::AppError;
use maltraitance_affectation::workflows::affectation::{
    extract_finess_from_raw_text, extract_postal_code, simulate,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Complaint Routing Service",
    about = "Route mistreatment complaints to the ARS, CD and DD authorities",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run the decision tree on a situation JSON file without persisting anything
    Simulate(SimulateArgs),
    /// Show the postal code and FINESS number found in free text
    Extract(ExtractArgs),
    /// Assign the bundled sample complaints and print the resulting links
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
    /// Path to a situation JSON document
    #[arg(long)]
    pub(crate) situation: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct ExtractArgs {
    /// Raw text typed by a declarant
    #[arg(long)]
    pub(crate) text: String,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Simulate(args) => run_simulation(args).await,
        Command::Extract(args) => {
            run_extract(args);
            Ok(())
        }
        Command::Demo(args) => run_demo(args),
    }
}

async fn run_simulation(args: SimulateArgs) -> Result<(), AppError> {
    let situation = read_situation(&args.situation)?;
    match simulate(&situation).await {
        Ok(simulation) => {
            let types: Vec<&str> = simulation
                .entite_types
                .iter()
                .map(|entite_type| entite_type.code())
                .collect();
            println!("Context: {:?}", simulation.context);
            if types.is_empty() {
                println!("Authorities: none");
            } else {
                println!("Authorities: {}", types.join(", "));
            }
        }
        Err(err) => println!("Situation rejected: {err}"),
    }
    Ok(())
}

fn run_extract(args: ExtractArgs) {
    let show = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    println!("Postal code: {}", show(extract_postal_code(&args.text)));
    println!("FINESS: {}", show(extract_finess_from_raw_text(&args.text)));
}

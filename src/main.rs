use clap::Parser;
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use qns::apps::register_demo_programs;
use qns::backend::LocalBackend;
use qns::config::{
    AppConfig, LogPolicy, NetworkConfig, NodeConfig, ProgramConfig, RoleAllocation, RoleInputs,
    SimConfig,
};
use qns::driver::{FailurePolicy, SimulationDriver};
use qns::program::ProgramRegistry;
use qns::sink::JsonFileSink;

const QNS_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "QNS", version = QNS_VERSION,
    about = "QNS (Quantum Network Simulator) - a multi-party quantum network program runtime.\n\
             Runs per-role programs concurrently against a simulated backend, round over round.",
    long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Runs the built-in distributed-CNOT demo application.
    Run {
        /// Number of simulation rounds.
        #[arg(long, default_value_t = 1)]
        rounds: usize,
        /// Seed for the backend's measurement rng.
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Initial pauli state of alice's control qubit (0, 1, + or -).
        #[arg(long, default_value = "1")]
        control: String,
        /// Initial pauli state of bob's target qubit (0, 1, + or -).
        #[arg(long, default_value = "0")]
        target: String,
        /// Path of a simulation configuration json; overrides the built-in
        /// demo configuration. Declared programs must be registry names.
        #[arg(long)]
        config: Option<String>,
        /// Write the accumulated run log to this json file after each round.
        #[arg(long)]
        output: Option<String>,
        /// Stop the round loop at the first failed round instead of
        /// continuing.
        #[arg(long)]
        abort_on_failure: bool,
    },
    /// Prints the qns version.
    Version,
}

fn demo_config(control: &str, target: &str) -> SimConfig {
    let mut inputs = RoleInputs::default();
    let mut alice_inputs = BTreeMap::new();
    alice_inputs.insert("control".to_string(), control.into());
    inputs.inputs.insert("alice".to_string(), alice_inputs);
    let mut bob_inputs = BTreeMap::new();
    bob_inputs.insert("target".to_string(), target.into());
    inputs.inputs.insert("bob".to_string(), bob_inputs);

    let mut allocation = RoleAllocation::default();
    allocation
        .nodes
        .insert("alice".to_string(), "node0".to_string());
    allocation
        .nodes
        .insert("bob".to_string(), "node1".to_string());

    SimConfig {
        network: NetworkConfig {
            nodes: vec![
                NodeConfig {
                    name: "node0".to_string(),
                },
                NodeConfig {
                    name: "node1".to_string(),
                },
            ],
            links: vec![qns::config::LinkConfig {
                a: "node0".to_string(),
                b: "node1".to_string(),
                fidelity: 1.0,
            }],
        },
        app: AppConfig {
            programs: vec![
                ProgramConfig {
                    role: "alice".to_string(),
                    program: "dist_cnot_alice".to_string(),
                },
                ProgramConfig {
                    role: "bob".to_string(),
                    program: "dist_cnot_bob".to_string(),
                },
            ],
        },
        allocation,
        inputs,
        log: LogPolicy::default(),
    }
}

fn main() -> Result<(), String> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            rounds,
            seed,
            control,
            target,
            config,
            output,
            abort_on_failure,
        } => {
            let sim_config = match config {
                Some(path) => {
                    let raw = fs::read_to_string(&path)
                        .map_err(|e| format!("error reading config `{}`: {}", path, e))?;
                    SimConfig::from_json_str(&raw).map_err(|e| e.to_string())?
                }
                None => demo_config(&control, &target),
            };

            let mut registry = ProgramRegistry::new();
            register_demo_programs(&mut registry);

            let backend = Arc::new(LocalBackend::new(seed));

            let mut driver = SimulationDriver::new(sim_config, registry, backend)
                .map_err(|e| e.to_string())?;
            if let Some(path) = output {
                driver = driver.with_sink(Box::new(JsonFileSink::new(path)));
            }
            if abort_on_failure {
                driver = driver.with_policy(FailurePolicy::Abort);
            }

            let report = driver.run(rounds).map_err(|e| e.to_string())?;

            for error in &report.round_errors {
                eprintln!("[warn] {}", error);
            }

            let rendered = serde_json::to_string_pretty(report.log.rounds())
                .map_err(|e| format!("error rendering results: {}", e))?;
            println!("{}", rendered);
        }
        Commands::Version => {
            println!("qns version {}", QNS_VERSION);
        }
    }

    Ok(())
}

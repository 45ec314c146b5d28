use criterion::measurement::WallTime;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

use qns::backend::LocalBackend;
use qns::config::{
    AppConfig, LogPolicy, NetworkConfig, NodeConfig, ProgramConfig, RoleAllocation, RoleInputs,
    SimConfig,
};
use qns::driver::SimulationDriver;
use qns::error::SimError;
use qns::program::{ProgramRegistry, RoleContext, RoleOutput, RoleProgram};

// custom criterion configuration for all benchmarks
fn custom_criterion_config() -> Criterion<WallTime> {
    Criterion::default()
        .sample_size(30)
        .measurement_time(std::time::Duration::from_secs(5))
        .warm_up_time(std::time::Duration::from_secs(1))
}

const PING_PONG_MESSAGES: i64 = 64;

struct Pinger;

impl RoleProgram for Pinger {
    fn run(&mut self, ctx: &mut RoleContext) -> Result<RoleOutput, SimError> {
        let socket = ctx.socket("bob")?;
        for v in 0..PING_PONG_MESSAGES {
            socket.send(v);
            let _ = socket.recv()?;
        }
        let q = ctx.connection.new_qubit()?;
        ctx.connection.measure(q)?;
        ctx.connection.flush()?;
        Ok(RoleOutput::new())
    }
}

struct Ponger;

impl RoleProgram for Ponger {
    fn run(&mut self, ctx: &mut RoleContext) -> Result<RoleOutput, SimError> {
        let socket = ctx.socket("alice")?;
        for _ in 0..PING_PONG_MESSAGES {
            let v = socket.recv()?;
            socket.send(v);
        }
        Ok(RoleOutput::new())
    }
}

fn ping_pong_config() -> SimConfig {
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
            links: Vec::new(),
        },
        app: AppConfig {
            programs: vec![
                ProgramConfig {
                    role: "alice".to_string(),
                    program: "pinger".to_string(),
                },
                ProgramConfig {
                    role: "bob".to_string(),
                    program: "ponger".to_string(),
                },
            ],
        },
        allocation,
        inputs: RoleInputs::default(),
        log: LogPolicy::default(),
    }
}

fn round_benchmarks(c: &mut Criterion<WallTime>) {
    let mut group = c.benchmark_group("rounds");
    group.throughput(Throughput::Elements(PING_PONG_MESSAGES as u64));

    // one full round: spawn two role threads, exchange messages, flush, join
    group.bench_function("two_role_ping_pong_round", |b| {
        b.iter(|| {
            let mut registry = ProgramRegistry::new();
            registry.register("pinger", |_inputs| Ok(Box::new(Pinger)));
            registry.register("ponger", |_inputs| Ok(Box::new(Ponger)));

            let backend = Arc::new(LocalBackend::new(0));
            let mut driver =
                SimulationDriver::new(ping_pong_config(), registry, backend).unwrap();
            let report = driver.run(1).unwrap();
            black_box(report.log.len());
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = custom_criterion_config();
    targets = round_benchmarks
}
criterion_main!(benches);

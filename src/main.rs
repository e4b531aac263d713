use stellarforge::{bench_gravity, bench_step};
use stellarforge::{Scenario, ScenarioConfig};

use anyhow::Result;
use clap::Parser;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Scenario file under scenarios/
    #[arg(short, default_value = "two_body.yaml")]
    file_name: String,

    /// Run the timing benchmarks instead of a scenario
    #[arg(long)]
    bench: bool,
}

fn load_scenario(file_name: &str) -> Result<ScenarioConfig> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(file_name);
    let file = File::open(&path)?;
    let cfg = serde_yaml::from_reader(BufReader::new(file))?;
    Ok(cfg)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.bench {
        bench_gravity();
        bench_step();
        return Ok(());
    }

    let cfg = load_scenario(&args.file_name)?;
    let mut scenario = Scenario::build(cfg)?;

    let dt = scenario.dt;
    let steps = (scenario.t_end / dt).ceil() as u64;
    log::info!(
        "running {steps} steps of dt = {dt} with {} particles",
        scenario.engine.particle_count()
    );

    let mut total_ms = 0.0;
    for step in 0..steps {
        scenario.engine.step(dt);
        total_ms += scenario.engine.last_step_time_ms();

        if steps >= 10 && step % (steps / 10) == 0 {
            log::info!(
                "step {step}/{steps}: {} particles, {:.3} ms",
                scenario.engine.particle_count(),
                scenario.engine.last_step_time_ms()
            );
        }
    }

    println!(
        "simulated {steps} steps on backend {}",
        scenario.engine.backend()
    );
    println!("final particle count: {}", scenario.engine.particle_count());
    if steps > 0 {
        println!("mean step time: {:.3} ms", total_ms / steps as f64);
    }

    Ok(())
}

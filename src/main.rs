use anyhow::Result;
use clap::Parser;
use parallel_engine::cli::{
    execute_bench, execute_fan, execute_heavy, execute_matrix, execute_pipeline, execute_pool,
    execute_sum, execute_timeout, resolve_config, Cli, Commands,
};
use parallel_engine::EngineConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(cli.workers, cli.preset.as_deref())?;
    let workers = config.worker_count();

    if !cli.quiet {
        println!("🖥️  CPU cores: {}, workers: {workers}", num_cpus::get());
    }

    match cli.command {
        Commands::Sum { len } => execute_sum(len, workers),
        Commands::Heavy { len } => execute_heavy(len, workers),
        Commands::Matrix { size } => execute_matrix(size, workers),
        Commands::Pool {
            jobs,
            max_latency_ms,
        } => execute_pool(jobs, max_latency_ms, &config, cli.quiet).await,
        Commands::Pipeline { count } => execute_pipeline(count, &config).await,
        Commands::Fan { count } => execute_fan(count, &config).await,
        Commands::Timeout {
            timeout_ms,
            unit_ms,
        } => execute_timeout(timeout_ms, unit_ms, &config, cli.quiet).await,
        Commands::Bench {
            json,
            output,
            quick,
        } => execute_bench(json, output, quick, &config).await,
    }
}

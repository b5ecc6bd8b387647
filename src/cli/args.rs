use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "parallel_engine")]
#[command(about = "Concurrent execution patterns: partitioned reduction, worker pool, pipeline, fan-out/fan-in, cancellation")]
#[command(version)]
pub struct Cli {
    /// Number of workers (defaults to the preset, which defaults to the CPU count)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Configuration preset (default, high_throughput, testing)
    #[arg(short = 'p', long, global = true)]
    pub preset: Option<String>,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sum an integer range sequentially and with partitioned workers
    Sum {
        /// Number of elements
        #[arg(short, long, default_value = "10000000")]
        len: usize,
    },

    /// Run the trigonometric heavy computation sequentially and in parallel
    Heavy {
        /// Number of elements
        #[arg(short, long, default_value = "500000")]
        len: usize,
    },

    /// Multiply square matrices sequentially and by row partitions
    Matrix {
        /// Matrix dimension
        #[arg(short, long, default_value = "512")]
        size: usize,
    },

    /// Run square jobs with simulated latency through the worker pool
    Pool {
        /// Number of jobs
        #[arg(short, long, default_value = "20")]
        jobs: u64,

        /// Upper bound of the simulated per-job latency in milliseconds
        #[arg(long, default_value = "100")]
        max_latency_ms: u64,
    },

    /// Generator -> square -> filter(> 10) pipeline
    Pipeline {
        /// Number of generated values
        #[arg(short, long, default_value = "10")]
        count: u64,
    },

    /// Square values with competing workers and merge the outputs
    Fan {
        /// Number of generated values
        #[arg(short, long, default_value = "10")]
        count: u64,
    },

    /// Cooperative workers stopped by a deadline
    Timeout {
        /// Deadline in milliseconds
        #[arg(short, long, default_value = "2000")]
        timeout_ms: u64,

        /// Duration of one unit of work in milliseconds
        #[arg(short, long, default_value = "500")]
        unit_ms: u64,
    },

    /// Sequential vs parallel comparison table
    Bench {
        /// Emit the table as JSON
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use small inputs
        #[arg(long)]
        quick: bool,
    },
}

use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use pdf_compress::config::job::JobFile;
use pdf_compress::config::{self};
use pdf_compress::pipeline::job_runner::JobConfig;
use pdf_compress::pipeline::orchestrator::run_all_jobs;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: pdf_compress <jobs.yaml>...");
        eprintln!("  Compress, merge or convert files according to job specifications.");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("pdf_compress {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    init_tracing();

    let mut job_configs: Vec<JobConfig> = Vec::new();

    for job_file_arg in &args {
        let job_file_path = Path::new(job_file_arg);

        // Load settings from the same directory as the job file.
        let settings = match config::load_settings_for_job(job_file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let yaml_content = match std::fs::read_to_string(job_file_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to read job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let job_file: JobFile = match serde_yml::from_str(&yaml_content) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: Failed to parse job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let job_dir = job_file_path.parent().unwrap_or_else(|| Path::new("."));

        for job in &job_file.jobs {
            match JobConfig::from_job(job, &settings, job_dir) {
                Ok(jc) => job_configs.push(jc),
                Err(e) => {
                    eprintln!("ERROR: {job_file_arg}: {} : {e}", job.output());
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    let results = run_all_jobs(&job_configs);

    let mut has_error = false;
    for (job, result) in job_configs.iter().zip(&results) {
        let inputs = job
            .input_paths()
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        match result {
            Ok(job_result) => match &job_result.report {
                Some(report) => eprintln!(
                    "OK: {inputs} -> {} ({} pages, {} -> {} bytes, {:.1}% reduction)",
                    job_result.output_path.display(),
                    job_result.pages_processed,
                    report.original_size,
                    report.compressed_size,
                    report.compression_ratio
                ),
                None => eprintln!(
                    "OK: {inputs} -> {} ({} pages)",
                    job_result.output_path.display(),
                    job_result.pages_processed
                ),
            },
            Err(e) => {
                eprintln!("ERROR: {inputs} -> {}: {e}", job.output_path.display());
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// `RUST_LOG` が未設定なら info レベルで stderr に出す。
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{exit, Command, ExitStatus};

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use edge_signout_core::deployment::{
    baseline_suppressions, normalize_deployment, DeploymentRequest, SynthesisRecord,
    TargetEnvironment, ACCOUNT_ENV_VAR, REGION_ENV_VAR,
};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the edge sign-out workspace",
    long_about = "A unified CLI for synthesizing the deployment description,\n\
                  packaging the sign-out Lambda artifact, and running CI checks."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit the validated deployment description for the provisioning toolchain
    Synth {
        /// Stack name used when no request file is given
        #[arg(long, default_value = "EdgeSignoutStack")]
        stack_name: String,
        /// Path to a deployment request JSON file
        #[arg(long)]
        request: Option<String>,
        /// Target account id
        #[arg(long, env = ACCOUNT_ENV_VAR)]
        account: String,
        /// Target region
        #[arg(long, env = REGION_ENV_VAR)]
        region: String,
        /// Output file path
        #[arg(long, default_value = "dist/deployment.json")]
        output: String,
    },
    /// Build and package the sign-out Lambda artifact
    Package {
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
    /// Run CI checks (fmt, clippy, tests)
    Ci,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

// ── synth ──────────────────────────────────────────────────────────

fn synth_deployment(
    stack_name: &str,
    request_path: Option<&str>,
    account: String,
    region: String,
    output: &str,
) {
    let request = match request_path {
        Some(path) => {
            let raw = fs::read_to_string(path).expect("failed to read deployment request file");
            serde_json::from_str::<DeploymentRequest>(&raw)
                .expect("failed to parse deployment request file")
        }
        None => DeploymentRequest::new(stack_name),
    };

    let environment = TargetEnvironment { account, region };
    let description = match normalize_deployment(request, environment, baseline_suppressions()) {
        Ok(value) => value,
        Err(error) => {
            eprintln!("invalid deployment request: {error}");
            exit(1);
        }
    };

    let record = SynthesisRecord::new(description, Utc::now().to_rfc3339());
    let rendered =
        serde_json::to_string_pretty(&record).expect("failed to render deployment description");

    let output_path = Path::new(output);
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).expect("failed to create output directory");
        }
    }
    fs::write(output_path, rendered).expect("failed to write deployment description");

    eprintln!(
        "\nWrote deployment description:\n- {} (fingerprint {})",
        output_path.display(),
        record.parameter_fingerprint
    );
}

// ── package ────────────────────────────────────────────────────────

fn package_signout_lambda(target: &str, profile: BuildProfile) {
    ensure_rust_target_installed(target);

    step("Build sign-out lambda binary");

    let mut cargo_args = vec![
        "build",
        "-p",
        "edge_signout_lambda",
        "--target",
        target,
        "--bin",
        "signout_lambda",
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package lambda zip artifact");
    let profile_dir = profile.dir_name();
    let target_dir = Path::new("target").join(target).join(profile_dir);
    let dist_dir = Path::new("dist");
    fs::create_dir_all(dist_dir).expect("failed to create lambda dist directory");

    package_lambda_zip(
        &target_dir.join(binary_name("signout_lambda", target)),
        &dist_dir.join("signout_lambda.zip"),
    );

    eprintln!(
        "\nPackaged artifact:\n- {}",
        dist_dir.join("signout_lambda.zip").display()
    );
}

fn ensure_rust_target_installed(target: &str) {
    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output();

    let output = match output {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); continuing without target preflight"
            );
            return;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "failed to list installed rust targets; run `rustup target list --installed` manually. details: {}",
            stderr.trim()
        );
    }

    let installed = String::from_utf8_lossy(&output.stdout);
    if !installed.lines().any(|line| line.trim() == target) {
        panic!(
            "required rust target `{target}` is not installed. install it with `rustup target add {target}` and re-run `cargo run -p xtask -- package`"
        );
    }
}

fn binary_name(bin_name: &str, target: &str) -> String {
    if target.contains("windows") {
        format!("{bin_name}.exe")
    } else {
        bin_name.to_string()
    }
}

fn package_lambda_zip(binary_path: &Path, zip_path: &Path) {
    if !binary_path.exists() {
        panic!("expected lambda binary at '{}'", binary_path.display());
    }

    let binary = fs::read(binary_path).expect("failed to read lambda binary");
    let file = fs::File::create(zip_path).expect("failed to create lambda zip");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .expect("failed to start bootstrap entry in lambda zip");
    zip.write_all(&binary)
        .expect("failed to write bootstrap entry");
    zip.finish().expect("failed to finish lambda zip");
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test edge_signout_core");
    run_cargo(&["test", "-p", "edge_signout_core"]);

    step("Test edge_signout_lambda");
    run_cargo(&["test", "-p", "edge_signout_lambda"]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Synth {
            stack_name,
            request,
            account,
            region,
            output,
        } => {
            synth_deployment(&stack_name, request.as_deref(), account, region, &output);
        }
        Commands::Package { target, profile } => {
            package_signout_lambda(&target, profile);
        }
        Commands::Ci => {
            ci_check();
        }
    }
}

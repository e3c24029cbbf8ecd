//! DocSign command line
//!
//! Provisions signing credentials, signs PDFs with visual marks and
//! verifies signed PDFs. Logs go to stderr; results are printed to stdout
//! as JSON.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docsign_core::provision::issue_and_package_with;
use docsign_core::{
    describe_container, verify_document, DocumentInput, SignatureRequest, SignerConfig,
    SigningPipeline,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Read when `--password` is not given
const PASSWORD_VAR: &str = "DOCSIGN_PASSWORD";

#[derive(Parser, Debug)]
#[command(name = "docsign")]
#[command(version, about = "Sign PDF documents with self-issued certificates")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Issue a key and certificate from CERT_* settings into a PKCS#12 file
    Provision {
        /// Where to write the container
        #[arg(short, long)]
        out: PathBuf,

        /// Container password (defaults to $DOCSIGN_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },

    /// Show the certificate inside a PKCS#12 file
    Inspect {
        #[arg(short, long)]
        credentials: PathBuf,

        #[arg(long)]
        password: Option<String>,
    },

    /// Sign documents and draw visual signature marks
    Sign {
        #[arg(short, long)]
        credentials: PathBuf,

        #[arg(long)]
        password: Option<String>,

        /// Signer name shown in the signature and the marks
        #[arg(long)]
        name: Option<String>,

        /// Signer contact information
        #[arg(long)]
        email: Option<String>,

        /// JSON file with the placement array
        #[arg(long)]
        placements: Option<PathBuf>,

        /// Directory for the signed files
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Documents to sign, addressed by position in placements
        #[arg(required = true)]
        documents: Vec<PathBuf>,
    },

    /// Verify every signature of signed documents
    Verify {
        #[arg(required = true)]
        documents: Vec<PathBuf>,
    },
}

#[derive(Serialize)]
struct SignSummary {
    input: String,
    output: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
struct VerifySummary {
    document: String,
    signatures: Vec<docsign_core::SignatureReport>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("docsign_core=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match args.command {
        Command::Provision { out, password } => provision(&out, password),
        Command::Inspect {
            credentials,
            password,
        } => {
            let container = read(&credentials)?;
            let info = describe_container(&container, &resolve_password(password)?)?;
            print_json(&info)
        }
        Command::Sign {
            credentials,
            password,
            name,
            email,
            placements,
            out_dir,
            documents,
        } => {
            let config = SignerConfig::from_env()?;
            let container = read(&credentials)?;
            let request = match placements {
                Some(path) => SignatureRequest::from_json(
                    &fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?,
                )?,
                None => SignatureRequest::default(),
            };
            let ctx = config.signing_context(name.as_deref(), email.as_deref());

            let mut pipeline =
                SigningPipeline::open(&container, &resolve_password(password)?, ctx)?;
            if let Some(capacity) = config.signature_capacity {
                pipeline = pipeline.with_signature_capacity(capacity);
            }
            sign(&pipeline, &request, &documents, &out_dir)
        }
        Command::Verify { documents } => verify(&documents),
    }
}

fn provision(out: &Path, password: Option<String>) -> Result<()> {
    let config = SignerConfig::from_env()?;
    let password = resolve_password(password)?;

    let subject = config.require_subject()?;
    let container = issue_and_package_with(subject, &password, config.pkcs12_iterations)?;
    fs::write(out, &container).with_context(|| format!("writing {}", out.display()))?;

    let info = describe_container(&container, &password)?;
    tracing::info!(path = %out.display(), serial = %info.serial_number, "wrote credentials");
    print_json(&info)
}

fn sign(
    pipeline: &SigningPipeline,
    request: &SignatureRequest,
    paths: &[PathBuf],
    out_dir: &Path,
) -> Result<()> {
    let documents = paths
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(DocumentInput::new(name, read(path)?))
        })
        .collect::<Result<Vec<_>>>()?;

    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut summaries = Vec::with_capacity(documents.len());
    let mut failed = 0;
    for (document, outcome) in documents.iter().zip(pipeline.sign_all(&documents, request)?) {
        let summary = match outcome {
            Ok(signed) => {
                let target = out_dir.join(&signed.output_name);
                fs::write(&target, &signed.pdf)
                    .with_context(|| format!("writing {}", target.display()))?;
                SignSummary {
                    input: document.name.clone(),
                    output: Some(target.display().to_string()),
                    error: None,
                }
            }
            Err(e) => {
                failed += 1;
                SignSummary {
                    input: document.name.clone(),
                    output: None,
                    error: Some(e.to_string()),
                }
            }
        };
        summaries.push(summary);
    }

    print_json(&summaries)?;
    if failed > 0 {
        bail!("{} of {} documents could not be signed", failed, documents.len());
    }
    Ok(())
}

fn verify(paths: &[PathBuf]) -> Result<()> {
    let mut summaries = Vec::with_capacity(paths.len());
    let mut invalid = 0;
    for path in paths {
        let signatures = verify_document(&read(path)?)
            .with_context(|| format!("verifying {}", path.display()))?;
        if signatures.is_empty() || !signatures.iter().all(|s| s.is_valid()) {
            invalid += 1;
        }
        summaries.push(VerifySummary {
            document: path.display().to_string(),
            signatures,
        });
    }

    print_json(&summaries)?;
    if invalid > 0 {
        bail!("{} of {} documents have missing or invalid signatures", invalid, paths.len());
    }
    Ok(())
}

fn resolve_password(password: Option<String>) -> Result<String> {
    match password.or_else(|| std::env::var(PASSWORD_VAR).ok()) {
        Some(password) => Ok(password),
        None => bail!("no password given; pass --password or set {}", PASSWORD_VAR),
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_sign() {
        let args = Args::try_parse_from([
            "docsign",
            "sign",
            "-c",
            "user.p12",
            "--name",
            "Jane",
            "a.pdf",
            "b.pdf",
        ])
        .unwrap();
        match args.command {
            Command::Sign {
                documents, out_dir, ..
            } => {
                assert_eq!(documents.len(), 2);
                assert_eq!(out_dir, PathBuf::from("."));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_sign_requires_documents() {
        assert!(Args::try_parse_from(["docsign", "sign", "-c", "user.p12"]).is_err());
    }
}

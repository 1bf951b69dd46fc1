//! CLI binary for verifying attestation receipts before anchoring.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anchor_verifier::{
    AllowList, AnchorVerifier, AttestationReceipt, ExecutionHash, FirmwareMeasurement,
    HardwareIdentity, Outcome, Registry,
};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Verifier library error
    #[error(transparent)]
    Verifier(#[from] anchor_verifier::Error),

    /// Receipt input could not be read
    #[error("failed to read {0}")]
    Input(String, #[source] std::io::Error),

    /// Output could not be rendered
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Verify receipts against an allow-list, printing one JSON outcome per receipt
    Verify {
        /// Allow-list of authorized nodes and approved firmware
        #[arg(long, env = "ANCHOR_ALLOW_LIST")]
        allow_list: PathBuf,

        /// Receipt files, one JSON receipt each. Reads one receipt per line from
        /// stdin when omitted.
        receipts: Vec<PathBuf>,
    },

    /// Build a receipt with a correct digest, as node firmware would
    Seal {
        /// Hardware identity (0x-prefixed, 32 bytes)
        #[arg(long)]
        hardware_identity: HardwareIdentity,

        /// Firmware measurement (0x-prefixed, 32 bytes)
        #[arg(long)]
        firmware_hash: FirmwareMeasurement,

        /// Execution hash (0x-prefixed, 32 bytes)
        #[arg(long)]
        execution_hash: ExecutionHash,

        /// Replay counter
        #[arg(long)]
        counter: u64,
    },
}

async fn read_receipts(paths: &[PathBuf]) -> Result<Vec<String>, Error> {
    if paths.is_empty() {
        let mut receipts = Vec::new();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| Error::Input("stdin".to_string(), e))?
        {
            if !line.trim().is_empty() {
                receipts.push(line);
            }
        }

        return Ok(receipts);
    }

    let mut receipts = Vec::with_capacity(paths.len());
    for path in paths {
        let receipt = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Input(path.display().to_string(), e))?;
        receipts.push(receipt);
    }

    Ok(receipts)
}

/// Outcome lines for a batch of receipts and the exit code they imply.
#[derive(Debug)]
struct VerifyReport {
    lines: Vec<String>,
    exit_code: ExitCode,
}

/// Verifies receipts in order against a fresh registry built from `allow_list`.
async fn verify_receipts(
    allow_list: &AllowList,
    receipts: &[String],
) -> Result<VerifyReport, Error> {
    let registry = Registry::from_allow_list(allow_list).await?;
    info!(
        nodes = registry.node_count(),
        firmware = registry.firmware_count(),
        "allow-list loaded"
    );

    let verifier = AnchorVerifier::new(registry);
    let mut lines = Vec::with_capacity(receipts.len());
    let mut all_accepted = true;

    for receipt in receipts {
        let result = verifier.verify(receipt).await;
        let outcome = Outcome::from(&result);
        all_accepted &= outcome.accepted;

        let line = json!({
            "accepted": outcome.accepted,
            "reason": outcome.reason,
            "anchor": result.ok(),
        });
        lines.push(serde_json::to_string(&line)?);
    }

    Ok(VerifyReport {
        lines,
        exit_code: if all_accepted {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        },
    })
}

async fn verify(allow_list: &Path, receipts: &[PathBuf]) -> Result<ExitCode, Error> {
    let allow_list = AllowList::from_file(allow_list)?;
    let receipts = read_receipts(receipts).await?;
    let report = verify_receipts(&allow_list, &receipts).await?;

    for line in &report.lines {
        println!("{line}");
    }

    Ok(report.exit_code)
}

#[tokio::main]
async fn main() -> Result<ExitCode, Error> {
    // Logs go to stderr; stdout carries JSON only
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    match Args::parse().command {
        Command::Verify {
            allow_list,
            receipts,
        } => verify(&allow_list, &receipts).await,
        Command::Seal {
            hardware_identity,
            firmware_hash,
            execution_hash,
            counter,
        } => {
            let receipt =
                AttestationReceipt::seal(hardware_identity, firmware_hash, execution_hash, counter);
            println!("{}", receipt.to_json()?);

            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seal_args() {
        let node = format!("0x{}", "ab".repeat(32));
        let args = Args::try_parse_from([
            "anchor-verify",
            "seal",
            "--hardware-identity",
            node.as_str(),
            "--firmware-hash",
            node.as_str(),
            "--execution-hash",
            node.as_str(),
            "--counter",
            "7",
        ])
        .unwrap();

        assert!(matches!(
            args.command,
            Command::Seal {
                counter: 7,
                hardware_identity,
                ..
            } if hardware_identity.to_hex() == node
        ));
    }

    #[test]
    fn test_seal_rejects_unprefixed_hex() {
        let node = "ab".repeat(32);
        let result = Args::try_parse_from([
            "anchor-verify",
            "seal",
            "--hardware-identity",
            node.as_str(),
            "--firmware-hash",
            node.as_str(),
            "--execution-hash",
            node.as_str(),
            "--counter",
            "7",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn test_parse_verify_args() {
        let args = Args::try_parse_from([
            "anchor-verify",
            "verify",
            "--allow-list",
            "allow-list.json",
            "a.json",
            "b.json",
        ])
        .unwrap();

        assert!(matches!(
            args.command,
            Command::Verify { allow_list, receipts }
                if allow_list == Path::new("allow-list.json") && receipts.len() == 2
        ));
    }

    const DEV_NODE: &str = "0x52fdfc072182654f163f5f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f0f";
    const DEV_FIRMWARE: &str = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";

    fn example_allow_list() -> AllowList {
        AllowList::from_json(include_str!("../allow-list.example.json")).unwrap()
    }

    fn sealed(counter: u64) -> String {
        AttestationReceipt::seal(
            DEV_NODE.parse().unwrap(),
            DEV_FIRMWARE.parse().unwrap(),
            ExecutionHash::new([0xab; 32]),
            counter,
        )
        .to_json()
        .unwrap()
    }

    fn parse_lines(report: &VerifyReport) -> Vec<serde_json::Value> {
        report
            .lines
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_verify_accept_then_replay() {
        let receipt = sealed(5);
        let report = verify_receipts(&example_allow_list(), &[receipt.clone(), receipt])
            .await
            .unwrap();

        assert_eq!(report.exit_code, ExitCode::FAILURE);

        let lines = parse_lines(&report);
        assert_eq!(lines.len(), 2);

        assert_eq!(lines[0]["accepted"], true);
        assert_eq!(lines[0]["reason"], "Valid");
        assert_eq!(lines[0]["anchor"]["counter"], 5);
        assert_eq!(lines[0]["anchor"]["previous_counter"], 0);
        assert_eq!(lines[0]["anchor"]["display_name"], "Dev-Node");
        assert_eq!(lines[0]["anchor"]["hardware_identity"], DEV_NODE);

        assert_eq!(lines[1]["accepted"], false);
        assert_eq!(lines[1]["reason"], "ReplayDetected");
        assert!(lines[1]["anchor"].is_null());
    }

    #[tokio::test]
    async fn test_verify_all_accepted_succeeds() {
        let report = verify_receipts(&example_allow_list(), &[sealed(1), sealed(2)])
            .await
            .unwrap();

        assert_eq!(report.exit_code, ExitCode::SUCCESS);
        assert!(
            parse_lines(&report)
                .iter()
                .all(|line| line["accepted"] == true)
        );
    }

    #[tokio::test]
    async fn test_verify_malformed_receipt_line() {
        let report = verify_receipts(&example_allow_list(), &["{\"counter\": 1}".to_string()])
            .await
            .unwrap();

        assert_eq!(report.exit_code, ExitCode::FAILURE);
        assert_eq!(parse_lines(&report)[0]["reason"], "MalformedInput");
    }

    #[tokio::test]
    async fn test_verify_rejects_bad_allow_list_entry() {
        let allow_list = AllowList::from_json(r#"{ "firmware": ["0x12"] }"#).unwrap();

        assert!(matches!(
            verify_receipts(&allow_list, &[]).await,
            Err(Error::Verifier(anchor_verifier::Error::MalformedInput { .. }))
        ));
    }

    #[test]
    fn test_input_error_keeps_io_source() {
        let error = Error::Input(
            "receipt.json".to_string(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );

        assert_eq!(error.to_string(), "failed to read receipt.json");
        assert!(std::error::Error::source(&error).is_some());
    }
}

// crates/tspend-cli/tests/cli.rs
//
// Offline runs of the tspend binary.

use std::process::Command;

use tspend_core::{check_tspend, Address, AddressKind, ChainParams, Transaction};

fn tspend() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tspend"));
    // Keep the user's config file out of the way.
    let home = tempfile::tempdir().unwrap().into_path();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_expiry_text() {
    let out = tspend().args(["expiry", "1098"]).output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("Chain: mainnet TVI 288 MUL 12"));
    assert!(stdout.contains("Expiry: 4610"));
    assert!(stdout.contains("Voting interval: 1440 - 4896"));
}

#[test]
fn test_expiry_json() {
    let out = tspend()
        .args(["--simnet", "expiry", "15", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["chain"], "simnet");
    assert_eq!(v["expiry"], 98);
    assert!(v["advanced"].is_null());
}

#[test]
fn test_conflicting_networks_fail() {
    let out = tspend()
        .args(["--simnet", "--testnet", "expiry", "10"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("can't be used together"));
}

#[test]
fn test_gen_offline_to_stdout() {
    let params = ChainParams::testnet();
    let addr = Address::new(AddressKind::ScriptHash, [0x42; 20], &params).to_string();
    let out = tspend()
        .args([
            "--testnet",
            "gen",
            "--currentheight",
            "200000",
            "--address",
            &addr,
            "--amount",
            "250000000",
            "--privkey",
            "0707070707070707070707070707070707070707070707070707070707070707",
        ])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let hex = String::from_utf8(out.stdout).unwrap();
    let tx = Transaction::from_hex(hex.trim()).unwrap();
    assert!(check_tspend(&tx).is_ok());
    assert_eq!(tx.outputs[1].value, 250_000_000);

    // The report and the Pi key warning go to stderr.
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("TSpend Hash"));
    assert!(stderr.contains("Pi Key"));
}

#[test]
fn test_gen_rejects_wrong_network_address() {
    let mainnet_addr =
        Address::new(AddressKind::PubKeyHash, [1; 20], &ChainParams::mainnet()).to_string();
    let out = tspend()
        .args([
            "--simnet",
            "gen",
            "-c",
            "100",
            "--address",
            &mainnet_addr,
            "--amount",
            "1000",
            "--privkey",
            "0707070707070707070707070707070707070707070707070707070707070707",
        ])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
}

#[test]
fn test_gen_with_builtin_simnet_pi_key_has_no_warning() {
    let addr = Address::new(AddressKind::PubKeyHash, [3; 20], &ChainParams::simnet()).to_string();
    let out = tspend()
        .args([
            "--simnet",
            "gen",
            "-c",
            "100",
            "--address",
            &addr,
            "--amount",
            "100000000",
            "--privkey",
            "de19ba3352830f3957b9f496ae5a92fc335b84f4cf007b34806f794ad2e3f139",
        ])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("TSpend Hash"));
    assert!(!stderr.to_lowercase().contains("pi key"));
}

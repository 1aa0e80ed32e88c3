//! Cross-process determinism test for the absolute pre-state commitment.
//!
//! Spawns the `prestate_fixture` binary under several environment variants
//! and asserts that all produce identical output, and that it matches the
//! in-process result. Witness encoding and hashing must not depend on cwd,
//! locale, or environment.

use std::path::{Path, PathBuf};
use std::process::Command;

use lock_tests::scripted_engine::{toy_state, ScriptedEngine};
use steptrace_oracle::codec::write_json;
use steptrace_oracle::contract::TraceOracle;
use steptrace_oracle::provider::TraceProvider;

/// Resolve the path to the compiled fixture binary.
///
/// `cargo test` puts test binaries in `target/debug/deps/`; the
/// `prestate_fixture` binary lives one level up.
fn binary_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .expect("can resolve test binary path")
        .parent()
        .expect("binary dir exists")
        .parent()
        .expect("deps parent exists")
        .to_path_buf();
    path.push("prestate_fixture");
    path
}

/// Run the binary with the given cwd and environment overrides.
/// Returns stdout as a string.
fn run_variant(prestate: &Path, work_dir: &Path, env_overrides: &[(&str, &str)]) -> String {
    let mut command = Command::new(binary_path());
    command.arg(prestate).current_dir(work_dir);
    command
        .env_remove("LC_ALL")
        .env_remove("LANG")
        .env_remove("LANGUAGE");
    for &(key, val) in env_overrides {
        command.env(key, val);
    }

    let output = command
        .output()
        .unwrap_or_else(|e| panic!("failed to run prestate_fixture: {e}"));
    assert!(
        output.status.success(),
        "prestate_fixture failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf-8 output")
}

#[test]
fn prestate_commitment_identical_across_processes() {
    let dir = tempfile::tempdir().unwrap();
    let prestate = dir.path().join("prestate.json.gz");
    let mut state = toy_state(0, false);
    state.preimage_key = [0x5a; 32];
    state.registers[4] = 0xffff_ffff;
    write_json(&prestate, &state).unwrap();

    let other_cwd = tempfile::tempdir().unwrap();
    let baseline = run_variant(&prestate, dir.path(), &[]);
    let variants = [
        run_variant(&prestate, other_cwd.path(), &[]),
        run_variant(&prestate, dir.path(), &[("LC_ALL", "C"), ("LANG", "C")]),
        run_variant(
            &prestate,
            other_cwd.path(),
            &[("LANG", "tr_TR.UTF-8"), ("TZ", "Pacific/Kiritimati")],
        ),
    ];
    for (i, out) in variants.iter().enumerate() {
        assert_eq!(&baseline, out, "variant {i} diverged");
    }

    let provider = TraceProvider::new(dir.path(), &prestate, 1, ScriptedEngine::new(0));
    let witness = provider.absolute_pre_state().unwrap();
    let commitment = provider.absolute_pre_state_commitment().unwrap();
    let expected = format!(
        "witness_hex={}\ncommitment={commitment}\n",
        hex::encode(witness)
    );
    assert_eq!(baseline, expected);
}

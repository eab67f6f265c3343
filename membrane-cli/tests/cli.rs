//! `dm-response` run as a process on a synthetic mirror.

use membrane_cli::pgm::{self, Pgm};
use membrane_cli::synth::{HexLayout, circular_aperture, hex_electrodes};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const N: usize = 32;
const CAP: &str = "5000";

fn mirror_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let layout = HexLayout::new(3, 0.45 * N as f64);
    let a = Pgm::from_raster(&circular_aperture(N, 0.45).unwrap(), 255);
    let e = Pgm::from_raster(&hex_electrodes(N, 0.45, &layout).unwrap(), 255);
    pgm::write_raster_u8(&dir.join("aperture.pgm"), a.width, a.height, &a.pixels, a.maxval).unwrap();
    pgm::write_raster_u8(&dir.join("electrodes.pgm"), e.width, e.height, &e.pixels, e.maxval).unwrap();

    let volts: Vec<String> = (0..37).map(|k| (255 - 5 * k).to_string()).collect();
    fs::write(dir.join("voltages.txt"), volts.join("\n")).unwrap();
    fs::write(dir.join("full.txt"), "255\n".repeat(37)).unwrap();
    fs::write(dir.join("controls.txt"), "1.0\n".repeat(37)).unwrap();
    tmp
}

fn dm_response(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dm-response"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

fn values(out: &Output) -> Vec<f64> {
    String::from_utf8(out.stdout.clone())
        .unwrap()
        .split_whitespace()
        .map(|t| t.parse().unwrap())
        .collect()
}

fn peak(v: &[f64]) -> f64 {
    v.iter().fold(0.0f64, |m, x| m.max(x.abs()))
}

#[test]
fn converged_solve_exits_zero_and_writes_outputs() {
    let tmp = mirror_dir();
    let out = dm_response(tmp.path(), &["aperture.pgm", "electrodes.pgm", "voltages.txt", CAP]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));

    let text = String::from_utf8(out.stdout.clone()).unwrap();
    assert_eq!(text.lines().filter(|l| l.is_empty()).count(), N);
    let v = values(&out);
    assert_eq!(v.len(), N * N);
    assert!(v.iter().all(|&u| u <= 0.0));
    assert!(peak(&v) > 0.0);

    let preview = pgm::read_raster(&tmp.path().join("response.pgm")).unwrap();
    assert_eq!((preview.width, preview.height), (N, N));
}

#[test]
fn iteration_cap_exits_two_with_output() {
    let tmp = mirror_dir();
    let out = dm_response(tmp.path(), &["aperture.pgm", "electrodes.pgm", "voltages.txt", "1"]);
    assert_eq!(out.status.code(), Some(2));
    assert_eq!(values(&out).len(), N * N);
    assert!(tmp.path().join("response.pgm").exists());
}

#[test]
fn failures_exit_one() {
    let tmp = mirror_dir();
    let missing = dm_response(tmp.path(), &["aperture.pgm", "electrodes.pgm", "nowhere.txt"]);
    assert_eq!(missing.status.code(), Some(1));
    assert!(missing.stdout.is_empty());

    let bad_flag = dm_response(
        tmp.path(),
        &["aperture.pgm", "electrodes.pgm", "voltages.txt", "--no-such-flag"],
    );
    assert_eq!(bad_flag.status.code(), Some(1));

    let too_few = dm_response(tmp.path(), &["aperture.pgm"]);
    assert_eq!(too_few.status.code(), Some(1));

    let one_axis = dm_response(
        tmp.path(),
        &["aperture.pgm", "electrodes.pgm", "voltages.txt", "--tip-tilt", "0.5"],
    );
    assert_eq!(one_axis.status.code(), Some(1));

    let help = dm_response(tmp.path(), &["--help"]);
    assert_eq!(help.status.code(), Some(0));
}

#[test]
fn control_signals_match_equivalent_voltages() {
    let tmp = mirror_dir();
    let volts = dm_response(tmp.path(), &["aperture.pgm", "electrodes.pgm", "full.txt", CAP]);
    let controls = dm_response(
        tmp.path(),
        &["aperture.pgm", "electrodes.pgm", "controls.txt", CAP, "--control"],
    );
    assert_eq!(volts.status.code(), Some(0));
    assert_eq!(controls.status.code(), Some(0));
    assert_eq!(volts.stdout, controls.stdout);
}

#[test]
fn tip_tilt_adds_a_plane() {
    let tmp = mirror_dir();
    let out = dm_response(
        tmp.path(),
        &["aperture.pgm", "electrodes.pgm", "voltages.txt", CAP, "--tip-tilt", "0.5,0"],
    );
    assert_eq!(out.status.code(), Some(0));
    let v = values(&out);
    // corners lie outside the aperture, so only the tilt shows there
    assert!((v[0] + 1.0).abs() < 1e-9);
    assert!((v[N - 1] - 1.0).abs() < 1e-9);
}

#[test]
fn gain_and_surface_rescale_the_response() {
    let tmp = mirror_dir();
    let base = values(&dm_response(tmp.path(), &["aperture.pgm", "electrodes.pgm", "voltages.txt", CAP]));
    let gained = values(&dm_response(
        tmp.path(),
        &["aperture.pgm", "electrodes.pgm", "voltages.txt", CAP, "--dm-gain", "5"],
    ));
    let surface = values(&dm_response(
        tmp.path(),
        &["aperture.pgm", "electrodes.pgm", "voltages.txt", CAP, "--surface"],
    ));
    let tol = 1e-6 * peak(&base);
    for ((b, g), s) in base.iter().zip(&gained).zip(&surface) {
        assert!((5.0 * b - g).abs() < 5.0 * tol);
        assert!((0.5 * b - s).abs() < tol);
    }
}

#[test]
fn summary_is_written_as_json() {
    let tmp = mirror_dir();
    let out = dm_response(
        tmp.path(),
        &["aperture.pgm", "electrodes.pgm", "voltages.txt", CAP, "--summary", "summary.json"],
    );
    assert_eq!(out.status.code(), Some(0));

    let text = fs::read_to_string(tmp.path().join("summary.json")).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(summary["termination"], "converged");
    assert_eq!(summary["width"], N);
    assert_eq!(summary["electrodes"], 37);
    assert!(summary["sweeps"].as_u64().unwrap() >= 1);
    assert!(summary["residual"].as_f64().unwrap() < 1e-8);
    assert!(summary["min"].as_f64().unwrap() < 0.0);
    assert_eq!(summary["preview_flat"], false);
}

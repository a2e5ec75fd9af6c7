// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Driver Integration Tests
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! End-to-end runs: bookkeeping identities, checkpoint/restart and the
//! results loader.

use cascade_core::checkpoint::{checkpoint_file_name, Checkpoint};
use cascade_core::observer::NullObserver;
use cascade_core::results::CascadeResults;
use cascade_core::run::{CancelToken, CascadeRun, RunOutcome, RunState};
use cascade_types::config::{CascadeConfig, ResumeMode};
use cascade_types::error::CascadeError;
use ndarray::arr0;
use ndarray_npy::NpzWriter;
use std::fs::File;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn scratch_dir(tag: &str) -> PathBuf {
    let epoch_ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "cascade_{tag}_{}_{}",
        std::process::id(),
        epoch_ns
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn small_config() -> CascadeConfig {
    CascadeConfig {
        n_grid: 40,
        quadrature_nodes: 12,
        ..CascadeConfig::default()
    }
}

fn advance(run: &mut CascadeRun, n_gen: usize) -> RunOutcome {
    run.run(n_gen, &CancelToken::new(), &mut NullObserver).unwrap()
}

// ── Conservation Bookkeeping ─────────────────────────────────────────

#[test]
fn one_generation_with_enforcement_conserves_energy() {
    let config = CascadeConfig {
        enforce_energy_conservation: true,
        ..CascadeConfig::default()
    };
    let mut run = CascadeRun::fresh(config).unwrap();
    let e0 = run.e_tot();
    advance(&mut run, 1);
    let rel = (run.e_tot() - e0).abs() / e0;
    assert!(rel < 1e-9, "relative energy change {rel}");
}

#[test]
fn one_generation_without_enforcement_books_energy_change() {
    let mut run = CascadeRun::fresh(CascadeConfig::default()).unwrap();
    let e0 = run.e_tot();
    advance(&mut run, 1);
    let h = run.history();
    assert_eq!(h.len(), 2);
    assert_eq!(h.e_tot()[1] - h.e_tot()[0], h.delta_e()[1]);
    assert_eq!(run.e_tot() - e0, run.delta_e());
    // cascading multiplies particles
    assert!(run.n_tot() > 1.0);
}

#[test]
fn delta_n_tracks_reordered_count() {
    let mut run = CascadeRun::fresh(small_config()).unwrap();
    for _ in 0..5 {
        let n_old = run.n_tot();
        let dn_old = run.delta_n();
        let report = run.step().unwrap();
        assert_eq!(report.delta_n, dn_old + (report.reordered - n_old));
        // the grid can only lose particles
        assert!(report.reordered <= n_old * (1.0 + 1e-12));
    }
}

// ── Zero-Generation Runs ─────────────────────────────────────────────

#[test]
fn zero_generation_run_leaves_state_untouched() {
    let mut run = CascadeRun::fresh(small_config()).unwrap();
    advance(&mut run, 2);
    let history = run.history().clone();
    let lepton = run.lepton().clone();
    let (n, e) = (run.n_tot(), run.e_tot());

    assert_eq!(advance(&mut run, 2), RunOutcome::Converged);
    assert_eq!(run.history(), &history);
    assert_eq!(run.lepton(), &lepton);
    assert_eq!((run.n_tot(), run.e_tot()), (n, e));
}

// ── Checkpoint / Restart ─────────────────────────────────────────────

#[test]
fn restore_then_zero_generations_reproduces_history() {
    let dir = scratch_dir("restart_zero");
    let config = small_config();
    let mut run = CascadeRun::fresh(config.clone()).unwrap();
    let outcome = advance(&mut run, 3);
    let path = run.finish(outcome, run.checkpoint_path(&dir)).unwrap().unwrap();
    assert_eq!(run.state(), RunState::Saved);

    let mut restored = CascadeRun::restore(config, &path).unwrap();
    assert_eq!(restored.state(), RunState::Restoring);
    assert_eq!(restored.generation(), 3);
    advance(&mut restored, 3);
    assert_eq!(restored.history(), run.history());
    assert_eq!(restored.lepton(), run.lepton());
    assert_eq!(restored.photon(), run.photon());
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn split_run_matches_continuous_run() {
    let dir = scratch_dir("restart_split");
    let config = small_config();

    let mut straight = CascadeRun::fresh(config.clone()).unwrap();
    advance(&mut straight, 4);

    let mut first = CascadeRun::fresh(config.clone()).unwrap();
    let outcome = advance(&mut first, 2);
    let path = first.finish(outcome, first.checkpoint_path(&dir)).unwrap().unwrap();
    let mut second = CascadeRun::restore(config, &path).unwrap();
    advance(&mut second, 4);

    let a = straight.history();
    let b = second.history();
    assert_eq!(a.generations(), b.generations());
    for (ra, rb) in a.records().iter().zip(b.records()) {
        assert!((ra.n_tot - rb.n_tot).abs() <= 1e-12 * ra.n_tot);
        assert!((ra.e_tot - rb.e_tot).abs() <= 1e-12 * ra.e_tot);
        assert_eq!(ra.delta_n, rb.delta_n);
        for (x, y) in ra.lepton.iter().zip(rb.lepton.iter()) {
            assert!((x - y).abs() <= 1e-12 * x.abs().max(1e-300));
        }
    }
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn open_modes_resolve_against_checkpoint_dir() {
    let dir = scratch_dir("open_modes");
    let config = small_config();

    let err = CascadeRun::open(config.clone(), &dir, ResumeMode::Restart).unwrap_err();
    match err {
        CascadeError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected {other:?}"),
    }

    let mut run = CascadeRun::open(config.clone(), &dir, ResumeMode::Auto).unwrap();
    assert_eq!(run.generation(), 0);
    let outcome = advance(&mut run, 2);
    run.finish(outcome, run.checkpoint_path(&dir)).unwrap();
    assert!(dir.join(checkpoint_file_name(&config)).exists());

    let auto = CascadeRun::open(config.clone(), &dir, ResumeMode::Auto).unwrap();
    assert_eq!(auto.generation(), 2);
    let restart = CascadeRun::open(config.clone(), &dir, ResumeMode::Restart).unwrap();
    assert_eq!(restart.generation(), 2);
    let fresh = CascadeRun::open(config, &dir, ResumeMode::Fresh).unwrap();
    assert_eq!(fresh.generation(), 0);
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn restore_rejects_changed_configuration() {
    let dir = scratch_dir("mismatch");
    let config = small_config();
    let mut run = CascadeRun::fresh(config.clone()).unwrap();
    let outcome = advance(&mut run, 1);
    let path = run.finish(outcome, run.checkpoint_path(&dir)).unwrap().unwrap();

    let changed = CascadeConfig {
        enforce_energy_conservation: true,
        ..config.clone()
    };
    match CascadeRun::restore(changed, &path) {
        Err(CascadeError::RestartMismatch { field, stored, requested }) => {
            assert_eq!(field, "do_enforce_energy_conservation");
            assert_eq!(stored, "false");
            assert_eq!(requested, "true");
        }
        other => panic!("unexpected {other:?}"),
    }

    let changed = CascadeConfig {
        seed_emax: 0.5,
        ..config
    };
    assert!(matches!(
        CascadeRun::restore(changed, &path),
        Err(CascadeError::RestartMismatch { .. })
    ));
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn interrupted_before_first_generation_is_not_saved() {
    let dir = scratch_dir("interrupt");
    let mut run = CascadeRun::fresh(small_config()).unwrap();
    let token = CancelToken::new();
    token.cancel();
    let outcome = run.run(5, &token, &mut NullObserver).unwrap();
    assert_eq!(outcome, RunOutcome::Interrupted { completed: 0 });
    let path = run.checkpoint_path(&dir);
    assert_eq!(run.finish(outcome, &path).unwrap(), None);
    assert!(!path.exists());
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn older_checkpoint_without_optional_fields_loads_with_defaults() {
    let dir = scratch_dir("legacy");
    let config = small_config();
    let mut run = CascadeRun::fresh(config.clone()).unwrap();
    advance(&mut run, 2);
    let h = run.history();

    // as written before the radiated spectrum, Egmin and s were stored
    let path = dir.join("legacy.npz");
    let mut npz = NpzWriter::new(File::create(&path).unwrap());
    npz.add_array("Evec", run.grid().energies()).unwrap();
    npz.add_array("E0", &arr0(config.e0)).unwrap();
    let gens: ndarray::Array1<i64> = h.generations().iter().map(|&g| g as i64).collect();
    npz.add_array("gen_list", &gens).unwrap();
    npz.add_array("deltaN_list", &h.delta_n()).unwrap();
    npz.add_array("deltaE_list", &h.delta_e()).unwrap();
    npz.add_array("dNdE_list", &h.lepton_matrix()).unwrap();
    npz.add_array("Ntot_list", &h.n_tot()).unwrap();
    npz.add_array("Etot_list", &h.e_tot()).unwrap();
    npz.add_array("Emin", &arr0(config.grid_emin)).unwrap();
    npz.add_array("Emax", &arr0(config.grid_emax)).unwrap();
    npz.add_array("Ngrid", &arr0(config.n_grid as i64)).unwrap();
    npz.add_array("E0grid", &arr0(config.e0_grid)).unwrap();
    npz.add_array("Esmin", &arr0(config.seed_emin)).unwrap();
    npz.add_array("Esmax", &arr0(config.seed_emax)).unwrap();
    npz.add_array("do_enforce_energy_conservation", &arr0(false))
        .unwrap();
    npz.finish().unwrap();

    let ckpt = Checkpoint::load(&path).unwrap();
    assert_eq!(ckpt.seed_index, 2.2);
    assert_eq!(ckpt.eg_min, 1.0 / config.seed_emax);
    assert!(ckpt.history.photon_matrix().iter().all(|&v| v == 0.0));

    let restored = CascadeRun::restore(config, &path).unwrap();
    assert_eq!(restored.generation(), 2);
    assert_eq!(restored.photon().number(), 0.0);
    std::fs::remove_dir_all(dir).ok();
}

// ── Results Loader ───────────────────────────────────────────────────

#[test]
fn results_reconstruct_energy_split() {
    let dir = scratch_dir("results");
    let mut run = CascadeRun::fresh(small_config()).unwrap();
    let outcome = advance(&mut run, 3);
    let path = run.finish(outcome, run.checkpoint_path(&dir)).unwrap().unwrap();

    let res = CascadeResults::load(&path).unwrap();
    assert_eq!(res.len(), 4);
    assert_eq!(res.generations, vec![0, 1, 2, 3]);
    assert_eq!(res.lepton.dim(), (4, 40));
    assert_eq!(res.e_rad[0], 0.0);
    assert_eq!(res.n_rad[0], 0.0);
    for g in 0..res.len() {
        let rel = (res.e_all[g] - res.e_tot[g]).abs() / res.e_tot[g];
        assert!(rel < 1e-12, "gen {g}: {} vs {}", res.e_all[g], res.e_tot[g]);
        assert!((res.e_lep[g] + res.e_rad[g] - res.e_all[g]).abs() <= 1e-12 * res.e_all[g]);
    }
    assert!(res.n_rad[3] > 0.0);
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn malformed_seed_bounds_fail_at_construction() {
    let config = CascadeConfig {
        seed_emin: 1.0,
        seed_emax: 1.0,
        ..small_config()
    };
    assert!(matches!(
        CascadeRun::fresh(config),
        Err(CascadeError::InvalidRange(_))
    ));
}

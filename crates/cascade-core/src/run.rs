// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Cascade Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Generation loop with conservation bookkeeping and checkpoint/restart.
//!
//! A run owns its grids, kernel, spectra and history; nothing is global.
//! `Ntot` and `Etot` always cover leptons plus the cumulative radiated
//! photons. Per generation
//!
//!   `deltaN += reorderedCount - Ntot_old`
//!   `deltaE += Etot_new - Etot_old`
//!
//! so both deltas measure what the grid lost (or enforcement injected).

use crate::checkpoint::{checkpoint_file_name, Checkpoint};
use crate::history::{CascadeHistory, GenerationRecord};
use crate::observer::ProgressObserver;
use cascade_math::numeric::ensure_finite;
use cascade_physics::initial::initial_lepton_spectrum;
use cascade_physics::kernel::CascadeKernel;
use cascade_physics::seed::SeedPhoton;
use cascade_types::config::{CascadeConfig, ResumeMode};
use cascade_types::error::{CascadeError, CascadeResult};
use cascade_types::grid::Grid;
use cascade_types::spectrum::{Population, SpectralFunction};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation, polled between generations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Generation 0 only.
    Fresh,
    /// Loaded from a checkpoint, not yet advanced.
    Restoring,
    Running,
    Converged,
    Interrupted,
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Converged,
    /// Cancelled after `completed` generations of this call.
    Interrupted { completed: usize },
}

/// Bookkeeping of one generation, as returned by [`CascadeRun::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub generation: usize,
    pub reordered: f64,
    pub n_tot: f64,
    pub e_tot: f64,
    pub delta_n: f64,
    pub delta_e: f64,
}

#[derive(Debug, Clone)]
pub struct CascadeRun {
    config: CascadeConfig,
    grid: Arc<Grid>,
    kernel: CascadeKernel,
    old_lepton: SpectralFunction,
    new_lepton: SpectralFunction,
    old_photon: SpectralFunction,
    new_photon: SpectralFunction,
    generation: usize,
    start_generation: usize,
    n_tot: f64,
    e_tot: f64,
    delta_n: f64,
    delta_e: f64,
    history: CascadeHistory,
    state: RunState,
}

impl CascadeRun {
    /// Start at generation 0 from the configured initial spectrum.
    ///
    /// The whole configuration is validated before anything is built.
    pub fn fresh(config: CascadeConfig) -> CascadeResult<Self> {
        config.validate()?;
        let mut run = Self::assemble(config)?;

        let initial = initial_lepton_spectrum(
            run.grid.clone(),
            run.config.e0,
            run.config.initial_spectrum,
        )?;
        run.new_lepton.copy_from(&initial)?;
        run.old_lepton.copy_from(&initial)?;
        run.n_tot = run.total_number();
        run.e_tot = run.total_energy();
        run.record()?;

        log::info!(
            "Fresh cascade: E0 = {:e}, Ngrid = {}, s = {}, seed [{:e}, {:e}], enforce = {}",
            run.config.e0,
            run.config.n_grid,
            run.config.seed_index,
            run.config.seed_emin,
            run.config.seed_emax,
            run.config.enforce_energy_conservation
        );
        Ok(run)
    }

    /// Continue a run from the checkpoint at `path`.
    ///
    /// Fails with `RestartMismatch` when the checkpoint was written under a
    /// different grid, seed field or conservation setting.
    pub fn restore(config: CascadeConfig, path: impl AsRef<Path>) -> CascadeResult<Self> {
        config.validate()?;
        let checkpoint = Checkpoint::load(path.as_ref())?;
        checkpoint.check_compatible(&config)?;

        let mut run = Self::assemble(config)?;
        run.state = RunState::Restoring;

        let stored = &checkpoint.energies;
        let grid_energies = run.grid.energies();
        if let Some(k) = (0..grid_energies.len())
            .find(|&k| (stored[k] / grid_energies[k] - 1.0).abs() > 1e-12)
        {
            return Err(CascadeError::RestartMismatch {
                field: "Evec".to_string(),
                stored: stored[k].to_string(),
                requested: grid_energies[k].to_string(),
            });
        }

        let last = checkpoint.history.last().ok_or_else(|| {
            CascadeError::Checkpoint(format!("checkpoint {:?} holds no generations", path.as_ref()))
        })?;
        run.new_lepton.set_values(last.lepton.clone())?;
        run.new_photon.set_values(last.photon.clone())?;
        run.old_lepton.copy_from(&run.new_lepton)?;
        run.old_photon.copy_from(&run.new_photon)?;
        run.generation = last.generation;
        run.start_generation = last.generation;
        run.n_tot = last.n_tot;
        run.e_tot = last.e_tot;
        run.delta_n = last.delta_n;
        run.delta_e = last.delta_e;
        run.history = checkpoint.history;

        log::info!(
            "Restored cascade at generation {} from {:?}",
            run.generation,
            path.as_ref()
        );
        Ok(run)
    }

    /// Fresh or restored run according to `mode`, using the deterministic
    /// checkpoint name inside `dir`.
    pub fn open(
        config: CascadeConfig,
        dir: impl AsRef<Path>,
        mode: ResumeMode,
    ) -> CascadeResult<Self> {
        let path = dir.as_ref().join(checkpoint_file_name(&config));
        match mode {
            ResumeMode::Fresh => Self::fresh(config),
            ResumeMode::Restart => {
                if !path.exists() {
                    return Err(CascadeError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("no checkpoint to restart from at {path:?}"),
                    )));
                }
                Self::restore(config, &path)
            }
            ResumeMode::Auto => {
                if path.exists() {
                    Self::restore(config, &path)
                } else {
                    log::info!("No checkpoint at {path:?}, starting fresh");
                    Self::fresh(config)
                }
            }
        }
    }

    fn assemble(config: CascadeConfig) -> CascadeResult<Self> {
        let grid = Arc::new(Grid::primary(
            config.grid_emin,
            config.grid_emax,
            config.e0_grid,
            config.n_grid,
        )?);
        let altgrid = Arc::new(grid.staggered()?);
        let seed = SeedPhoton::from_config(&config)?;
        let kernel = CascadeKernel::build(grid.clone(), altgrid, seed, config.quadrature_nodes)?;

        let lepton = SpectralFunction::from_grid(grid.clone(), Population::Lepton);
        let photon = SpectralFunction::from_grid(grid.clone(), Population::Radiated);
        Ok(CascadeRun {
            config,
            grid,
            kernel,
            old_lepton: lepton.clone(),
            new_lepton: lepton,
            old_photon: photon.clone(),
            new_photon: photon,
            generation: 0,
            start_generation: 0,
            n_tot: 0.0,
            e_tot: 0.0,
            delta_n: 0.0,
            delta_e: 0.0,
            history: CascadeHistory::new(),
            state: RunState::Fresh,
        })
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn altgrid(&self) -> &Arc<Grid> {
        self.kernel.altgrid()
    }

    pub fn seed(&self) -> &SeedPhoton {
        self.kernel.seed()
    }

    pub fn kernel(&self) -> &CascadeKernel {
        &self.kernel
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn lepton(&self) -> &SpectralFunction {
        &self.new_lepton
    }

    pub fn photon(&self) -> &SpectralFunction {
        &self.new_photon
    }

    pub fn n_tot(&self) -> f64 {
        self.n_tot
    }

    pub fn e_tot(&self) -> f64 {
        self.e_tot
    }

    pub fn delta_n(&self) -> f64 {
        self.delta_n
    }

    pub fn delta_e(&self) -> f64 {
        self.delta_e
    }

    pub fn history(&self) -> &CascadeHistory {
        &self.history
    }

    /// Deterministic checkpoint location for this run inside `dir`.
    pub fn checkpoint_path(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(checkpoint_file_name(&self.config))
    }

    fn total_number(&self) -> f64 {
        self.new_lepton.number() + self.new_photon.number()
    }

    fn total_energy(&self) -> f64 {
        self.new_lepton.energy() + self.new_photon.energy()
    }

    fn record(&mut self) -> CascadeResult<()> {
        self.history.push(GenerationRecord {
            generation: self.generation,
            lepton: self.new_lepton.values().clone(),
            photon: self.new_photon.values().clone(),
            n_tot: self.n_tot,
            e_tot: self.e_tot,
            delta_n: self.delta_n,
            delta_e: self.delta_e,
        })
    }

    /// Advance one generation and record it.
    pub fn step(&mut self) -> CascadeResult<StepReport> {
        self.old_lepton.copy_from(&self.new_lepton)?;
        self.old_photon.copy_from(&self.new_photon)?;
        let n_old = self.n_tot;
        let e_old = self.e_tot;

        let reordered = self.kernel.update(
            &self.old_lepton,
            &self.old_photon,
            &mut self.new_lepton,
            &mut self.new_photon,
            self.config.enforce_energy_conservation,
        )?;

        self.n_tot = ensure_finite(self.total_number(), "Ntot")?;
        self.e_tot = ensure_finite(self.total_energy(), "Etot")?;
        self.delta_n += reordered - n_old;
        self.delta_e += self.e_tot - e_old;
        self.generation += 1;
        self.record()?;

        log::debug!(
            "gen {}: Ntot = {:.6e}, Etot = {:.6e}, deltaN = {:.3e}, deltaE = {:.3e}",
            self.generation,
            self.n_tot,
            self.e_tot,
            self.delta_n,
            self.delta_e
        );
        Ok(StepReport {
            generation: self.generation,
            reordered,
            n_tot: self.n_tot,
            e_tot: self.e_tot,
            delta_n: self.delta_n,
            delta_e: self.delta_e,
        })
    }

    /// Advance until generation `n_gen` or until `cancel` fires.
    ///
    /// Errors from the kernel abort the run; the state is left at the last
    /// completed generation.
    pub fn run(
        &mut self,
        n_gen: usize,
        cancel: &CancelToken,
        observer: &mut dyn ProgressObserver,
    ) -> CascadeResult<RunOutcome> {
        if n_gen <= self.generation {
            log::info!(
                "Already at generation {}, nothing to run up to {n_gen}",
                self.generation
            );
            return Ok(RunOutcome::Converged);
        }

        self.state = RunState::Running;
        let mut completed = 0;
        while self.generation < n_gen {
            if cancel.is_cancelled() {
                self.state = RunState::Interrupted;
                log::info!(
                    "Interrupted at generation {} after {completed} generations",
                    self.generation
                );
                return Ok(RunOutcome::Interrupted { completed });
            }
            self.step()?;
            completed += 1;
            if self.generation % self.config.plot_interval == 0 {
                observer.on_checkpoint(self.generation, self.grid.energies(), &self.new_lepton);
            }
        }

        self.state = RunState::Converged;
        log::info!(
            "Reached generation {}: Ntot = {:.6e}, Etot = {:.6e}, deltaN = {:.3e}, deltaE = {:.3e}",
            self.generation,
            self.n_tot,
            self.e_tot,
            self.delta_n,
            self.delta_e
        );
        Ok(RunOutcome::Converged)
    }

    /// Persist the run after [`Self::run`].
    ///
    /// A run interrupted before completing any generation since it was
    /// opened is not saved and yields `None`.
    pub fn finish(
        &mut self,
        outcome: RunOutcome,
        path: impl AsRef<Path>,
    ) -> CascadeResult<Option<PathBuf>> {
        let path = path.as_ref();
        if matches!(outcome, RunOutcome::Interrupted { .. })
            && self.generation == self.start_generation
        {
            log::info!("Interrupted before any new generation, not saving");
            return Ok(None);
        }
        self.save(path)?;
        Ok(Some(path.to_path_buf()))
    }

    /// Write the checkpoint unconditionally.
    pub fn save(&mut self, path: impl AsRef<Path>) -> CascadeResult<()> {
        Checkpoint::new(&self.config, self.grid.energies().clone(), self.history.clone())
            .save(path)?;
        self.state = RunState::Saved;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use cascade_types::config::InitialSpectrumConfig;
    use ndarray::Array1;

    fn small_config() -> CascadeConfig {
        CascadeConfig {
            n_grid: 40,
            quadrature_nodes: 12,
            ..CascadeConfig::default()
        }
    }

    struct Recorder(Vec<usize>);

    impl ProgressObserver for Recorder {
        fn on_checkpoint(&mut self, generation: usize, energies: &Array1<f64>, spectrum: &SpectralFunction) {
            assert_eq!(energies.len(), spectrum.values().len());
            self.0.push(generation);
        }
    }

    #[test]
    fn test_fresh_records_generation_zero() {
        let run = CascadeRun::fresh(small_config()).unwrap();
        assert_eq!(run.state(), RunState::Fresh);
        assert_eq!(run.generation(), 0);
        assert_eq!(run.history().len(), 1);
        assert!((run.n_tot() - 1.0).abs() < 1e-12);
        assert_eq!(run.delta_n(), 0.0);
        assert_eq!(run.photon().number(), 0.0);
        assert_eq!(run.altgrid().len(), 39);
    }

    #[test]
    fn test_fresh_rejects_bad_seed_before_building() {
        let cfg = CascadeConfig {
            seed_emin: 0.79,
            seed_emax: 0.0012,
            ..small_config()
        };
        assert!(matches!(
            CascadeRun::fresh(cfg),
            Err(CascadeError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_step_bookkeeping() {
        let mut run = CascadeRun::fresh(small_config()).unwrap();
        for _ in 0..3 {
            let n_old = run.n_tot();
            let e_old = run.e_tot();
            let dn_old = run.delta_n();
            let de_old = run.delta_e();
            let r = run.step().unwrap();
            assert_eq!(r.delta_n, dn_old + (r.reordered - n_old));
            assert_eq!(r.delta_e, de_old + (r.e_tot - e_old));
        }
        assert_eq!(run.generation(), 3);
        assert_eq!(run.history().generations(), vec![0, 1, 2, 3]);
        assert!(run.photon().number() > 0.0);
    }

    #[test]
    fn test_run_calls_observer_on_interval() {
        let cfg = CascadeConfig {
            plot_interval: 2,
            initial_spectrum: InitialSpectrumConfig::SingleBin,
            ..small_config()
        };
        let mut run = CascadeRun::fresh(cfg).unwrap();
        let mut rec = Recorder(Vec::new());
        let out = run.run(5, &CancelToken::new(), &mut rec).unwrap();
        assert_eq!(out, RunOutcome::Converged);
        assert_eq!(run.state(), RunState::Converged);
        assert_eq!(rec.0, vec![2, 4]);
    }

    #[test]
    fn test_cancelled_run_stops_at_boundary() {
        let mut run = CascadeRun::fresh(small_config()).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let out = run.run(10, &token, &mut NullObserver).unwrap();
        assert_eq!(out, RunOutcome::Interrupted { completed: 0 });
        assert_eq!(run.state(), RunState::Interrupted);
        assert_eq!(run.generation(), 0);
        assert_eq!(run.history().len(), 1);
    }

    #[test]
    fn test_zero_generation_run_is_noop() {
        let mut run = CascadeRun::fresh(small_config()).unwrap();
        run.step().unwrap();
        let before = run.history().clone();
        let out = run.run(1, &CancelToken::new(), &mut NullObserver).unwrap();
        assert_eq!(out, RunOutcome::Converged);
        assert_eq!(run.history(), &before);
        let out = run.run(0, &CancelToken::new(), &mut NullObserver).unwrap();
        assert_eq!(out, RunOutcome::Converged);
        assert_eq!(run.history(), &before);
    }
}

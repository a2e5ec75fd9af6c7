// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — NPZ Checkpoint
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Run state as a NumPy `.npz` archive.
//!
//! Scalars are stored as 0-d arrays, the way `numpy.savez` writes them, so
//! archives load directly with `numpy.load`. Archives from older runs may
//! lack `dNdE_rad_list`, `Egmin` or `s`; those fall back to defaults with a
//! warning.

use crate::history::{CascadeHistory, GenerationRecord};
use cascade_types::config::CascadeConfig;
use cascade_types::constants::DEFAULT_SEED_INDEX;
use cascade_types::error::{CascadeError, CascadeResult};
use ndarray::{arr0, Array, Array1, Array2, ArrayBase, Data, Dimension, Ix0, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter, ReadableElement, WritableElement};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Everything needed to resume or analyse a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub energies: Array1<f64>,
    pub e0: f64,
    pub grid_emin: f64,
    pub grid_emax: f64,
    pub n_grid: usize,
    pub e0_grid: f64,
    pub seed_emin: f64,
    pub seed_emax: f64,
    pub seed_index: f64,
    /// Pair threshold actually used, never `None`.
    pub eg_min: f64,
    pub enforce_energy_conservation: bool,
    pub history: CascadeHistory,
}

/// Deterministic archive name for a configuration.
///
/// The pair threshold only enters the name when it overrides `1 / Esmax`.
pub fn checkpoint_file_name(config: &CascadeConfig) -> String {
    let mut name = format!(
        "cascade_E0_{:e}_N{}_s{}_Es{:e}-{:e}",
        config.e0, config.n_grid, config.seed_index, config.seed_emin, config.seed_emax
    );
    if let Some(eg) = config.eg_min {
        name.push_str(&format!("_Eg{eg:e}"));
    }
    name.push_str(if config.enforce_energy_conservation {
        "_cons.npz"
    } else {
        "_nocons.npz"
    });
    name
}

impl Checkpoint {
    pub fn new(config: &CascadeConfig, energies: Array1<f64>, history: CascadeHistory) -> Self {
        Checkpoint {
            energies,
            e0: config.e0,
            grid_emin: config.grid_emin,
            grid_emax: config.grid_emax,
            n_grid: config.n_grid,
            e0_grid: config.e0_grid,
            seed_emin: config.seed_emin,
            seed_emax: config.seed_emax,
            seed_index: config.seed_index,
            eg_min: config.pair_threshold(),
            enforce_energy_conservation: config.enforce_energy_conservation,
            history,
        }
    }

    /// Write the archive. The file is replaced atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> CascadeResult<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let n_grid = i64::try_from(self.n_grid)
            .map_err(|_| CascadeError::Checkpoint(format!("Ngrid {} overflows i64", self.n_grid)))?;
        let generations = self
            .history
            .generations()
            .into_iter()
            .map(|g| {
                i64::try_from(g)
                    .map_err(|_| CascadeError::Checkpoint(format!("generation {g} overflows i64")))
            })
            .collect::<CascadeResult<Array1<i64>>>()?;

        let partial = partial_path(path);
        let mut npz = NpzWriter::new(File::create(&partial)?);
        add(&mut npz, "Evec", &self.energies)?;
        add(&mut npz, "E0", &arr0(self.e0))?;
        add(&mut npz, "gen_list", &generations)?;
        add(&mut npz, "deltaN_list", &self.history.delta_n())?;
        add(&mut npz, "deltaE_list", &self.history.delta_e())?;
        add(&mut npz, "dNdE_list", &self.history.lepton_matrix())?;
        add(&mut npz, "dNdE_rad_list", &self.history.photon_matrix())?;
        add(&mut npz, "Ntot_list", &self.history.n_tot())?;
        add(&mut npz, "Etot_list", &self.history.e_tot())?;
        add(&mut npz, "Emin", &arr0(self.grid_emin))?;
        add(&mut npz, "Emax", &arr0(self.grid_emax))?;
        add(&mut npz, "Ngrid", &arr0(n_grid))?;
        add(&mut npz, "E0grid", &arr0(self.e0_grid))?;
        add(&mut npz, "Esmin", &arr0(self.seed_emin))?;
        add(&mut npz, "Esmax", &arr0(self.seed_emax))?;
        add(&mut npz, "Egmin", &arr0(self.eg_min))?;
        add(&mut npz, "s", &arr0(self.seed_index))?;
        add(
            &mut npz,
            "do_enforce_energy_conservation",
            &arr0(self.enforce_energy_conservation),
        )?;
        npz.finish()
            .map_err(|e| CascadeError::Checkpoint(format!("Failed to finish npz: {e}")))?;

        std::fs::rename(&partial, path)?;
        log::info!(
            "Saved checkpoint with {} generations to {:?}",
            self.history.len(),
            path
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> CascadeResult<Self> {
        let path = path.as_ref();
        let mut archive = Archive::open(path)?;

        let energies: Array1<f64> = archive.read("Evec")?;
        let e0 = archive.scalar::<f64>("E0")?;
        let grid_emin = archive.scalar::<f64>("Emin")?;
        let grid_emax = archive.scalar::<f64>("Emax")?;
        let n_grid = archive.scalar::<i64>("Ngrid")?;
        let n_grid = usize::try_from(n_grid)
            .map_err(|_| CascadeError::Checkpoint(format!("negative Ngrid {n_grid} in {path:?}")))?;
        let e0_grid = archive.scalar::<f64>("E0grid")?;
        let seed_emin = archive.scalar::<f64>("Esmin")?;
        let seed_emax = archive.scalar::<f64>("Esmax")?;
        let enforce_energy_conservation = archive.scalar::<bool>("do_enforce_energy_conservation")?;

        let seed_index = if archive.has("s") {
            archive.scalar::<f64>("s")?
        } else {
            log::warn!("checkpoint {path:?} has no `s`, assuming {DEFAULT_SEED_INDEX}");
            DEFAULT_SEED_INDEX
        };
        let eg_min = if archive.has("Egmin") {
            archive.scalar::<f64>("Egmin")?
        } else {
            let eg = 1.0 / seed_emax;
            log::warn!("checkpoint {path:?} has no `Egmin`, assuming 1/Esmax = {eg}");
            eg
        };

        let generations: Array1<i64> = archive.read("gen_list")?;
        let delta_n: Array1<f64> = archive.read("deltaN_list")?;
        let delta_e: Array1<f64> = archive.read("deltaE_list")?;
        let n_tot: Array1<f64> = archive.read("Ntot_list")?;
        let e_tot: Array1<f64> = archive.read("Etot_list")?;
        let lepton: Array2<f64> = archive.read("dNdE_list")?;
        let photon: Array2<f64> = if archive.has("dNdE_rad_list") {
            archive.read("dNdE_rad_list")?
        } else {
            log::warn!("checkpoint {path:?} has no `dNdE_rad_list`, assuming no radiated photons");
            Array2::zeros(lepton.dim())
        };

        let g = generations.len();
        let n = energies.len();
        if n != n_grid {
            return Err(CascadeError::Checkpoint(format!(
                "Evec has {n} points but Ngrid = {n_grid}"
            )));
        }
        for (key, len) in [
            ("deltaN_list", delta_n.len()),
            ("deltaE_list", delta_e.len()),
            ("Ntot_list", n_tot.len()),
            ("Etot_list", e_tot.len()),
        ] {
            if len != g {
                return Err(CascadeError::Checkpoint(format!(
                    "{key} has {len} entries, gen_list has {g}"
                )));
            }
        }
        for (key, dim) in [("dNdE_list", lepton.dim()), ("dNdE_rad_list", photon.dim())] {
            if dim != (g, n) {
                return Err(CascadeError::Checkpoint(format!(
                    "{key} has shape {dim:?}, expected ({g}, {n})"
                )));
            }
        }

        // history is indexed by generation, so the list must have no gaps
        if let Some(&first) = generations.first() {
            if let Some(i) = (1..g).find(|&i| generations[i] != first + i as i64) {
                return Err(CascadeError::Checkpoint(format!(
                    "gen_list jumps from {} to {} at entry {i}",
                    generations[i - 1],
                    generations[i]
                )));
            }
        }

        let mut history = CascadeHistory::new();
        for i in 0..g {
            let generation = usize::try_from(generations[i]).map_err(|_| {
                CascadeError::Checkpoint(format!("negative generation {}", generations[i]))
            })?;
            history
                .push(GenerationRecord {
                    generation,
                    lepton: lepton.row(i).to_owned(),
                    photon: photon.row(i).to_owned(),
                    n_tot: n_tot[i],
                    e_tot: e_tot[i],
                    delta_n: delta_n[i],
                    delta_e: delta_e[i],
                })
                .map_err(|e| CascadeError::Checkpoint(format!("corrupt history: {e}")))?;
        }

        log::info!("Loaded checkpoint with {g} generations from {path:?}");
        Ok(Checkpoint {
            energies,
            e0,
            grid_emin,
            grid_emax,
            n_grid,
            e0_grid,
            seed_emin,
            seed_emax,
            seed_index,
            eg_min,
            enforce_energy_conservation,
            history,
        })
    }

    /// Check that `config` would reproduce this run.
    pub fn check_compatible(&self, config: &CascadeConfig) -> CascadeResult<()> {
        if self.enforce_energy_conservation != config.enforce_energy_conservation {
            return Err(CascadeError::RestartMismatch {
                field: "do_enforce_energy_conservation".to_string(),
                stored: self.enforce_energy_conservation.to_string(),
                requested: config.enforce_energy_conservation.to_string(),
            });
        }
        if self.n_grid != config.n_grid {
            return Err(CascadeError::RestartMismatch {
                field: "Ngrid".to_string(),
                stored: self.n_grid.to_string(),
                requested: config.n_grid.to_string(),
            });
        }
        let pairs = [
            ("E0", self.e0, config.e0),
            ("Emin", self.grid_emin, config.grid_emin),
            ("Emax", self.grid_emax, config.grid_emax),
            ("Esmin", self.seed_emin, config.seed_emin),
            ("Esmax", self.seed_emax, config.seed_emax),
            ("s", self.seed_index, config.seed_index),
            ("Egmin", self.eg_min, config.pair_threshold()),
        ];
        for (field, stored, requested) in pairs {
            if !same_value(stored, requested) {
                return Err(CascadeError::RestartMismatch {
                    field: field.to_string(),
                    stored: stored.to_string(),
                    requested: requested.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn same_value(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= 1e-12 * a.abs().max(b.abs())
}

fn add<S, D>(npz: &mut NpzWriter<File>, key: &str, array: &ArrayBase<S, D>) -> CascadeResult<()>
where
    S: Data,
    S::Elem: WritableElement,
    D: Dimension,
{
    npz.add_array(key, array)
        .map_err(|e| CascadeError::Checkpoint(format!("Failed to write {key} to npz: {e}")))
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Open archive plus its member list.
struct Archive {
    npz: NpzReader<File>,
    names: Vec<String>,
}

impl Archive {
    fn open(path: &Path) -> CascadeResult<Self> {
        let file = File::open(path)?;
        let mut npz = NpzReader::new(file)
            .map_err(|e| CascadeError::Checkpoint(format!("Failed to open npz {path:?}: {e}")))?;
        let names = npz
            .names()
            .map_err(|e| CascadeError::Checkpoint(format!("Failed to list npz {path:?}: {e}")))?;
        Ok(Archive { npz, names })
    }

    fn has(&self, key: &str) -> bool {
        let npy = format!("{key}.npy");
        self.names.iter().any(|n| n == key || *n == npy)
    }

    fn read<A, D>(&mut self, key: &str) -> CascadeResult<Array<A, D>>
    where
        A: ReadableElement,
        D: Dimension,
    {
        self.npz
            .by_name::<OwnedRepr<A>, D>(&format!("{key}.npy"))
            .or_else(|_| self.npz.by_name::<OwnedRepr<A>, D>(key))
            .map_err(|e| CascadeError::Checkpoint(format!("Failed to read {key} from npz: {e}")))
    }

    fn scalar<A>(&mut self, key: &str) -> CascadeResult<A>
    where
        A: ReadableElement + Copy,
    {
        let a: Array<A, Ix0> = self.read(key)?;
        Ok(a[()])
    }
}

// ─────────────────────────────────────────────────────────────────────
// Pair Cascade Core — Generation History
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use cascade_types::error::{CascadeError, CascadeResult};
use ndarray::{Array1, Array2};

/// Snapshot of one completed generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRecord {
    pub generation: usize,
    /// Lepton `dN/dE` on the primary grid.
    pub lepton: Array1<f64>,
    /// Cumulative radiated photon `dN/dE`.
    pub photon: Array1<f64>,
    pub n_tot: f64,
    pub e_tot: f64,
    pub delta_n: f64,
    pub delta_e: f64,
}

/// Per-generation record of a run, generation 0 first.
///
/// Generations are strictly increasing and every spectrum has the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadeHistory {
    records: Vec<GenerationRecord>,
}

impl CascadeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: GenerationRecord) -> CascadeResult<()> {
        if let Some(last) = self.records.last() {
            if record.generation <= last.generation {
                return Err(CascadeError::InvalidRange(format!(
                    "generation {} recorded after generation {}",
                    record.generation, last.generation
                )));
            }
            for spectrum in [&record.lepton, &record.photon] {
                if spectrum.len() != last.lepton.len() {
                    return Err(CascadeError::ShapeMismatch {
                        expected: last.lepton.len(),
                        actual: spectrum.len(),
                    });
                }
            }
        } else if record.lepton.len() != record.photon.len() {
            return Err(CascadeError::ShapeMismatch {
                expected: record.lepton.len(),
                actual: record.photon.len(),
            });
        }
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&GenerationRecord> {
        self.records.last()
    }

    /// Grid length of the stored spectra (0 when empty).
    pub fn width(&self) -> usize {
        self.records.first().map_or(0, |r| r.lepton.len())
    }

    pub fn generations(&self) -> Vec<usize> {
        self.records.iter().map(|r| r.generation).collect()
    }

    pub fn n_tot(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.n_tot).collect()
    }

    pub fn e_tot(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.e_tot).collect()
    }

    pub fn delta_n(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.delta_n).collect()
    }

    pub fn delta_e(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.delta_e).collect()
    }

    /// Lepton spectra stacked as `(generation, energy)`.
    pub fn lepton_matrix(&self) -> Array2<f64> {
        self.stack(|r| &r.lepton)
    }

    /// Radiated spectra stacked as `(generation, energy)`.
    pub fn photon_matrix(&self) -> Array2<f64> {
        self.stack(|r| &r.photon)
    }

    fn stack<F>(&self, pick: F) -> Array2<f64>
    where
        F: Fn(&GenerationRecord) -> &Array1<f64>,
    {
        let mut out = Array2::zeros((self.len(), self.width()));
        for (mut row, record) in out.outer_iter_mut().zip(self.records.iter()) {
            row.assign(pick(record));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn record(generation: usize, n: usize) -> GenerationRecord {
        GenerationRecord {
            generation,
            lepton: Array1::from_elem(n, generation as f64),
            photon: Array1::zeros(n),
            n_tot: 1.0,
            e_tot: 2.0,
            delta_n: 0.0,
            delta_e: -0.5 * generation as f64,
        }
    }

    #[test]
    fn test_push_and_columns() {
        let mut h = CascadeHistory::new();
        h.push(record(0, 3)).unwrap();
        h.push(record(1, 3)).unwrap();
        assert_eq!(h.len(), 2);
        assert_eq!(h.generations(), vec![0, 1]);
        assert_eq!(h.delta_e(), array![0.0, -0.5]);
        let m = h.lepton_matrix();
        assert_eq!(m.dim(), (2, 3));
        assert_eq!(m.row(1), array![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_rejects_out_of_order_generation() {
        let mut h = CascadeHistory::new();
        h.push(record(2, 3)).unwrap();
        assert!(h.push(record(2, 3)).is_err());
        assert!(h.push(record(1, 3)).is_err());
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_rejects_ragged_spectra() {
        let mut h = CascadeHistory::new();
        h.push(record(0, 3)).unwrap();
        assert!(matches!(
            h.push(record(1, 4)),
            Err(CascadeError::ShapeMismatch { expected: 3, actual: 4 })
        ));
    }

    #[test]
    fn test_empty_history() {
        let h = CascadeHistory::new();
        assert!(h.is_empty());
        assert_eq!(h.lepton_matrix().dim(), (0, 0));
        assert!(h.last().is_none());
    }
}

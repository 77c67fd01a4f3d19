use super::elements::Element;
use crate::core::schema::normalized::NormalizedMolecule;
use nalgebra::Point3;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Real nuclei closer than this (in Bohr) are treated as the same position.
const COINCIDENCE_THRESHOLD_BOHR: f64 = 1.0e-6;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum MoleculeError {
    #[error(
        "Molecule shape mismatch: {geometry} geometry values, {symbols} symbols, {real} real flags (expected 3N, N, N)"
    )]
    ShapeMismatch {
        geometry: usize,
        symbols: usize,
        real: usize,
    },
    #[error("Molecule has no real atoms; at least one site must carry nuclear charge")]
    NoRealAtoms,
    #[error("Unknown element symbol '{symbol}' at site {index}")]
    UnknownElement { index: usize, symbol: String },
    #[error("Geometry value {index} is not a finite number")]
    NonFiniteCoordinate { index: usize },
    #[error("Real atoms {first} and {second} occupy the same position")]
    CoincidentAtoms { first: usize, second: usize },
    #[error("Molecular charge {charge} exceeds the nuclear charge {nuclear_charge} of the real atoms")]
    InvalidCharge { charge: i32, nuclear_charge: u32 },
    #[error("Multiplicity {multiplicity} is impossible with {electrons} electrons")]
    InvalidMultiplicity { multiplicity: u32, electrons: u32 },
}

/// One position in the molecule: an element at a point, either real or ghost.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    element: Element,
    position: Point3<f64>,
    real: bool,
}

impl Site {
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Cartesian position in Bohr.
    pub fn position(&self) -> &Point3<f64> {
        &self.position
    }

    /// `false` for ghost sites, which carry basis functions but no charge or electrons.
    pub fn is_real(&self) -> bool {
        self.real
    }

    pub fn is_ghost(&self) -> bool {
        !self.real
    }

    /// Nuclear charge this site contributes: the atomic number for real sites, zero for ghosts.
    pub fn nuclear_charge(&self) -> u32 {
        if self.real {
            self.element.atomic_number()
        } else {
            0
        }
    }
}

/// A validated, immutable molecule.
///
/// All charge bookkeeping (nuclear charge, electron count, multiplicity, alpha and
/// beta counts, nuclear repulsion) is derived from real sites only. Ghost sites keep
/// their element so a backend can place basis functions on them.
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    sites: Vec<Site>,
    molecular_charge: i32,
    multiplicity: u32,
    nuclear_charge: u32,
    electron_count: u32,
}

impl Molecule {
    /// Builds a molecule from a normalized request section.
    ///
    /// When `real` is absent every site is treated as real. When no multiplicity is
    /// given, the lowest one compatible with the electron count is used (singlet for
    /// an even count, doublet for an odd one).
    ///
    /// # Errors
    ///
    /// Fails with [`MoleculeError::ShapeMismatch`] unless
    /// `len(geometry) == 3 * len(symbols) == 3 * len(real)`, with
    /// [`MoleculeError::NoRealAtoms`] when every site is a ghost, and with the
    /// remaining variants for unknown elements, non-finite or coincident positions,
    /// and impossible charge/multiplicity combinations.
    pub fn build(input: &NormalizedMolecule) -> Result<Self, MoleculeError> {
        let n_sites = input.symbols.len();
        let real_len = input.real.as_ref().map_or(n_sites, Vec::len);
        if input.geometry.len() != 3 * n_sites || real_len != n_sites {
            return Err(MoleculeError::ShapeMismatch {
                geometry: input.geometry.len(),
                symbols: n_sites,
                real: real_len,
            });
        }

        if let Some(index) = input.geometry.iter().position(|x| !x.is_finite()) {
            return Err(MoleculeError::NonFiniteCoordinate { index });
        }

        let mut sites = Vec::with_capacity(n_sites);
        for (index, (symbol, xyz)) in input
            .symbols
            .iter()
            .zip(input.geometry.chunks_exact(3))
            .enumerate()
        {
            let element =
                Element::from_symbol(symbol).ok_or_else(|| MoleculeError::UnknownElement {
                    index,
                    symbol: symbol.clone(),
                })?;
            let real = input.real.as_ref().is_none_or(|flags| flags[index]);
            sites.push(Site {
                element,
                position: Point3::new(xyz[0], xyz[1], xyz[2]),
                real,
            });
        }

        if !sites.iter().any(Site::is_real) {
            return Err(MoleculeError::NoRealAtoms);
        }
        check_coincident_nuclei(&sites)?;

        let nuclear_charge: u32 = sites.iter().map(Site::nuclear_charge).sum();
        let molecular_charge = input.molecular_charge.unwrap_or(0);
        let electrons = i64::from(nuclear_charge) - i64::from(molecular_charge);
        let electron_count = u32::try_from(electrons).map_err(|_| MoleculeError::InvalidCharge {
            charge: molecular_charge,
            nuclear_charge,
        })?;

        let multiplicity = match input.molecular_multiplicity {
            Some(m) => {
                validate_multiplicity(m, electron_count)?;
                m
            }
            None => 1 + electron_count % 2,
        };

        Ok(Self {
            sites,
            molecular_charge,
            multiplicity,
            nuclear_charge,
            electron_count,
        })
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Number of sites, ghosts included.
    pub fn natom(&self) -> usize {
        self.sites.len()
    }

    pub fn real_count(&self) -> usize {
        self.sites.iter().filter(|s| s.is_real()).count()
    }

    pub fn ghost_count(&self) -> usize {
        self.natom() - self.real_count()
    }

    pub fn molecular_charge(&self) -> i32 {
        self.molecular_charge
    }

    pub fn multiplicity(&self) -> u32 {
        self.multiplicity
    }

    pub fn nuclear_charge(&self) -> u32 {
        self.nuclear_charge
    }

    pub fn electron_count(&self) -> u32 {
        self.electron_count
    }

    pub fn alpha_electrons(&self) -> u32 {
        (self.electron_count + self.unpaired_electrons()) / 2
    }

    pub fn beta_electrons(&self) -> u32 {
        (self.electron_count - self.unpaired_electrons()) / 2
    }

    fn unpaired_electrons(&self) -> u32 {
        self.multiplicity - 1
    }

    /// Classical repulsion between real nuclei, in Hartree.
    pub fn nuclear_repulsion_energy(&self) -> f64 {
        let real: Vec<&Site> = self.sites.iter().filter(|s| s.is_real()).collect();
        let mut energy = 0.0;
        for (i, a) in real.iter().enumerate() {
            for b in &real[i + 1..] {
                let distance = nalgebra::distance(&a.position, &b.position);
                energy += f64::from(a.nuclear_charge()) * f64::from(b.nuclear_charge()) / distance;
            }
        }
        energy
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.sites.iter().map(|s| s.element.symbol()).collect()
    }

    pub fn real_flags(&self) -> Vec<bool> {
        self.sites.iter().map(Site::is_real).collect()
    }

    /// Flattened Cartesian coordinates (3N values, Bohr).
    pub fn geometry(&self) -> Vec<f64> {
        self.sites
            .iter()
            .flat_map(|s| [s.position.x, s.position.y, s.position.z])
            .collect()
    }
}

fn check_coincident_nuclei(sites: &[Site]) -> Result<(), MoleculeError> {
    for (i, a) in sites.iter().enumerate().filter(|(_, s)| s.is_real()) {
        for (j, b) in sites.iter().enumerate().skip(i + 1).filter(|(_, s)| s.is_real()) {
            if nalgebra::distance(&a.position, &b.position) < COINCIDENCE_THRESHOLD_BOHR {
                return Err(MoleculeError::CoincidentAtoms {
                    first: i,
                    second: j,
                });
            }
        }
    }
    Ok(())
}

fn validate_multiplicity(multiplicity: u32, electrons: u32) -> Result<(), MoleculeError> {
    let invalid = MoleculeError::InvalidMultiplicity {
        multiplicity,
        electrons,
    };
    if multiplicity == 0 {
        return Err(invalid);
    }
    let unpaired = multiplicity - 1;
    if unpaired > electrons || (electrons - unpaired) % 2 != 0 {
        return Err(invalid);
    }
    Ok(())
}

#[derive(Serialize)]
struct MoleculeRecord<'a> {
    symbols: Vec<&'a str>,
    atomic_numbers: Vec<u32>,
    geometry: Vec<f64>,
    real: Vec<bool>,
    molecular_charge: i32,
    molecular_multiplicity: u32,
}

/// Serialized in the same flat layout as the request (`symbols`, `geometry`, `real`),
/// plus the derived atomic numbers, charge and multiplicity.
impl Serialize for Molecule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MoleculeRecord {
            symbols: self.symbols(),
            atomic_numbers: self
                .sites
                .iter()
                .map(|s| s.element.atomic_number())
                .collect(),
            geometry: self.geometry(),
            real: self.real_flags(),
            molecular_charge: self.molecular_charge,
            molecular_multiplicity: self.multiplicity,
        }
        .serialize(serializer)
    }
}

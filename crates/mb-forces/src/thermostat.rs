//! Nosé–Hoover chain thermostat.
//!
//! A chain of `m` auxiliary variables drives the system's kinetic energy
//! toward the bath value `dof · Kb · T / 2`. The element owns `2m`
//! continuous scalars in the state's z vector: the chain variables
//! `z[0..m]` followed by their time integrals `s[0..m]`, which only enter
//! the bath energy.
//!
//! ```text
//! zdot[0]   = (E/Eb - 1) / τ²          E = KE/dof, Eb = Kb·T/2
//! zdot[k-1] -= z[k-1]·z[k]             k = 1..m
//! zdot[k]   = n_k·z[k-1]² - 1/τ²       n_1 = dof, n_k = 1 otherwise
//! sdot[k]   = z[k]
//! f         = -z[0] · M·u
//! ```
//!
//! The effective dof count is `nu` minus the number of acceleration-level
//! constraints, clamped at 1. Redundant constraints are not detected, so
//! the count can be too low for redundantly constrained systems.

use crate::accum::ForceAccumulators;
use crate::common::{bind_slots, bound_slots};
use crate::error::{ForceError, ForceResult};
use crate::traits::ForceElement;
use mb_core::{DiscreteVarId, Real, ensure_count, ensure_positive};
use mb_matter::Matter;
use mb_state::{CacheTier, Stage, State, ZIndex};
use nalgebra::DVector;
use std::sync::OnceLock;

/// Topology-level settings copied into each state when it is realized.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThermostatDefaults {
    pub num_chains: usize,
    pub bath_temperature: Real,
    pub relaxation_time: Real,
}

impl ThermostatDefaults {
    /// Three chain links at the given bath temperature and relaxation time.
    pub fn new(bath_temperature: Real, relaxation_time: Real) -> ForceResult<Self> {
        let defaults = Self {
            num_chains: 3,
            bath_temperature,
            relaxation_time,
        };
        defaults.validate()?;
        Ok(defaults)
    }

    pub fn validate(&self) -> ForceResult<()> {
        ensure_count(self.num_chains, "number of chains")?;
        ensure_positive(self.bath_temperature, "bath temperature")?;
        ensure_positive(self.relaxation_time, "relaxation time")?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Slots {
    num_chains: DiscreteVarId,
    bath_temperature: DiscreteVarId,
    relaxation_time: DiscreteVarId,
    z0: CacheTier<ZIndex>,
    momentum: CacheTier<DVector<Real>>,
    kinetic_energy: CacheTier<Real>,
}

#[derive(Debug)]
pub struct Thermostat {
    kb: Real,
    defaults: ThermostatDefaults,
    slots: OnceLock<Slots>,
}

impl Thermostat {
    pub fn new(boltzmanns_constant: Real, bath_temperature: Real, relaxation_time: Real) -> ForceResult<Self> {
        Self::with_defaults(
            boltzmanns_constant,
            ThermostatDefaults::new(bath_temperature, relaxation_time)?,
        )
    }

    pub fn with_defaults(boltzmanns_constant: Real, defaults: ThermostatDefaults) -> ForceResult<Self> {
        ensure_positive(boltzmanns_constant, "Boltzmann's constant")?;
        defaults.validate()?;
        Ok(Self {
            kb: boltzmanns_constant,
            defaults,
            slots: OnceLock::new(),
        })
    }

    pub fn boltzmanns_constant(&self) -> Real {
        self.kb
    }

    pub fn defaults(&self) -> &ThermostatDefaults {
        &self.defaults
    }

    pub fn default_num_chains(&self) -> usize {
        self.defaults.num_chains
    }

    pub fn default_bath_temperature(&self) -> Real {
        self.defaults.bath_temperature
    }

    pub fn default_relaxation_time(&self) -> Real {
        self.defaults.relaxation_time
    }

    // Changing a default only affects states realized from Topology
    // afterwards.

    pub fn set_default_num_chains(&mut self, num_chains: usize) -> ForceResult<()> {
        self.defaults.num_chains = ensure_count(num_chains, "number of chains")?;
        self.slots = OnceLock::new();
        Ok(())
    }

    pub fn set_default_bath_temperature(&mut self, temperature: Real) -> ForceResult<()> {
        self.defaults.bath_temperature = ensure_positive(temperature, "bath temperature")?;
        self.slots = OnceLock::new();
        Ok(())
    }

    pub fn set_default_relaxation_time(&mut self, time: Real) -> ForceResult<()> {
        self.defaults.relaxation_time = ensure_positive(time, "relaxation time")?;
        self.slots = OnceLock::new();
        Ok(())
    }

    // ------------------------------------------------------ per-state values

    /// Change the chain length of one state. The state drops back to
    /// Topology and its chain variables are reallocated on the next
    /// realization.
    pub fn set_num_chains(&self, state: &mut State, num_chains: usize) -> ForceResult<()> {
        let slots = self.slots(state)?;
        state.set_discrete(slots.num_chains, ensure_count(num_chains, "number of chains")?)?;
        Ok(())
    }

    pub fn set_bath_temperature(&self, state: &mut State, temperature: Real) -> ForceResult<()> {
        let slots = self.slots(state)?;
        state.set_discrete(slots.bath_temperature, ensure_positive(temperature, "bath temperature")?)?;
        Ok(())
    }

    pub fn set_relaxation_time(&self, state: &mut State, time: Real) -> ForceResult<()> {
        let slots = self.slots(state)?;
        state.set_discrete(slots.relaxation_time, ensure_positive(time, "relaxation time")?)?;
        Ok(())
    }

    pub fn num_chains(&self, state: &State) -> ForceResult<usize> {
        let slots = self.slots(state)?;
        Ok(*state.discrete::<usize>(slots.num_chains)?)
    }

    pub fn bath_temperature(&self, state: &State) -> ForceResult<Real> {
        let slots = self.slots(state)?;
        Ok(*state.discrete::<Real>(slots.bath_temperature)?)
    }

    pub fn relaxation_time(&self, state: &State) -> ForceResult<Real> {
        let slots = self.slots(state)?;
        Ok(*state.discrete::<Real>(slots.relaxation_time)?)
    }

    // ----------------------------------------------------------- chain state

    /// Zero every chain variable and integral.
    pub fn initialize_chain_state(&self, state: &mut State) -> ForceResult<()> {
        let (start, len) = self.chain_block(state)?;
        state.z_mut().rows_mut(start, len).fill(0.0);
        Ok(())
    }

    /// Overwrite the chain block; `z` holds the `m` chain variables followed
    /// by their `m` integrals.
    pub fn set_chain_state(&self, state: &mut State, z: &[Real]) -> ForceResult<()> {
        let (start, len) = self.chain_block(state)?;
        if z.len() != len {
            return Err(ForceError::LengthMismatch {
                what: "thermostat chain state",
                expected: len,
                actual: z.len(),
            });
        }
        state.z_mut().rows_mut(start, len).copy_from_slice(z);
        Ok(())
    }

    pub fn chain_state(&self, state: &State) -> ForceResult<DVector<Real>> {
        let (start, len) = self.chain_block(state)?;
        Ok(state.z().rows(start, len).clone_owned())
    }

    // ----------------------------------------------------------- diagnostics

    /// Degrees of freedom the bath exchanges energy with.
    pub fn num_degrees_of_freedom(&self, state: &State, matter: &dyn Matter) -> usize {
        state
            .nu()
            .saturating_sub(matter.num_acceleration_constraints())
            .max(1)
    }

    /// Instantaneous temperature implied by the kinetic energy.
    pub fn current_temperature(&self, state: &State, matter: &dyn Matter) -> ForceResult<Real> {
        let ke = *self.slots(state)?.kinetic_energy.get(state)?;
        let dof = self.num_degrees_of_freedom(state, matter) as Real;
        Ok(2.0 * ke / (dof * self.kb))
    }

    /// Energy held by the bath. Together with the system's kinetic and
    /// potential energy this is conserved by the thermostatted motion.
    ///
    /// ```text
    /// KEb = ½ kT τ² (dof·z0² + Σ_{i≥1} zi²)
    /// PEb = kT (dof·s0 + Σ_{i≥1} si)
    /// ```
    pub fn calc_bath_energy(&self, state: &State, matter: &dyn Matter) -> ForceResult<Real> {
        let z = self.chain_state(state)?;
        let m = z.len() / 2;
        let dof = self.num_degrees_of_freedom(state, matter) as Real;
        let kt = self.kb * self.bath_temperature(state)?;
        let t = self.relaxation_time(state)?;

        let chain = z.rows(0, m);
        let integrals = z.rows(m, m);
        let zsq = dof * chain[0] * chain[0] + chain.rows(1, m - 1).norm_squared();
        let ssum = dof * integrals[0] + integrals.rows(1, m - 1).sum();
        Ok(0.5 * kt * t * t * zsq + kt * ssum)
    }

    fn slots(&self, state: &State) -> ForceResult<Slots> {
        bound_slots(&self.slots, state, "thermostat topology")
    }

    /// Start and length of the chain block; valid once Model is realized.
    fn chain_block(&self, state: &State) -> ForceResult<(usize, usize)> {
        let slots = self.slots(state)?;
        let ZIndex(start) = *slots.z0.get(state)?;
        let m = *state.discrete::<usize>(slots.num_chains)?;
        Ok((start, 2 * m))
    }
}

impl ForceElement for Thermostat {
    fn name(&self) -> &str {
        "Nosé–Hoover thermostat"
    }

    fn realize_topology(&self, state: &mut State, _matter: &dyn Matter) -> ForceResult<()> {
        let slots = Slots {
            num_chains: state.allocate_discrete("thermostat chains", Stage::Model, self.defaults.num_chains),
            bath_temperature: state.allocate_discrete(
                "bath temperature",
                Stage::Instance,
                self.defaults.bath_temperature,
            ),
            relaxation_time: state.allocate_discrete(
                "relaxation time",
                Stage::Instance,
                self.defaults.relaxation_time,
            ),
            z0: CacheTier::allocate(state, "thermostat z index", Stage::Model),
            momentum: CacheTier::allocate(state, "thermostat momentum", Stage::Velocity),
            kinetic_energy: CacheTier::allocate(state, "thermostat kinetic energy", Stage::Velocity),
        };
        bind_slots(&self.slots, slots, "thermostat resources allocated differently in another state")
    }

    fn realize_model(&self, state: &mut State, matter: &dyn Matter) -> ForceResult<()> {
        let slots = self.slots(state)?;
        let m = *state.discrete::<usize>(slots.num_chains)?;
        let z0 = state.allocate_z(&vec![0.0; 2 * m]);
        slots.z0.update(state, z0)?;

        if state.nu() <= matter.num_acceleration_constraints() {
            tracing::warn!(
                nu = state.nu(),
                constraints = matter.num_acceleration_constraints(),
                "thermostat has no free degrees of freedom; using 1"
            );
        }
        Ok(())
    }

    fn realize_velocity(&self, state: &mut State, matter: &dyn Matter) -> ForceResult<()> {
        let slots = self.slots(state)?;
        let mu = matter.calc_mv(state, state.u())?;
        let ke = 0.5 * state.u().dot(&mu);
        slots.momentum.update(state, mu)?;
        slots.kinetic_energy.update(state, ke)?;
        Ok(())
    }

    fn realize_dynamics(&self, state: &mut State, matter: &dyn Matter) -> ForceResult<()> {
        let slots = self.slots(state)?;
        let (start, len) = self.chain_block(state)?;
        let m = len / 2;
        let tau = self.relaxation_time(state)?;
        let oot2 = 1.0 / (tau * tau);
        let dof = self.num_degrees_of_freedom(state, matter);

        let eb = self.kb * self.bath_temperature(state)? / 2.0;
        let e = *slots.kinetic_energy.get(state)? / dof as Real;

        let z = state.z().rows(start, len).clone_owned();
        let mut zdot = DVector::zeros(len);
        zdot[0] = (e / eb - 1.0) * oot2;
        for k in 1..m {
            let n_k = if k == 1 { dof } else { 1 };
            zdot[k - 1] -= z[k - 1] * z[k];
            zdot[k] = n_k as Real * z[k - 1] * z[k - 1] - oot2;
        }
        for k in 0..m {
            zdot[m + k] = z[k];
        }

        state.zdot_mut().rows_mut(start, len).copy_from(&zdot);
        Ok(())
    }

    fn calc_force(&self, state: &State, _matter: &dyn Matter, forces: &mut ForceAccumulators) -> ForceResult<()> {
        let slots = self.slots(state)?;
        let mu = slots.momentum.get(state)?;
        let (start, _) = self.chain_block(state)?;
        forces.add_mobility_forces(&(mu * -state.z()[start]))
    }
}

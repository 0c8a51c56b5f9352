//! The per-replica parameter state tracked by the coordinator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One independently exchanged thermodynamic parameter.
///
/// For one-dimensional runs only [`Axis::Temperature`] is declared; the
/// two-dimensional variant alternates between both axes in this fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Axis {
    /// Simulation temperature (Kelvin).
    Temperature,
    /// Secondary parameter (salt concentration, restraint value, ...).
    Secondary,
}

impl Axis {
    /// Stable textual name used in logs and persisted tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Temperature => "temperature",
            Axis::Secondary => "secondary",
        }
    }

    /// The other axis of the 2D grid. Grouping for an exchange on one axis
    /// partitions replicas by their current value on this one.
    pub fn other(&self) -> Axis {
        match self {
            Axis::Temperature => Axis::Secondary,
            Axis::Secondary => Axis::Temperature,
        }
    }
}

/// Stable replica identity, 0-indexed, assigned at ensemble creation and
/// never reused or exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReplicaId(usize);

impl ReplicaId {
    /// Creates an identifier from its raw index.
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Returns the raw index; rows and columns of the swap matrix and the
    /// history tables are addressed by this value.
    pub fn as_raw(&self) -> usize {
        self.0
    }
}

/// Value held by a replica on one axis, together with the axis-specific
/// auxiliary file reference that travels with it during a swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSlot {
    /// Current numeric parameter value.
    pub value: f64,
    /// Auxiliary file tied to the value (e.g. a restraint file).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aux_file: Option<String>,
}

impl AxisSlot {
    /// Creates a slot holding a bare value.
    pub fn new(value: f64) -> Self {
        Self {
            value,
            aux_file: None,
        }
    }
}

/// Per-replica parameter state and provenance.
///
/// Identity (`id`) never moves between replicas; the axis slots and the
/// provenance paths are the only state an exchange transfers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replica {
    id: ReplicaId,
    /// Completed MD segments for this replica.
    pub cycle: usize,
    parameters: BTreeMap<Axis, AxisSlot>,
    /// Set when this replica participated in a swap this cycle.
    pub swapped_this_cycle: bool,
    /// Where the most recent MD output for this replica's configuration
    /// resides. After a swap the continuation coordinates may live in a
    /// directory produced by a different replica's job.
    pub provenance_path: Option<String>,
    /// Provenance of the very first cycle, fixed once set; used to resolve
    /// relative continuation paths.
    pub first_path: Option<String>,
}

impl Replica {
    /// Creates a replica with the given temperature and no secondary axis.
    pub fn new(id: ReplicaId, temperature: f64) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert(Axis::Temperature, AxisSlot::new(temperature));
        Self {
            id,
            cycle: 0,
            parameters,
            swapped_this_cycle: false,
            provenance_path: None,
            first_path: None,
        }
    }

    /// Adds a secondary-axis value, enabling 2D exchange for this replica.
    pub fn with_secondary(mut self, value: f64) -> Self {
        self.parameters.insert(Axis::Secondary, AxisSlot::new(value));
        self
    }

    /// Stable identity of the replica.
    pub fn id(&self) -> ReplicaId {
        self.id
    }

    /// Current value on the given axis, if the axis is declared.
    pub fn parameter(&self, axis: Axis) -> Option<f64> {
        self.parameters.get(&axis).map(|slot| slot.value)
    }

    /// Immutable access to the full slot for an axis.
    pub fn slot(&self, axis: Axis) -> Option<&AxisSlot> {
        self.parameters.get(&axis)
    }

    /// Mutable access to the full slot for an axis.
    pub fn slot_mut(&mut self, axis: Axis) -> Option<&mut AxisSlot> {
        self.parameters.get_mut(&axis)
    }

    /// Replaces the slot for an axis, returning the previous one.
    pub fn replace_slot(&mut self, axis: Axis, slot: AxisSlot) -> Option<AxisSlot> {
        self.parameters.insert(axis, slot)
    }

    /// Attaches an auxiliary file reference to an axis.
    pub fn set_aux_file(&mut self, axis: Axis, path: impl Into<String>) {
        if let Some(slot) = self.parameters.get_mut(&axis) {
            slot.aux_file = Some(path.into());
        }
    }

    /// Whether this replica carries a value on the given axis.
    pub fn has_axis(&self, axis: Axis) -> bool {
        self.parameters.contains_key(&axis)
    }

    /// Resets the per-cycle swap flag. Called at the start of every cycle.
    pub fn begin_cycle(&mut self) {
        self.swapped_this_cycle = false;
    }

    /// Records the provenance reported by the latest energy column and, on
    /// the first cycle, freezes it as the replica's first path.
    pub fn note_provenance(&mut self, path: &str) {
        if self.first_path.is_none() {
            self.first_path = Some(path.to_string());
        }
        self.provenance_path = Some(path.to_string());
    }
}

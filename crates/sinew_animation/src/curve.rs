//! Animation curves: named scalar channels evaluated alongside bone poses.
//!
//! Curves are identified at runtime by a [`CurveUid`] handed out by the
//! skeleton's [`CurveNameTable`]. A [`CurveBuffer`] stores one value and one
//! flag set per UID of a shared UID list; every buffer taking part in one
//! blend must have been created from the same list.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use lasso::{Key, Rodeo, RodeoReader, Spur};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Semantic of a curve value, consumed by [`CurveOutputs`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CurveFlags: u8 {
        const MORPH_TARGET = 1 << 0;
        const MATERIAL     = 1 << 1;
        const EVENT        = 1 << 2;
        const BONE_TRACK   = 1 << 3;
    }
}

/// Stable runtime identifier of a curve name within one skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurveUid(pub u32);

impl CurveUid {
    fn from_spur(spur: Spur) -> Self {
        Self(spur.into_usize() as u32)
    }

    fn to_spur(self) -> Option<Spur> {
        Spur::try_from_usize(self.0 as usize)
    }
}

/// Declarative curve entry of a skeleton description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveDesc {
    pub name: String,
    #[serde(default)]
    pub flags: CurveFlags,
}

impl CurveDesc {
    #[must_use]
    pub fn new(name: &str, flags: CurveFlags) -> Self {
        Self {
            name: name.to_string(),
            flags,
        }
    }
}

// ============================================================================
// Name table
// ============================================================================

/// Frozen name ↔ UID table owned by a skeleton.
///
/// Names are interned once at skeleton construction; lookups afterwards are
/// contention-free, so the table can be shared across evaluation threads.
pub struct CurveNameTable {
    names: RodeoReader,
    flags: Vec<CurveFlags>,
    uids: Arc<[CurveUid]>,
}

impl CurveNameTable {
    /// Builds the table. Repeated names share one UID and merge their flags.
    #[must_use]
    pub fn new(curves: &[CurveDesc]) -> Self {
        let mut rodeo: Rodeo<Spur> = Rodeo::new();
        let mut flags: Vec<CurveFlags> = Vec::with_capacity(curves.len());

        for curve in curves {
            let index = rodeo.get_or_intern(curve.name.as_str()).into_usize();
            if index == flags.len() {
                flags.push(curve.flags);
            } else {
                flags[index] |= curve.flags;
            }
        }

        let uids: Arc<[CurveUid]> = (0..flags.len() as u32).map(CurveUid).collect();

        Self {
            names: rodeo.into_reader(),
            flags,
            uids,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(&[])
    }

    #[must_use]
    pub fn uid(&self, name: &str) -> Option<CurveUid> {
        self.names.get(name).map(CurveUid::from_spur)
    }

    #[must_use]
    pub fn name(&self, uid: CurveUid) -> Option<&str> {
        uid.to_spur().and_then(|spur| self.names.try_resolve(&spur))
    }

    #[must_use]
    pub fn flags(&self, uid: CurveUid) -> CurveFlags {
        self.flags.get(uid.0 as usize).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// The shared UID list covering every curve of the table.
    #[must_use]
    pub fn uids(&self) -> Arc<[CurveUid]> {
        Arc::clone(&self.uids)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CurveUid, &str, CurveFlags)> + '_ {
        self.uids
            .iter()
            .filter_map(move |&uid| self.name(uid).map(|name| (uid, name, self.flags(uid))))
    }
}

impl fmt::Debug for CurveNameTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(uid, name, _)| (uid.0, name)))
            .finish()
    }
}

// ============================================================================
// Curve buffer
// ============================================================================

/// Dense curve values in lock-step with a shared UID list.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveBuffer {
    uids: Arc<[CurveUid]>,
    values: Vec<f32>,
    flags: Vec<CurveFlags>,
}

impl CurveBuffer {
    /// Zeroed values, no flags.
    #[must_use]
    pub fn new(uids: Arc<[CurveUid]>) -> Self {
        let len = uids.len();
        Self {
            uids,
            values: vec![0.0; len],
            flags: vec![CurveFlags::empty(); len],
        }
    }

    /// Zeroed values over every curve of `table`, flags taken from the table.
    #[must_use]
    pub fn for_table(table: &CurveNameTable) -> Self {
        let mut buffer = Self::new(table.uids());
        for (flags, &uid) in buffer.flags.iter_mut().zip(buffer.uids.iter()) {
            *flags = table.flags(uid);
        }
        buffer
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(Arc::from(Vec::new()))
    }

    #[inline]
    #[must_use]
    pub fn uids(&self) -> &Arc<[CurveUid]> {
        &self.uids
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `true` when both buffers were initialized from the same UID list.
    #[must_use]
    pub fn shares_uids(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.uids, &other.uids) || self.uids == other.uids
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    #[inline]
    #[must_use]
    pub fn flags(&self) -> &[CurveFlags] {
        &self.flags
    }

    #[inline]
    pub fn flags_mut(&mut self) -> &mut [CurveFlags] {
        &mut self.flags
    }

    #[must_use]
    pub fn index_of(&self, uid: CurveUid) -> Option<usize> {
        self.uids.iter().position(|&u| u == uid)
    }

    #[must_use]
    pub fn get(&self, uid: CurveUid) -> Option<f32> {
        self.index_of(uid).map(|i| self.values[i])
    }

    /// Looks a curve up by name through the skeleton's table.
    #[must_use]
    pub fn get_by_name(&self, table: &CurveNameTable, name: &str) -> Option<f32> {
        table.uid(name).and_then(|uid| self.get(uid))
    }

    /// Writes a value; returns `false` when the UID is not part of this buffer.
    pub fn set(&mut self, uid: CurveUid, value: f32, flags: CurveFlags) -> bool {
        match self.index_of(uid) {
            Some(i) => {
                self.values[i] = value;
                self.flags[i] |= flags;
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.values.fill(0.0);
        self.flags.fill(CurveFlags::empty());
    }

    pub fn copy_from(&mut self, other: &Self) {
        debug_assert!(self.shares_uids(other), "curve UID lists differ");
        self.values.copy_from_slice(&other.values);
        self.flags.copy_from_slice(&other.flags);
    }

    /// `self = other * weight`
    pub fn set_scaled(&mut self, other: &Self, weight: f32) {
        debug_assert!(self.shares_uids(other), "curve UID lists differ");
        for (dst, src) in self.values.iter_mut().zip(&other.values) {
            *dst = src * weight;
        }
        self.flags.copy_from_slice(&other.flags);
    }

    /// `self += other * weight`, flags OR-combined.
    pub fn accumulate(&mut self, other: &Self, weight: f32) {
        debug_assert!(self.shares_uids(other), "curve UID lists differ");
        for (dst, src) in self.values.iter_mut().zip(&other.values) {
            *dst += src * weight;
        }
        for (dst, src) in self.flags.iter_mut().zip(&other.flags) {
            *dst |= *src;
        }
    }
}

// ============================================================================
// Output routing
// ============================================================================

/// Final curve values split by semantic, keyed by curve name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurveOutputs {
    pub morph_targets: FxHashMap<String, f32>,
    pub material_parameters: FxHashMap<String, f32>,
    pub events: FxHashMap<String, f32>,
}

impl CurveOutputs {
    #[must_use]
    pub fn from_buffer(buffer: &CurveBuffer, table: &CurveNameTable) -> Self {
        let mut outputs = Self::default();
        outputs.route(buffer, table);
        outputs
    }

    /// Clears the maps and routes every curve of `buffer` into them.
    ///
    /// A curve flagged with several semantics lands in every matching map;
    /// values routed to the same name are summed.
    pub fn route(&mut self, buffer: &CurveBuffer, table: &CurveNameTable) {
        self.morph_targets.clear();
        self.material_parameters.clear();
        self.events.clear();

        for (i, &uid) in buffer.uids().iter().enumerate() {
            let Some(name) = table.name(uid) else {
                log::debug!("Curve uid {} has no name, not routed", uid.0);
                continue;
            };
            let value = buffer.values[i];
            let flags = buffer.flags[i] | table.flags(uid);

            if flags.contains(CurveFlags::MORPH_TARGET) {
                *self.morph_targets.entry(name.to_string()).or_insert(0.0) += value;
            }
            if flags.contains(CurveFlags::MATERIAL) {
                *self
                    .material_parameters
                    .entry(name.to_string())
                    .or_insert(0.0) += value;
            }
            if flags.contains(CurveFlags::EVENT) {
                *self.events.entry(name.to_string()).or_insert(0.0) += value;
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.morph_targets.is_empty() && self.material_parameters.is_empty() && self.events.is_empty()
    }
}

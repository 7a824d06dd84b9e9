//! The two persistent image slots that alternate between "incoming" and
//! "outgoing" on every cycle.

use std::ffi::{OsStr, OsString};
use std::fmt;

use crate::processing::layout::ImageGeometry;

/// Fixed identity of one of the two texture slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    First,
    Second,
}

impl SlotId {
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    /// The slot that is not `self`.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Metadata for whatever image currently lives in a slot's texture.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSlot {
    id: SlotId,
    name: Option<OsString>,
    geometry: Option<ImageGeometry>,
}

impl ImageSlot {
    const fn empty(id: SlotId) -> Self {
        Self {
            id,
            name: None,
            geometry: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> SlotId {
        self.id
    }

    /// Source filename, absent while the slot has never been filled.
    #[must_use]
    pub fn name(&self) -> Option<&OsStr> {
        self.name.as_deref()
    }

    #[must_use]
    pub const fn geometry(&self) -> Option<&ImageGeometry> {
        self.geometry.as_ref()
    }

    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.geometry.is_some()
    }
}

/// Arena of exactly two slots. Slots are overwritten in place, never
/// reallocated.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotPair {
    slots: [ImageSlot; 2],
}

impl Default for SlotPair {
    fn default() -> Self {
        Self {
            slots: [ImageSlot::empty(SlotId::First), ImageSlot::empty(SlotId::Second)],
        }
    }
}

impl SlotPair {
    #[must_use]
    pub const fn get(&self, id: SlotId) -> &ImageSlot {
        &self.slots[id.index()]
    }

    /// Record that `id` now holds the image `name` laid out as `geometry`.
    pub fn fill(&mut self, id: SlotId, name: OsString, geometry: ImageGeometry) {
        let slot = &mut self.slots[id.index()];
        slot.name = Some(name);
        slot.geometry = Some(geometry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> ImageGeometry {
        ImageGeometry {
            natural_width: 3.0,
            natural_height: 2.0,
            sample_width_fraction: 0.75,
            sample_height_fraction: 1.0,
            vertex_half_width: 1.0,
            vertex_half_height: 0.5,
        }
    }

    #[test]
    fn other_alternates() {
        assert_eq!(SlotId::First.other(), SlotId::Second);
        assert_eq!(SlotId::Second.other(), SlotId::First);
        assert_eq!(SlotId::First.other().other(), SlotId::First);
    }

    #[test]
    fn fill_keeps_slot_identity() {
        let mut pair = SlotPair::default();
        assert!(!pair.get(SlotId::First).is_populated());
        assert_eq!(pair.get(SlotId::Second).name(), None);

        pair.fill(SlotId::Second, "a.jpg".into(), geometry());
        pair.fill(SlotId::Second, "b.jpg".into(), geometry());

        let slot = pair.get(SlotId::Second);
        assert_eq!(slot.id(), SlotId::Second);
        assert_eq!(slot.name(), Some(OsStr::new("b.jpg")));
        assert!(slot.is_populated());
        assert!(!pair.get(SlotId::First).is_populated());
    }
}

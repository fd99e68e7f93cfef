//! Arena of detections and the canonical items they were merged into.
//!
//! Detections are owned once, by index. A canonical item is a primary
//! detection plus the indices of the detections judged to be the same
//! physical object.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::image::ImageId;
use crate::item::{Detection, DetectionKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub usize);

/// Deduplicated representative of one physical object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalItem {
    pub primary: DetectionId,
    #[serde(default)]
    pub others: Vec<DetectionId>,
}

impl CanonicalItem {
    pub fn new(primary: DetectionId) -> Self {
        Self {
            primary,
            others: Vec::new(),
        }
    }

    /// Primary first, then the others in insertion order.
    pub fn members(&self) -> impl Iterator<Item = DetectionId> + '_ {
        std::iter::once(self.primary).chain(self.others.iter().copied())
    }

    pub fn len(&self) -> usize {
        1 + self.others.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ItemRegistry {
    detections: Vec<Detection>,
    items: Vec<CanonicalItem>,
}

impl ItemRegistry {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            items: Vec::new(),
        }
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn detection(&self, id: DetectionId) -> &Detection {
        &self.detections[id.0]
    }

    pub fn detection_ids(&self) -> impl Iterator<Item = DetectionId> {
        (0..self.detections.len()).map(DetectionId)
    }

    pub fn items(&self) -> &[CanonicalItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> &CanonicalItem {
        &self.items[id.0]
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> {
        (0..self.items.len()).map(ItemId)
    }

    /// Replace the canonical item set.
    pub fn set_items(&mut self, items: Vec<CanonicalItem>) {
        self.items = items;
    }

    /// Kind shared by every member of the item.
    pub fn kind(&self, id: ItemId) -> DetectionKind {
        self.detection(self.item(id).primary).kind
    }

    /// Decoded name of the item's primary detection.
    pub fn name(&self, id: ItemId) -> &str {
        &self.detection(self.item(id).primary).name
    }

    /// Mean position over all members.
    pub fn position(&self, id: ItemId) -> Point3<f64> {
        self.mean_position(self.item(id).members())
    }

    /// Mean position of an arbitrary member set.
    pub fn mean_position(&self, members: impl Iterator<Item = DetectionId>) -> Point3<f64> {
        let mut sum = Vector3::zeros();
        let mut n = 0usize;
        for m in members {
            sum += self.detection(m).position.coords;
            n += 1;
        }
        if n == 0 {
            return Point3::origin();
        }
        Point3::from(sum / n as f64)
    }

    /// Images the item was seen in, without repeats.
    pub fn images(&self, id: ItemId) -> Vec<ImageId> {
        let mut out: Vec<ImageId> = self
            .item(id)
            .members()
            .map(|m| self.detection(m).image)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Canonical items of the given kind.
    pub fn items_of_kind(&self, kind: DetectionKind) -> Vec<ItemId> {
        self.item_ids().filter(|&id| self.kind(id) == kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::CodeKind;

    fn det(x: f64, image: usize) -> Detection {
        Detection {
            kind: DetectionKind::Code(CodeKind::Group),
            name: "123".into(),
            position: Point3::new(x, 0.0, 1.0),
            bounds: None,
            image: ImageId(image),
        }
    }

    #[test]
    fn position_is_member_mean() {
        let mut reg = ItemRegistry::new(vec![det(1.0, 0), det(3.0, 1), det(5.0, 1)]);
        reg.set_items(vec![CanonicalItem {
            primary: DetectionId(0),
            others: vec![DetectionId(1), DetectionId(2)],
        }]);
        assert_eq!(reg.position(ItemId(0)), Point3::new(3.0, 0.0, 1.0));
        assert_eq!(reg.images(ItemId(0)), vec![ImageId(0), ImageId(1)]);
        assert_eq!(reg.item(ItemId(0)).len(), 3);
        assert_eq!(
            reg.items_of_kind(DetectionKind::Code(CodeKind::Group)),
            vec![ItemId(0)]
        );
        assert!(reg
            .items_of_kind(DetectionKind::Code(CodeKind::Row))
            .is_empty());
    }
}

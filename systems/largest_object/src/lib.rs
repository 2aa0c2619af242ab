#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tracks the largest bubble in play and announces every new record.

use merge_bubbles_core::{Event, ObjectId, ObjectSnapshot, ObjectView};

/// Scale the record starts at, matching a freshly spawned bubble.
pub const INITIAL_RECORD: f32 = 1.0;

/// Largest scale observed so far and the object that holds it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LargestObjectRecord {
    /// Largest scale observed so far.
    pub scale: f32,
    /// Object that set the record, if any object has beaten the initial value.
    pub holder: Option<ObjectId>,
}

/// Pure system that re-scans the active objects after every merge.
#[derive(Debug)]
pub struct LargestObjectTracker {
    record: LargestObjectRecord,
}

impl LargestObjectTracker {
    /// Creates a tracker whose record starts at the provided scale.
    #[must_use]
    pub fn new(initial_scale: f32) -> Self {
        Self {
            record: LargestObjectRecord {
                scale: initial_scale,
                holder: None,
            },
        }
    }

    /// Current record.
    #[must_use]
    pub fn record(&self) -> LargestObjectRecord {
        self.record
    }

    /// Re-scans the view whenever a merge completed.
    pub fn handle(&mut self, events: &[Event], objects: &ObjectView, out: &mut Vec<Event>) {
        let merged = events
            .iter()
            .any(|event| matches!(event, Event::MergeCompleted { .. }));
        if merged {
            let _ = self.try_record_new_largest(objects, out);
        }
    }

    /// Records the largest object if it strictly beats the current record.
    ///
    /// Emits [`Event::NewLargestObject`] and returns `true` when the record grew.
    pub fn try_record_new_largest(&mut self, objects: &ObjectView, out: &mut Vec<Event>) -> bool {
        let Some(largest) = scan_largest(objects) else {
            return false;
        };
        if largest.scale <= self.record.scale {
            return false;
        }

        log::info!(
            "object {} set a new size record of {:.3}",
            largest.id.get(),
            largest.scale
        );
        self.record = LargestObjectRecord {
            scale: largest.scale,
            holder: Some(largest.id),
        };
        out.push(Event::NewLargestObject {
            object: largest.id,
            scale: largest.scale,
        });
        true
    }
}

impl Default for LargestObjectTracker {
    fn default() -> Self {
        Self::new(INITIAL_RECORD)
    }
}

/// Finds the object with the greatest scale; the earliest wins ties.
#[must_use]
pub fn scan_largest(objects: &ObjectView) -> Option<&ObjectSnapshot> {
    let mut largest: Option<&ObjectSnapshot> = None;
    let mut best = 0.0;
    for snapshot in objects.iter() {
        if snapshot.scale > best {
            best = snapshot.scale;
            largest = Some(snapshot);
        }
    }
    largest
}

#[cfg(test)]
mod tests {
    use super::*;
    use merge_bubbles_core::{Aabb, BodyKind, Vec2};

    fn view(scales: &[f32]) -> ObjectView {
        ObjectView::from_snapshots(
            scales
                .iter()
                .enumerate()
                .map(|(index, scale)| ObjectSnapshot {
                    id: ObjectId::new(index as u32),
                    position: Vec2::ZERO,
                    velocity: Vec2::ZERO,
                    scale: *scale,
                    bounds: Aabb::from_center(Vec2::ZERO, Vec2::splat(scale / 2.0)),
                    merging: false,
                    merge_count: 1,
                    polarity: None,
                    kind: BodyKind::Rigid,
                })
                .collect(),
        )
    }

    #[test]
    fn scan_prefers_first_of_equal_scales() {
        let objects = view(&[1.0, 3.0, 3.0]);
        let largest = scan_largest(&objects).expect("largest");
        assert_eq!(largest.id, ObjectId::new(1));
    }

    #[test]
    fn scan_of_empty_view_finds_nothing() {
        assert!(scan_largest(&view(&[])).is_none());
        assert!(scan_largest(&view(&[0.0])).is_none());
    }

    #[test]
    fn record_sequence_notifies_only_on_growth() {
        let mut tracker = LargestObjectTracker::default();
        let mut out = Vec::new();
        let mut notifications = 0;
        for scale in [1.0, 3.0, 2.0, 5.0, 4.0] {
            if tracker.try_record_new_largest(&view(&[scale]), &mut out) {
                notifications += 1;
            }
        }
        assert_eq!(notifications, 2);
        assert_eq!(out.len(), 2);
        assert_eq!(tracker.record().scale, 5.0);
    }
}

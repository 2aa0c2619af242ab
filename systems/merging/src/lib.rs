#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Merge engine that folds touching bubbles into a single larger bubble.
//!
//! A contact between two bubbles gathers every nearby idle bubble into a
//! group, picks the member with the largest area as the survivor, and computes
//! the survivor's final scale so the group's total area is conserved. The
//! group then animates over several frames: the survivor grows while every
//! other member shrinks toward it. When the animation finishes the world is
//! asked to hide the absorbed members and snap the survivor to its final size.
//!
//! A bubble that leaves play is dropped from every group still animating. A
//! group that loses its survivor hands the role to its largest remaining
//! member, and a group left with a single member releases it back to idle.

use std::{f32::consts::PI, fmt, time::Duration};

use anyhow::Result as AnyResult;
use glam::Vec2;
use merge_bubbles_core::{
    circle_area, Command, Event, ObjectId, ObjectSnapshot, ObjectView, PlayMode,
};

/// Rule deciding whether a contact may start a merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeAcceptance {
    /// Neither bubble may already be merging.
    Strict,
    /// At least one bubble must be idle; a merging bubble may join a second group.
    Relaxed,
}

/// Where the engine looks for additional group members.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeTrigger {
    /// Around every contact point reported for the touching pair.
    Collision,
    /// Around the other bubble's position.
    Overlap,
}

/// Where the merged bubble ends up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Consolidation {
    /// The survivor stays put and absorbed members move onto it.
    IntoSurvivor,
    /// Every member, survivor included, moves to the group's centroid.
    Centroid,
}

/// Configuration parameters required to construct the merge engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    merge_speed: f32,
    merge_multiplier: f32,
    detection_range: f32,
    scale_detection_with_size: bool,
    acceptance: MergeAcceptance,
    trigger: MergeTrigger,
    consolidation: Consolidation,
    stagger: bool,
}

impl Config {
    /// Creates a configuration with the provided animation speed and size multiplier.
    #[must_use]
    pub const fn new(merge_speed: f32, merge_multiplier: f32) -> Self {
        Self {
            merge_speed,
            merge_multiplier,
            detection_range: 1.0,
            scale_detection_with_size: false,
            acceptance: MergeAcceptance::Relaxed,
            trigger: MergeTrigger::Collision,
            consolidation: Consolidation::IntoSurvivor,
            stagger: true,
        }
    }

    /// Replaces the radius scanned for extra members.
    #[must_use]
    pub const fn with_detection_range(mut self, detection_range: f32, scale_with_size: bool) -> Self {
        self.detection_range = detection_range;
        self.scale_detection_with_size = scale_with_size;
        self
    }

    /// Replaces the acceptance rule.
    #[must_use]
    pub const fn with_acceptance(mut self, acceptance: MergeAcceptance) -> Self {
        self.acceptance = acceptance;
        self
    }

    /// Replaces where extra members are searched for.
    #[must_use]
    pub const fn with_trigger(mut self, trigger: MergeTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Replaces where the merged bubble ends up.
    #[must_use]
    pub const fn with_consolidation(mut self, consolidation: Consolidation) -> Self {
        self.consolidation = consolidation;
        self
    }

    /// Enables or disables size-proportional movement of absorbed members.
    #[must_use]
    pub const fn with_stagger(mut self, stagger: bool) -> Self {
        self.stagger = stagger;
        self
    }

    /// Acceptance rule in effect.
    #[must_use]
    pub const fn acceptance(&self) -> MergeAcceptance {
        self.acceptance
    }

    /// Multiplier turning the merged radius into a scale.
    #[must_use]
    pub const fn merge_multiplier(&self) -> f32 {
        self.merge_multiplier
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(5.0, 2.0)
    }
}

/// Optional veto consulted after the acceptance rule; an error rejects the merge.
pub type AcceptancePredicate = Box<dyn Fn(&ObjectSnapshot, &ObjectSnapshot) -> AnyResult<bool>>;

/// Outcome of consolidating a group of bubbles.
#[derive(Clone, Debug, PartialEq)]
pub struct MergePlan {
    /// Member with the largest area; the first one wins ties.
    pub survivor: ObjectId,
    /// Summed area of every member.
    pub total_area: f32,
    /// Scale the survivor ends the merge with.
    pub target_scale: f32,
    /// Position the survivor moves to, when the group consolidates on a new point.
    pub goal: Option<Vec2>,
}

/// Computes the survivor and final scale for a group of bubbles.
///
/// Returns `None` for an empty group.
#[must_use]
pub fn consolidate(
    members: &[&ObjectSnapshot],
    merge_multiplier: f32,
    consolidation: Consolidation,
) -> Option<MergePlan> {
    let mut survivor: Option<&ObjectSnapshot> = None;
    let mut total_area = 0.0;
    let mut position_sum = Vec2::ZERO;
    for member in members {
        let area = member.area();
        total_area += area;
        position_sum += member.position;
        if survivor.map_or(true, |best| area > best.area()) {
            survivor = Some(*member);
        }
    }

    let survivor = survivor?;
    let radius = (total_area / PI).sqrt();
    let goal = match consolidation {
        Consolidation::IntoSurvivor => None,
        Consolidation::Centroid => Some(position_sum / members.len() as f32),
    };

    Some(MergePlan {
        survivor: survivor.id,
        total_area,
        target_scale: radius * merge_multiplier,
        goal,
    })
}

#[derive(Clone, Debug, PartialEq)]
struct Absorbed {
    id: ObjectId,
    initial_scale: f32,
    initial_position: Vec2,
    stagger: f32,
}

/// Explicit state of one running merge.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeAnimation {
    survivor: ObjectId,
    survivor_scale: f32,
    survivor_position: Vec2,
    velocity: Vec2,
    target_scale: f32,
    goal: Option<Vec2>,
    absorbed: Vec<Absorbed>,
    progress: f32,
}

impl MergeAnimation {
    /// Member that remains once the animation completes.
    #[must_use]
    pub fn survivor(&self) -> ObjectId {
        self.survivor
    }

    /// Fraction of the animation already played, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.progress.clamp(0.0, 1.0)
    }

    /// Scale the survivor ends with.
    #[must_use]
    pub fn target_scale(&self) -> f32 {
        self.target_scale
    }

    fn involves(&self, id: ObjectId) -> bool {
        self.survivor == id || self.absorbed.iter().any(|member| member.id == id)
    }

    /// Drops members that left play and rebalances the group around the rest.
    ///
    /// Returns `false` once fewer than two members remain; the last one is
    /// released through [`Command::AbandonMerge`].
    fn release(
        &mut self,
        gone: &[ObjectId],
        merge_multiplier: f32,
        out: &mut Vec<Command>,
    ) -> bool {
        let before = self.absorbed.len();
        self.absorbed.retain(|member| !gone.contains(&member.id));
        let lost_survivor = gone.contains(&self.survivor);
        if !lost_survivor && self.absorbed.len() == before {
            return true;
        }

        if lost_survivor {
            let heir = self
                .absorbed
                .iter()
                .enumerate()
                .fold(None, |best: Option<(usize, f32)>, (index, member)| match best {
                    Some((_, scale)) if scale >= member.initial_scale => best,
                    _ => Some((index, member.initial_scale)),
                });
            let Some((index, _)) = heir else {
                return false;
            };
            let heir = self.absorbed.remove(index);
            log::debug!(
                "merge survivor {} left play; {} takes over",
                self.survivor.get(),
                heir.id.get()
            );
            self.survivor = heir.id;
            self.survivor_scale = heir.initial_scale;
            self.survivor_position = heir.initial_position;
        }

        if self.absorbed.is_empty() {
            out.push(Command::AbandonMerge {
                object: self.survivor,
                scale: self.survivor_scale,
            });
            return false;
        }

        let total_area = circle_area(self.survivor_scale)
            + self
                .absorbed
                .iter()
                .map(|member| circle_area(member.initial_scale))
                .sum::<f32>();
        self.target_scale = (total_area / PI).sqrt() * merge_multiplier;
        true
    }

    /// Advances by `step` and emits this frame's commands; returns `true` once complete.
    fn advance(&mut self, step: f32, objects: &ObjectView, out: &mut Vec<Command>) -> bool {
        self.progress += step;
        let goal = self
            .goal
            .or_else(|| objects.get(self.survivor).map(|snapshot| snapshot.position))
            .unwrap_or(self.survivor_position);

        if self.progress >= 1.0 {
            out.push(Command::CompleteMerge {
                survivor: self.survivor,
                absorbed: self.absorbed.iter().map(|member| member.id).collect(),
                scale: self.target_scale,
                position: self.goal,
                velocity: self.velocity,
            });
            return true;
        }

        let t = self.progress.clamp(0.0, 1.0);
        out.push(Command::AnimateMerge {
            object: self.survivor,
            scale: lerp(self.survivor_scale, self.target_scale, t),
            position: self.goal.map(|goal| self.survivor_position.lerp(goal, t)),
        });
        for member in &self.absorbed {
            out.push(Command::AnimateMerge {
                object: member.id,
                scale: lerp(member.initial_scale, 0.0, t),
                position: Some(
                    member
                        .initial_position
                        .lerp(goal, (t * member.stagger).clamp(0.0, 1.0)),
                ),
            });
        }
        false
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Pure system that starts, animates and completes merges.
pub struct Merging {
    config: Config,
    predicate: Option<AcceptancePredicate>,
    animations: Vec<MergeAnimation>,
}

impl fmt::Debug for Merging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Merging")
            .field("config", &self.config)
            .field("predicate", &self.predicate.is_some())
            .field("animations", &self.animations)
            .finish()
    }
}

impl Merging {
    /// Creates a new merge engine using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            predicate: None,
            animations: Vec::new(),
        }
    }

    /// Installs a veto consulted for every contact that passes the acceptance rule.
    #[must_use]
    pub fn with_predicate(mut self, predicate: AcceptancePredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Merges that are still animating.
    #[must_use]
    pub fn animations(&self) -> &[MergeAnimation] {
        &self.animations
    }

    /// Consumes events and the object view to emit merge commands.
    ///
    /// New merges only start while playing; merges already in flight always
    /// run to completion.
    pub fn handle(
        &mut self,
        events: &[Event],
        play_mode: PlayMode,
        objects: &ObjectView,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::ContactBegan {
                    initiator,
                    other,
                    contacts,
                } if play_mode == PlayMode::Playing => {
                    self.try_begin(*initiator, *other, contacts, objects, out);
                }
                Event::TimeAdvanced { dt } => self.advance(*dt, objects, out),
                Event::MergeCompleted { absorbed, .. } => self.forget(absorbed, out),
                Event::ObjectDeactivated { object } => self.forget(&[*object], out),
                _ => {}
            }
        }
    }

    fn is_merging(&self, snapshot: &ObjectSnapshot) -> bool {
        snapshot.merging
            || self
                .animations
                .iter()
                .any(|animation| animation.involves(snapshot.id))
    }

    fn accepts(&self, first: &ObjectSnapshot, second: &ObjectSnapshot) -> bool {
        let first_busy = self.is_merging(first);
        let second_busy = self.is_merging(second);
        let allowed = match self.config.acceptance {
            MergeAcceptance::Strict => !first_busy && !second_busy,
            MergeAcceptance::Relaxed => !first_busy || !second_busy,
        };
        if !allowed {
            return false;
        }

        match &self.predicate {
            None => true,
            Some(predicate) => match predicate(first, second) {
                Ok(accepted) => accepted,
                Err(error) => {
                    log::debug!(
                        "merge of {} and {} vetoed: {error:#}",
                        first.id.get(),
                        second.id.get()
                    );
                    false
                }
            },
        }
    }

    fn try_begin(
        &mut self,
        initiator: ObjectId,
        other: ObjectId,
        contacts: &[Vec2],
        objects: &ObjectView,
        out: &mut Vec<Command>,
    ) {
        let (Some(first), Some(second)) = (objects.get(initiator), objects.get(other)) else {
            return;
        };
        if !self.accepts(first, second) {
            return;
        }

        let mut members: Vec<&ObjectSnapshot> = vec![first, second];
        let radius = if self.config.scale_detection_with_size {
            self.config.detection_range * first.scale
        } else {
            self.config.detection_range
        };
        let centers: Vec<Vec2> = match self.config.trigger {
            MergeTrigger::Collision => contacts.to_vec(),
            MergeTrigger::Overlap => vec![second.position],
        };
        for center in centers {
            for candidate in objects.iter() {
                let included = members.iter().any(|member| member.id == candidate.id);
                if !included && !self.is_merging(candidate) && candidate.overlaps_circle(center, radius)
                {
                    members.push(candidate);
                }
            }
        }

        let Some(plan) = consolidate(
            &members,
            self.config.merge_multiplier,
            self.config.consolidation,
        ) else {
            return;
        };
        let Some(survivor) = objects.get(plan.survivor) else {
            return;
        };

        let largest_scale = members
            .iter()
            .map(|member| member.scale)
            .fold(0.0_f32, f32::max);
        let absorbed = members
            .iter()
            .filter(|member| member.id != plan.survivor)
            .map(|member| Absorbed {
                id: member.id,
                initial_scale: member.scale,
                initial_position: member.position,
                stagger: if self.config.stagger && largest_scale > 0.0 {
                    member.scale / largest_scale
                } else {
                    1.0
                },
            })
            .collect();

        log::debug!(
            "merging {} bubbles into {} (scale {:.3})",
            members.len(),
            plan.survivor.get(),
            plan.target_scale
        );
        out.push(Command::BeginMerge {
            survivor: plan.survivor,
            members: members.iter().map(|member| member.id).collect(),
        });
        self.animations.push(MergeAnimation {
            survivor: plan.survivor,
            survivor_scale: survivor.scale,
            survivor_position: survivor.position,
            velocity: survivor.velocity,
            target_scale: plan.target_scale,
            goal: plan.goal,
            absorbed,
            progress: 0.0,
        });
    }

    fn forget(&mut self, gone: &[ObjectId], out: &mut Vec<Command>) {
        if gone.is_empty() {
            return;
        }
        let merge_multiplier = self.config.merge_multiplier;
        self.animations
            .retain_mut(|animation| animation.release(gone, merge_multiplier, out));
    }

    fn advance(&mut self, dt: Duration, objects: &ObjectView, out: &mut Vec<Command>) {
        let step = if self.config.merge_speed > 0.0 {
            dt.as_secs_f32() * self.config.merge_speed
        } else {
            1.0
        };
        self.animations
            .retain_mut(|animation| !animation.advance(step, objects, out));
    }
}

#[cfg(test)]
mod tests {
    use merge_bubbles_core::{circle_area, Aabb, BodyKind};

    use super::*;

    fn bubble(id: u32, position: Vec2, scale: f32) -> ObjectSnapshot {
        ObjectSnapshot {
            id: ObjectId::new(id),
            position,
            velocity: Vec2::ZERO,
            scale,
            bounds: Aabb::from_center(position, Vec2::splat(scale / 2.0)),
            merging: false,
            merge_count: 1,
            polarity: None,
            kind: BodyKind::Rigid,
        }
    }

    fn conserved_area(scales: &[f32]) {
        let snapshots: Vec<ObjectSnapshot> = scales
            .iter()
            .enumerate()
            .map(|(index, scale)| bubble(index as u32, Vec2::ZERO, *scale))
            .collect();
        let members: Vec<&ObjectSnapshot> = snapshots.iter().collect();
        // A multiplier of 2 turns the merged radius back into a diameter.
        let plan = consolidate(&members, 2.0, Consolidation::IntoSurvivor).expect("plan");
        let expected: f32 = scales.iter().map(|scale| circle_area(*scale)).sum();
        assert!((circle_area(plan.target_scale) - expected).abs() < 1e-4);
        assert!((plan.total_area - expected).abs() < 1e-4);
    }

    #[test]
    fn consolidation_conserves_area_for_pairs() {
        conserved_area(&[1.0, 1.0]);
    }

    #[test]
    fn consolidation_conserves_area_for_triples() {
        conserved_area(&[1.0, 1.5, 0.75]);
    }

    #[test]
    fn consolidation_conserves_area_for_five() {
        conserved_area(&[1.0, 2.0, 0.5, 1.25, 3.0]);
    }

    #[test]
    fn survivor_is_first_of_the_largest() {
        let snapshots = [
            bubble(4, Vec2::ZERO, 1.0),
            bubble(2, Vec2::ZERO, 2.0),
            bubble(7, Vec2::ZERO, 2.0),
        ];
        let members: Vec<&ObjectSnapshot> = snapshots.iter().collect();
        let plan = consolidate(&members, 2.0, Consolidation::IntoSurvivor).expect("plan");
        assert_eq!(plan.survivor, ObjectId::new(2));
        assert!(plan.goal.is_none());
    }

    #[test]
    fn centroid_consolidation_targets_mean_position() {
        let snapshots = [
            bubble(0, Vec2::new(0.0, 0.0), 1.0),
            bubble(1, Vec2::new(2.0, 0.0), 1.0),
            bubble(2, Vec2::new(1.0, 3.0), 1.0),
        ];
        let members: Vec<&ObjectSnapshot> = snapshots.iter().collect();
        let plan = consolidate(&members, 2.0, Consolidation::Centroid).expect("plan");
        assert_eq!(plan.goal, Some(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn empty_group_has_no_plan() {
        assert!(consolidate(&[], 2.0, Consolidation::IntoSurvivor).is_none());
    }

    #[test]
    fn stagger_moves_small_members_slower() {
        let mut animation = MergeAnimation {
            survivor: ObjectId::new(0),
            survivor_scale: 2.0,
            survivor_position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            target_scale: 2.2,
            goal: None,
            absorbed: vec![Absorbed {
                id: ObjectId::new(1),
                initial_scale: 1.0,
                initial_position: Vec2::new(4.0, 0.0),
                stagger: 0.5,
            }],
            progress: 0.0,
        };
        let objects = ObjectView::from_snapshots(vec![bubble(0, Vec2::ZERO, 2.0)]);
        let mut out = Vec::new();
        assert!(!animation.advance(0.5, &objects, &mut out));
        assert_eq!(
            out[1],
            Command::AnimateMerge {
                object: ObjectId::new(1),
                scale: 0.5,
                position: Some(Vec2::new(3.0, 0.0)),
            }
        );
    }

    fn group(survivor: (u32, f32), absorbed: &[(u32, f32)]) -> MergeAnimation {
        MergeAnimation {
            survivor: ObjectId::new(survivor.0),
            survivor_scale: survivor.1,
            survivor_position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            target_scale: 0.0,
            goal: None,
            absorbed: absorbed
                .iter()
                .map(|(id, scale)| Absorbed {
                    id: ObjectId::new(*id),
                    initial_scale: *scale,
                    initial_position: Vec2::new(*id as f32, 0.0),
                    stagger: 1.0,
                })
                .collect(),
            progress: 0.4,
        }
    }

    #[test]
    fn lost_survivor_hands_over_to_largest_member() {
        let mut animation = group((0, 2.0), &[(1, 1.0), (2, 1.5), (3, 1.5)]);
        let mut out = Vec::new();
        assert!(animation.release(&[ObjectId::new(0)], 2.0, &mut out));
        assert!(out.is_empty());
        assert_eq!(animation.survivor(), ObjectId::new(2));
        assert!(!animation.involves(ObjectId::new(0)));
        let expected = circle_area(1.0) + 2.0 * circle_area(1.5);
        assert!((circle_area(animation.target_scale()) - expected).abs() < 1e-4);
    }

    #[test]
    fn lone_member_is_released() {
        let mut animation = group((0, 2.0), &[(1, 1.0)]);
        let mut out = Vec::new();
        assert!(!animation.release(&[ObjectId::new(1)], 2.0, &mut out));
        assert_eq!(
            out,
            vec![Command::AbandonMerge {
                object: ObjectId::new(0),
                scale: 2.0,
            }]
        );
    }

    #[test]
    fn unrelated_departures_leave_the_group_alone() {
        let mut animation = group((0, 2.0), &[(1, 1.0)]);
        let before = animation.clone();
        let mut out = Vec::new();
        assert!(animation.release(&[ObjectId::new(9)], 2.0, &mut out));
        assert_eq!(animation, before);
        assert!(out.is_empty());
    }

    #[test]
    fn non_positive_speed_completes_on_next_frame() {
        let mut merging = Merging::new(Config::new(0.0, 2.0));
        let objects = ObjectView::from_snapshots(vec![
            bubble(0, Vec2::ZERO, 1.0),
            bubble(1, Vec2::new(0.9, 0.0), 1.0),
        ]);
        let mut out = Vec::new();
        merging.handle(
            &[
                Event::ContactBegan {
                    initiator: ObjectId::new(0),
                    other: ObjectId::new(1),
                    contacts: vec![Vec2::new(0.5, 0.0)],
                },
                Event::TimeAdvanced {
                    dt: Duration::from_millis(1),
                },
            ],
            PlayMode::Playing,
            &objects,
            &mut out,
        );
        assert!(matches!(out.last(), Some(Command::CompleteMerge { .. })));
        assert!(merging.animations().is_empty());
    }
}

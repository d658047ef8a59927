//! Visibility policies.
//!
//! A policy answers "does `viewer` see `target`?" for candidates already
//! narrowed down by the nine-grid query. Policies are chosen per entity, or
//! per entity kind through [`AoiManager::set_kind_policy`], and fall back to
//! [`RangePolicy`].
//!
//! [`AoiManager::set_kind_policy`]: crate::AoiManager::set_kind_policy

use crate::entity::EntityView;
use vigil_core::math::DistanceMetric;
use vigil_core::EntityKind;

pub trait VisibilityPolicy: Send + Sync {
    fn can_see(&self, viewer: &EntityView, target: &EntityView) -> bool;
}

/// Visible when the target is visible, the viewer is active, and the two
/// are within the larger of their view ranges.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangePolicy {
    pub metric: DistanceMetric,
}

impl RangePolicy {
    pub fn new(metric: DistanceMetric) -> Self {
        Self { metric }
    }
}

impl VisibilityPolicy for RangePolicy {
    fn can_see(&self, viewer: &EntityView, target: &EntityView) -> bool {
        if !target.visible || !viewer.active {
            return false;
        }
        let range = viewer.view_range.max(target.view_range);
        self.metric.within(viewer.position, target.position, range)
    }
}

/// Never watches anything. Typical for NPCs and items, which are seen but
/// do not need to track their surroundings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlindPolicy;

impl VisibilityPolicy for BlindPolicy {
    fn can_see(&self, _viewer: &EntityView, _target: &EntityView) -> bool {
        false
    }
}

/// Range visibility, except viewers of the `blind` kinds never watch.
#[derive(Debug, Clone, Default)]
pub struct KindFilterPolicy {
    pub base: RangePolicy,
    pub blind: Vec<EntityKind>,
}

impl KindFilterPolicy {
    pub fn new(metric: DistanceMetric, blind: Vec<EntityKind>) -> Self {
        Self {
            base: RangePolicy::new(metric),
            blind,
        }
    }
}

impl VisibilityPolicy for KindFilterPolicy {
    fn can_see(&self, viewer: &EntityView, target: &EntityView) -> bool {
        !self.blind.contains(&viewer.kind) && self.base.can_see(viewer, target)
    }
}

/// Range visibility where targets of the `hidden` kinds are only revealed
/// inside `reveal_range`, regardless of either entity's view range.
#[derive(Debug, Clone)]
pub struct StealthPolicy {
    pub base: RangePolicy,
    pub hidden: Vec<EntityKind>,
    pub reveal_range: f32,
}

impl StealthPolicy {
    pub fn new(metric: DistanceMetric, hidden: Vec<EntityKind>, reveal_range: f32) -> Self {
        Self {
            base: RangePolicy::new(metric),
            hidden,
            reveal_range,
        }
    }
}

impl VisibilityPolicy for StealthPolicy {
    fn can_see(&self, viewer: &EntityView, target: &EntityView) -> bool {
        if !self.base.can_see(viewer, target) {
            return false;
        }
        if self.hidden.contains(&target.kind) {
            return self
                .base
                .metric
                .within(viewer.position, target.position, self.reveal_range);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::glam::Vec3;
    use vigil_core::EntityId;

    fn view(id: u64, kind: EntityKind, x: f32, range: f32) -> EntityView {
        EntityView {
            id: EntityId::new(id),
            kind,
            position: Vec3::new(x, 0.0, 0.0),
            view_range: range,
            active: true,
            visible: true,
        }
    }

    #[test]
    fn range_uses_larger_view_range() {
        let policy = RangePolicy::default();
        let short = view(1, EntityKind::Player, 0.0, 10.0);
        let long = view(2, EntityKind::Player, 50.0, 60.0);
        assert!(policy.can_see(&short, &long));
        assert!(policy.can_see(&long, &short));

        let far = view(3, EntityKind::Player, 200.0, 10.0);
        assert!(!policy.can_see(&short, &far));
    }

    #[test]
    fn range_respects_flags() {
        let policy = RangePolicy::default();
        let viewer = view(1, EntityKind::Player, 0.0, 100.0);
        let mut target = view(2, EntityKind::Player, 5.0, 100.0);
        target.visible = false;
        assert!(!policy.can_see(&viewer, &target));

        let mut sleeper = viewer;
        sleeper.active = false;
        target.visible = true;
        assert!(!policy.can_see(&sleeper, &target));
    }

    #[test]
    fn planar_metric_ignores_height() {
        let viewer = view(1, EntityKind::Player, 0.0, 10.0);
        let mut target = view(2, EntityKind::Player, 5.0, 10.0);
        target.position.y = 500.0;
        assert!(!RangePolicy::new(DistanceMetric::Euclidean).can_see(&viewer, &target));
        assert!(RangePolicy::new(DistanceMetric::Planar).can_see(&viewer, &target));
    }

    #[test]
    fn stealth_hides_kinds_until_close() {
        let policy = StealthPolicy::new(DistanceMetric::Euclidean, vec![EntityKind::Custom(7)], 15.0);
        let viewer = view(1, EntityKind::Player, 0.0, 100.0);
        let rogue_far = view(2, EntityKind::Custom(7), 40.0, 100.0);
        let rogue_near = view(3, EntityKind::Custom(7), 10.0, 100.0);
        let player = view(4, EntityKind::Player, 40.0, 100.0);

        assert!(!policy.can_see(&viewer, &rogue_far));
        assert!(policy.can_see(&viewer, &rogue_near));
        assert!(policy.can_see(&viewer, &player));
        assert!(!BlindPolicy.can_see(&viewer, &player));
    }

    #[test]
    fn kind_filter_blinds_listed_viewers() {
        let policy = KindFilterPolicy::new(DistanceMetric::Euclidean, vec![EntityKind::Npc, EntityKind::Item]);
        let player = view(1, EntityKind::Player, 0.0, 50.0);
        let npc = view(2, EntityKind::Npc, 10.0, 50.0);
        assert!(policy.can_see(&player, &npc));
        assert!(!policy.can_see(&npc, &player));
    }
}

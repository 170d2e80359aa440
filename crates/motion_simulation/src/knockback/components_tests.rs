//! Tests for knockback components.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use crate::knockback::{step_knockback, Knockback, PredictedKnockback};
    use crate::velocity::{Instruction, InstructionKind};

    #[test]
    fn test_modifiers_apply_in_order_then_exhaust() {
        let mut knockback = Knockback::new(Vec3::new(4.0, 2.0, 0.0), 0.5).with_modifiers([0.5, 3.0]);

        let first = knockback.apply_modifiers();
        assert_eq!(first, Vec3::new(6.0, 3.0, 0.0));
        assert!(knockback.modifiers.is_empty());

        // Идемпотентно после опустошения
        let second = knockback.apply_modifiers();
        assert_eq!(second, first);
        assert_eq!(knockback.base_velocity, first);
    }

    #[test]
    fn test_modifiers_added_later_apply_once() {
        let mut knockback = Knockback::new(Vec3::X, 1.0).with_modifiers([2.0]);
        knockback.apply_modifiers();

        knockback.modifiers.push(0.25);
        assert_eq!(knockback.apply_modifiers(), Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(knockback.apply_modifiers(), Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_expiry_is_strictly_after_duration() {
        let mut knockback = Knockback::new(Vec3::X, 0.5);

        assert!(!knockback.advance(0.25)); // 0.25
        assert!(!knockback.advance(0.25)); // 0.5 == duration, ещё активен
        assert!(knockback.advance(0.25)); // 0.75 > 0.5
    }

    #[test]
    fn test_step_uses_default_kind_unless_overridden() {
        let mut plain = Knockback::new(Vec3::Y, 1.0);
        let (instruction, expired) = step_knockback(&mut plain, InstructionKind::SetAbsolute, 0.1);
        assert_eq!(instruction.kind, InstructionKind::SetAbsolute);
        assert!(!expired);

        let mut explicit = Knockback::new(Vec3::Y, 1.0).with_kind(InstructionKind::Add);
        let (instruction, _) = step_knockback(&mut explicit, InstructionKind::SetAbsolute, 0.1);
        assert_eq!(instruction.kind, InstructionKind::Add);
        assert!((explicit.elapsed - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_predicted_channel_drain() {
        let mut channel = PredictedKnockback::default();
        channel.push(Instruction::add(Vec3::X));
        channel.push(Instruction::add(Vec3::Z));

        assert_eq!(channel.pending().len(), 2);
        assert_eq!(channel.drain().len(), 2);
        assert!(channel.pending().is_empty());
        assert_eq!(channel.total_sent, Vec3::new(1.0, 0.0, 1.0));
    }
}

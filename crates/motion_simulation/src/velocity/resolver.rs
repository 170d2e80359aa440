//! Instruction resolver: the only system that folds velocity queues.

use bevy::prelude::*;

use super::{Instruction, InstructionKind, Velocity};
use crate::schedule::ParallelSettings;

/// Left-to-right fold of queued instructions over `base`.
///
/// `Add` accumulates into a running sum; `SetAbsolute` replaces the base and
/// drops everything accumulated before it. Result = base + accumulator.
pub fn fold_instructions(base: Vec3, instructions: &[Instruction]) -> Vec3 {
    let mut base = base;
    let mut accumulator = Vec3::ZERO;

    for instruction in instructions {
        match instruction.kind {
            InstructionKind::Add => accumulator += instruction.delta,
            InstructionKind::SetAbsolute => {
                base = instruction.delta;
                accumulator = Vec3::ZERO;
            }
        }
    }

    base + accumulator
}

/// System: resolve every entity's queue once per tick
///
/// Runs in `TickSet::Resolve`, strictly after every motion producer.
/// Entities with an empty queue are left untouched (no change tick).
pub fn resolve_instructions(mut query: Query<&mut Velocity>, parallel: Res<ParallelSettings>) {
    query
        .par_iter_mut()
        .batching_strategy(parallel.batching())
        .for_each(|mut velocity| {
            if velocity.has_pending() {
                velocity.resolve();
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::velocity::WriteAuthority;
    use proptest::prelude::*;

    #[test]
    fn test_adds_accumulate_on_top_of_current() {
        let instructions = [Instruction::add(Vec3::X), Instruction::add(Vec3::new(0.0, 2.0, 0.0))];
        let result = fold_instructions(Vec3::new(1.0, 0.0, 0.0), &instructions);
        assert_eq!(result, Vec3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn test_set_absolute_discards_prior_adds() {
        // Input (Add) + knockback (SetAbsolute) в одном тике → knockback побеждает
        let instructions = [
            Instruction::add(Vec3::new(5.0, 0.0, 0.0)),
            Instruction::set_absolute(Vec3::new(0.0, 8.0, 0.0)),
            Instruction::add(Vec3::new(0.0, 0.0, 1.0)),
        ];
        let result = fold_instructions(Vec3::new(100.0, 100.0, 100.0), &instructions);
        assert_eq!(result, Vec3::new(0.0, 8.0, 1.0));
    }

    #[test]
    fn test_empty_queue_keeps_authoritative() {
        let mut velocity = Velocity::new(Vec3::new(3.0, -1.0, 0.5));
        assert!(!velocity.resolve());
        assert_eq!(velocity.authoritative(), Vec3::new(3.0, -1.0, 0.5));
        assert!(!velocity.has_pending());
    }

    #[test]
    fn test_resolve_drains_queue() {
        let mut velocity = Velocity::default();
        velocity.add_force(Vec3::ONE);
        assert!(velocity.resolve());
        assert!(!velocity.has_pending());
        assert_eq!(velocity.authoritative(), Vec3::ONE);

        // Повторный resolve - no-op
        assert!(!velocity.resolve());
        assert_eq!(velocity.authoritative(), Vec3::ONE);
    }

    #[test]
    fn test_set_uses_authority() {
        let mut velocity = Velocity::default();
        velocity.set(Vec3::Y, WriteAuthority::resolver());
        assert_eq!(velocity.authoritative(), Vec3::Y);
    }

    fn instruction_strategy() -> impl Strategy<Value = Instruction> {
        (any::<bool>(), -50i32..50, -50i32..50, -50i32..50).prop_map(|(set, x, y, z)| {
            // Целые значения: сумма в f32 точная, сравниваем без tolerance
            let delta = Vec3::new(x as f32, y as f32, z as f32);
            if set {
                Instruction::set_absolute(delta)
            } else {
                Instruction::add(delta)
            }
        })
    }

    proptest! {
        #[test]
        fn prop_resolve_matches_manual_fold(
            start in (-20i32..20, -20i32..20, -20i32..20),
            instructions in prop::collection::vec(instruction_strategy(), 0..24),
        ) {
            let start = Vec3::new(start.0 as f32, start.1 as f32, start.2 as f32);

            // Ручной fold: последний SetAbsolute + все Add после него
            let last_set = instructions
                .iter()
                .rposition(|i| i.kind == InstructionKind::SetAbsolute);
            let (mut expected, tail) = match last_set {
                Some(index) => (instructions[index].delta, &instructions[index + 1..]),
                None => (start, &instructions[..]),
            };
            for instruction in tail {
                expected += instruction.delta;
            }

            let mut velocity = Velocity::new(start);
            for instruction in &instructions {
                velocity.push(*instruction);
            }
            velocity.resolve();

            prop_assert_eq!(velocity.authoritative(), expected);
            prop_assert!(!velocity.has_pending());
        }
    }
}

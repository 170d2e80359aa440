//! Tick phases and the motion-producer contract
//!
//! Порядок фаз внутри одного FixedUpdate тика (барьер между фазами):
//! 1. Intake - структурные запросы (knockback attach, projectile launch)
//! 2. Produce - motion producers добавляют инструкции в Velocity
//! 3. Resolve - resolver сворачивает очереди
//! 4. Integrate - forces, sweep, collision response, callbacks
//! 5. React - state machines (projectile) реагируют на callbacks
//! 6. Sync - snapshots для репликации
//!
//! Structural changes (insert/remove/despawn) идут через Commands и
//! применяются один раз, в конце тика.

use bevy::ecs::batching::BatchingStrategy;
use bevy::ecs::intern::Interned;
use bevy::ecs::system::ScheduleSystem;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickSet {
    Intake,
    Produce,
    Resolve,
    Integrate,
    React,
    Sync,
}

/// Capability tag for systems that enqueue velocity instructions.
///
/// Implemented by a zero-sized system set label; systems are registered
/// through [`MotionPipelineAppExt::add_motion_producer`], which places the
/// label inside [`TickSet::Produce`] and after every producer declared
/// before it.
pub trait MotionProducer: SystemSet + Clone {}

/// Producer labels in declaration order
#[derive(Resource, Debug, Default)]
pub struct MotionProducers {
    order: Vec<Interned<dyn SystemSet>>,
}

impl MotionProducers {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Batch size used by every `par_iter_mut` in the pipeline
///
/// `None` = Bevy picks batches from the thread count.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelSettings {
    pub batch_size: Option<usize>,
}

impl ParallelSettings {
    pub fn batching(&self) -> BatchingStrategy {
        match self.batch_size {
            Some(size) => BatchingStrategy::fixed(size.max(1)),
            None => BatchingStrategy::new(),
        }
    }
}

pub trait MotionPipelineAppExt {
    fn add_motion_producer<P: MotionProducer, M>(
        &mut self,
        producer: P,
        systems: impl IntoScheduleConfigs<ScheduleSystem, M>,
    ) -> &mut Self;
}

impl MotionPipelineAppExt for App {
    fn add_motion_producer<P: MotionProducer, M>(
        &mut self,
        producer: P,
        systems: impl IntoScheduleConfigs<ScheduleSystem, M>,
    ) -> &mut Self {
        ensure_plugin(self, TickPipelinePlugin);

        let label = producer.intern();
        let previous = {
            let mut producers = self.world_mut().resource_mut::<MotionProducers>();
            let previous = producers.order.last().copied();
            producers.order.push(label);
            previous
        };

        let scoped = producer.clone().in_set(TickSet::Produce);
        match previous {
            Some(previous) => self.configure_sets(FixedUpdate, scoped.after_ignore_deferred(previous)),
            None => self.configure_sets(FixedUpdate, scoped),
        };

        crate::logger::log(&format!("Motion producer registered: {:?}", label));

        self.add_systems(FixedUpdate, systems.in_set(producer))
    }
}

/// Configures tick phases; added automatically by the pipeline plugins.
pub struct TickPipelinePlugin;

impl Plugin for TickPipelinePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MotionProducers>()
            .init_resource::<ParallelSettings>()
            .configure_sets(
                FixedUpdate,
                (
                    TickSet::Intake,
                    TickSet::Produce,
                    TickSet::Resolve,
                    TickSet::Integrate,
                    TickSet::React,
                    TickSet::Sync,
                )
                    .chain_ignore_deferred(),
            );
    }
}

/// Adds `plugin` unless it is already part of the app.
pub(crate) fn ensure_plugin<P: Plugin>(app: &mut App, plugin: P) {
    if !app.is_plugin_added::<P>() {
        app.add_plugins(plugin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
    struct FirstProducer;
    impl MotionProducer for FirstProducer {}

    #[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
    struct SecondProducer;
    impl MotionProducer for SecondProducer {}

    #[derive(Resource, Default)]
    struct Trace(Vec<&'static str>);

    fn first(mut trace: ResMut<Trace>) {
        trace.0.push("first");
    }

    fn second(mut trace: ResMut<Trace>) {
        trace.0.push("second");
    }

    fn resolver_stub(mut trace: ResMut<Trace>) {
        trace.0.push("resolve");
    }

    #[test]
    fn test_producers_run_in_declaration_order_before_resolve() {
        let mut app = App::new();
        app.init_resource::<Trace>()
            .add_plugins(TickPipelinePlugin)
            .add_systems(FixedUpdate, resolver_stub.in_set(TickSet::Resolve))
            .add_motion_producer(SecondProducer, second)
            .add_motion_producer(FirstProducer, first);

        app.world_mut().run_schedule(FixedUpdate);

        assert_eq!(app.world().resource::<Trace>().0, vec!["second", "first", "resolve"]);
        assert_eq!(app.world().resource::<MotionProducers>().len(), 2);
    }

    #[test]
    fn test_fixed_batching() {
        let settings = ParallelSettings { batch_size: Some(0) };
        // 0 clamps to 1 (BatchingStrategy::fixed требует > 0)
        let _ = settings.batching();
        assert!(ParallelSettings::default().batch_size.is_none());
    }
}

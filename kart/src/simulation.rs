//! Fixed-order stepping of every kart in a collision world.
//!
//! Determinism
//! - Karts step in insertion order.
//! - Kart capsules are synced into the world and every kart is snapshotted before anyone
//!   moves. Karts only see each other through those, so insertion order never changes
//!   what a kart collides with.

use crate::{
    collision::{CollisionQuery, CollisionWorld, KartId, QueryFilter, Transform, Vec3},
    config::KartConfig,
    error::{KartError, KartResult},
    events::KartEvent,
    input::{InputState, KartInput},
    kart::Kart,
    layers::trigger_layers,
    race::{CheckpointId, RaceUpdate, TrackManager},
    response::KartInfo,
};

struct Entry<I> {
    kart: Kart,
    input: I,
    /// Checkpoints the kart's capsule overlapped at the end of the last tick.
    inside: Vec<CheckpointId>,
}

/// Everything that happened during one tick, in kart order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub events: Vec<(KartId, KartEvent)>,
    pub race: Vec<(KartId, RaceUpdate)>,
}

pub struct Simulation<I: KartInput = InputState> {
    world: CollisionWorld,
    karts: Vec<Entry<I>>,
    track: Option<TrackManager>,
}

impl<I: KartInput> Simulation<I> {
    pub fn new(world: CollisionWorld) -> Self {
        Self {
            world,
            karts: Vec::new(),
            track: None,
        }
    }

    /// Race on `track`. Karts added afterwards wait for [`Simulation::start_race`] to get
    /// control.
    pub fn with_track(mut self, track: TrackManager) -> Self {
        self.track = Some(track);
        self
    }

    /// Add a kart at `pose`, driven by `input`.
    pub fn add_kart(
        &mut self,
        name: impl Into<String>,
        config: &KartConfig,
        pose: Transform,
        input: I,
    ) -> KartResult<KartId> {
        let id = KartId(self.karts.len() as u32);
        let mut kart = Kart::new(id, config, pose)?;
        let collider = self.world.insert_kart(id, kart.capsule(), pose);
        kart.set_collider(Some(collider));

        if let Some(track) = self.track.as_mut().filter(|t| t.has_checkpoints()) {
            track.add_racer(id, name);
            if !track.is_race_running() {
                kart.disable_control();
            }
        }

        log::debug!("added kart {} at {:?}", id.0, pose.translation);
        self.karts.push(Entry {
            kart,
            input,
            inside: Vec::new(),
        });
        Ok(id)
    }

    #[inline]
    pub fn world(&self) -> &CollisionWorld {
        &self.world
    }

    #[inline]
    pub fn track(&self) -> Option<&TrackManager> {
        self.track.as_ref()
    }

    pub fn kart(&self, id: KartId) -> Option<&Kart> {
        self.karts.get(id.0 as usize).map(|e| &e.kart)
    }

    pub fn kart_mut(&mut self, id: KartId) -> Option<&mut Kart> {
        self.karts.get_mut(id.0 as usize).map(|e| &mut e.kart)
    }

    pub fn input_mut(&mut self, id: KartId) -> Option<&mut I> {
        self.karts.get_mut(id.0 as usize).map(|e| &mut e.input)
    }

    pub fn karts(&self) -> impl Iterator<Item = &Kart> {
        self.karts.iter().map(|e| &e.kart)
    }

    /// Give every racer control and start the clocks.
    pub fn start_race(&mut self) -> Vec<(KartId, RaceUpdate)> {
        let Some(track) = self.track.as_mut().filter(|t| t.has_checkpoints()) else {
            return Vec::new();
        };
        for entry in &mut self.karts {
            entry.kart.enable_control();
        }
        track.start_race()
    }

    pub fn stop_race(&mut self) {
        let Some(track) = self.track.as_mut() else {
            return;
        };
        for entry in &mut self.karts {
            entry.kart.disable_control();
        }
        track.stop_race();
    }

    /// Advance every kart by `dt`. A non-positive `dt` pauses the tick.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let mut report = TickReport::default();
        if dt <= 0.0 {
            return report;
        }

        for entry in &self.karts {
            if let Some(collider) = entry.kart.collider() {
                self.world.set_kart_pose(collider, entry.kart.pose());
            }
        }

        let snapshots: Vec<KartInfo> = self.karts.iter().map(|e| e.kart.info()).collect();
        for entry in &mut self.karts {
            let out = entry.kart.step(&self.world, &mut entry.input, &snapshots, dt);
            let id = entry.kart.id();
            report.events.extend(out.events.into_iter().map(|e| (id, e)));
        }

        if let Some(track) = self.track.as_mut() {
            track.update(dt);
            for entry in &mut self.karts {
                let now = overlapped_checkpoints(&self.world, &entry.kart);
                let id = entry.kart.id();
                for &checkpoint in now.iter().filter(|c| !entry.inside.contains(c)) {
                    report.race.push((id, track.checkpoint_entered(id, checkpoint)));
                }
                entry.inside = now;
            }
        }

        report
    }

    /// Put a kart back on the last checkpoint it passed.
    ///
    /// The move is applied on the kart's next step. Control is kept if the kart had it.
    pub fn reposition_at_last_checkpoint(&mut self, id: KartId) -> KartResult<()> {
        let reset = self
            .track
            .as_ref()
            .and_then(|t| t.last_checkpoint(id))
            .map(|c| *c.reset_pose())
            .ok_or(KartError::UnknownKart { kart: id })?;
        let kart = self
            .karts
            .get_mut(id.0 as usize)
            .map(|e| &mut e.kart)
            .ok_or(KartError::UnknownKart { kart: id })?;

        let lift = reset.rotation * Vec3::y() * (kart.capsule().radius + kart.contact_offset());
        let pose = kart.pose();
        let was_controlled = kart.is_controlled();

        kart.disable_control();
        kart.force_move(
            reset.translation + lift - pose.translation,
            reset.rotation * pose.rotation.inverse(),
        );
        if was_controlled {
            kart.enable_control();
        }
        log::debug!("repositioning kart {} to {:?}", id.0, reset.translation);
        Ok(())
    }
}

/// Checkpoint sensors overlapped by a kart's capsule, in id order.
fn overlapped_checkpoints(world: &CollisionWorld, kart: &Kart) -> Vec<CheckpointId> {
    let capsule = kart.capsule();
    let state = kart.state();
    let (a, b) = capsule.segment(state.position, state.rotation);
    let filter = QueryFilter::with_sensors(trigger_layers()).excluding(kart.collider());

    let mut found: Vec<CheckpointId> = world
        .overlap_capsule(a, b, capsule.radius, &filter)
        .into_iter()
        .filter_map(|collider| world.checkpoint_of(collider))
        .collect();
    found.sort();
    found.dedup();
    found
}

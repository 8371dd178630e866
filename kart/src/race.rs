//! Lap timing: checkpoints, racers and session records.
//!
//! Checkpoints must be passed in order, starting with the start/finish line. Crossing the
//! start/finish line starts the next lap; crossing it after the final lap completes the race.

use std::collections::BTreeMap;

use crate::{
    collision::{ColliderDef, CollisionQuery, KartId, QueryFilter, Quat, Transform, Vec3},
    constants::RECOMMENDED_MIN_CHECKPOINTS,
    error::{KartError, KartResult},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckpointId(pub u32);

/// A trigger box racers must pass through.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    id: CheckpointId,
    pose: Transform,
    half_extents: Vec3,
    is_start_finish: bool,
    /// Where a kart is put back when it is repositioned here.
    reset_pose: Transform,
}

impl Checkpoint {
    /// Place a checkpoint and find its reset pose on the ground below it.
    ///
    /// The reset pose is the nearest ground hit of a ray cast straight down from the top of
    /// the box through its full height, facing the checkpoint's forward with the ground
    /// normal as up. A checkpoint with no ground inside its box is an error.
    pub fn new<W: CollisionQuery + ?Sized>(
        world: &W,
        id: CheckpointId,
        pose: Transform,
        half_extents: Vec3,
        is_start_finish: bool,
        ground: &QueryFilter,
    ) -> KartResult<Self> {
        let top = pose.translation + Vec3::y() * half_extents.y;
        let hit = world
            .cast_ray(top, -Vec3::y(), half_extents.y * 2.0, ground)
            .ok_or(KartError::CheckpointWithoutGround { checkpoint: id })?;

        let forward = pose.rotation * Vec3::z();
        let reset_pose = Transform::new(hit.point, Quat::face_towards(&forward, &hit.normal));

        Ok(Self {
            id,
            pose,
            half_extents,
            is_start_finish,
            reset_pose,
        })
    }

    /// Sensor collider for this checkpoint.
    pub fn collider_def(&self, collider_id: u32) -> ColliderDef {
        ColliderDef::checkpoint(collider_id, self.id, self.pose, self.half_extents)
    }

    #[inline]
    pub fn id(&self) -> CheckpointId {
        self.id
    }

    #[inline]
    pub fn is_start_finish(&self) -> bool {
        self.is_start_finish
    }

    #[inline]
    pub fn reset_pose(&self) -> &Transform {
        &self.reset_pose
    }
}

/// Lap timer and lap count of one kart.
#[derive(Clone, Debug, PartialEq)]
pub struct Racer {
    name: String,
    timer: f32,
    is_timer_paused: bool,
    current_lap: u32,
    lap_times: Vec<f32>,
}

impl Racer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timer: 0.0,
            is_timer_paused: true,
            current_lap: 0,
            lap_times: Vec::new(),
        }
    }

    /// The timer only runs once the first lap has started.
    pub fn advance(&mut self, dt: f32) {
        if self.current_lap > 0 && !self.is_timer_paused && dt > 0.0 {
            self.timer += dt;
        }
    }

    pub fn pause_timer(&mut self) {
        self.is_timer_paused = true;
    }

    pub fn unpause_timer(&mut self) {
        self.is_timer_paused = false;
    }

    /// Close the running lap, if any, and start the next one.
    pub fn hit_start_finish_line(&mut self) {
        if self.current_lap > 0 {
            self.lap_times.push(self.timer);
            self.timer = 0.0;
        }
        self.current_lap += 1;
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn current_lap(&self) -> u32 {
        self.current_lap
    }

    #[inline]
    pub fn lap_times(&self) -> &[f32] {
        &self.lap_times
    }

    /// Time of the lap in progress.
    #[inline]
    pub fn lap_time(&self) -> f32 {
        self.timer
    }

    pub fn race_time(&self) -> f32 {
        self.timer + self.lap_times.iter().sum::<f32>()
    }
}

/// Best time on a track over a number of laps.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackRecord {
    pub track_name: String,
    pub laps: u32,
    pub racer_name: String,
    /// Infinite while no time has been set.
    pub time: f32,
}

impl TrackRecord {
    pub fn unset(track_name: impl Into<String>, laps: u32) -> Self {
        Self {
            track_name: track_name.into(),
            laps,
            racer_name: String::new(),
            time: f32::INFINITY,
        }
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.time < f32::INFINITY
    }

    /// Replace the record when `time` beats it. Returns true when it did.
    pub fn offer(&mut self, racer: &Racer, time: f32) -> bool {
        if time >= self.time {
            return false;
        }
        self.racer_name = racer.name().to_string();
        self.time = time;
        true
    }
}

/// What a checkpoint crossing meant for the race.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RaceUpdate {
    /// The race has not started. The crossing is replayed when it does.
    Deferred,
    /// Not the racer's next checkpoint, or an unknown racer or checkpoint.
    Ignored,
    /// The racer's next checkpoint, other than the start/finish line.
    Passed(CheckpointId),
    /// The start/finish line. `lap` is the lap now being driven; `lap_time` is the time of
    /// the lap just completed, if there was one.
    StartFinish { lap: u32, lap_time: Option<f32> },
}

#[derive(Clone, Debug)]
struct RacerEntry {
    racer: Racer,
    /// Index into `checkpoints` of the checkpoint this racer must pass next.
    next: usize,
}

/// Checkpoint order, racer progress and session records for one track.
#[derive(Clone, Debug)]
pub struct TrackManager {
    track_name: String,
    lap_total: u32,
    checkpoints: Vec<Checkpoint>,
    racers: BTreeMap<KartId, RacerEntry>,
    is_running: bool,
    deferred: Vec<(KartId, CheckpointId)>,
    best_lap: TrackRecord,
    best_race: TrackRecord,
}

impl TrackManager {
    /// `checkpoints` in driving order, start/finish line first.
    pub fn new(
        track_name: impl Into<String>,
        lap_total: u32,
        checkpoints: Vec<Checkpoint>,
    ) -> Self {
        let track_name = track_name.into();
        if checkpoints.len() < RECOMMENDED_MIN_CHECKPOINTS {
            log::warn!(
                "track {track_name} has {} checkpoints; at least \
                 {RECOMMENDED_MIN_CHECKPOINTS} are recommended and karts never get control \
                 with none",
                checkpoints.len()
            );
        }
        if checkpoints.first().is_some_and(|c| !c.is_start_finish()) {
            log::warn!("track {track_name}: first checkpoint is not the start/finish line");
        }
        Self {
            best_lap: TrackRecord::unset(track_name.clone(), 1),
            best_race: TrackRecord::unset(track_name.clone(), lap_total),
            track_name,
            lap_total,
            checkpoints,
            racers: BTreeMap::new(),
            is_running: false,
            deferred: Vec::new(),
        }
    }

    /// Whether racing is possible at all on this track.
    #[inline]
    pub fn has_checkpoints(&self) -> bool {
        !self.checkpoints.is_empty()
    }

    #[inline]
    pub fn track_name(&self) -> &str {
        &self.track_name
    }

    #[inline]
    pub fn lap_total(&self) -> u32 {
        self.lap_total
    }

    #[inline]
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    #[inline]
    pub fn is_race_running(&self) -> bool {
        self.is_running
    }

    /// Enter a racer. Its first checkpoint is the start/finish line.
    ///
    /// A racer joining a running race gets a running timer.
    pub fn add_racer(&mut self, kart: KartId, name: impl Into<String>) {
        let mut racer = Racer::new(name);
        if self.is_running {
            racer.unpause_timer();
        }
        self.racers.insert(kart, RacerEntry { racer, next: 0 });
    }

    pub fn racer(&self, kart: KartId) -> Option<&Racer> {
        self.racers.get(&kart).map(|e| &e.racer)
    }

    pub fn racers(&self) -> impl Iterator<Item = (KartId, &Racer)> {
        self.racers.iter().map(|(id, e)| (*id, &e.racer))
    }

    /// Start timers and replay crossings that happened before the start.
    pub fn start_race(&mut self) -> Vec<(KartId, RaceUpdate)> {
        self.is_running = true;
        for entry in self.racers.values_mut() {
            entry.racer.unpause_timer();
        }
        log::info!("race started on {}", self.track_name);
        std::mem::take(&mut self.deferred)
            .into_iter()
            .map(|(kart, checkpoint)| (kart, self.checkpoint_entered(kart, checkpoint)))
            .collect()
    }

    pub fn stop_race(&mut self) {
        self.is_running = false;
        for entry in self.racers.values_mut() {
            entry.racer.pause_timer();
        }
        log::info!("race stopped on {}", self.track_name);
    }

    /// Advance every racer's timer.
    pub fn update(&mut self, dt: f32) {
        for entry in self.racers.values_mut() {
            entry.racer.advance(dt);
        }
    }

    /// Handle `kart` entering `checkpoint`.
    pub fn checkpoint_entered(&mut self, kart: KartId, checkpoint: CheckpointId) -> RaceUpdate {
        if !self.is_running {
            self.deferred.push((kart, checkpoint));
            return RaceUpdate::Deferred;
        }
        let count = self.checkpoints.len();
        let Some(entry) = self.racers.get_mut(&kart) else {
            log::warn!(
                "checkpoint {} entered by kart {} which is not racing",
                checkpoint.0,
                kart.0
            );
            return RaceUpdate::Ignored;
        };
        let Some(expected) = self.checkpoints.get(entry.next) else {
            return RaceUpdate::Ignored;
        };
        if expected.id() != checkpoint {
            log::debug!("kart {} skipped to checkpoint {}", kart.0, checkpoint.0);
            return RaceUpdate::Ignored;
        }
        entry.next = (entry.next + 1) % count;
        if !expected.is_start_finish() {
            return RaceUpdate::Passed(checkpoint);
        }

        let racer = &mut entry.racer;
        let lap_time = (racer.current_lap() > 0).then(|| racer.lap_time());
        if let Some(lap_time) = lap_time {
            log::info!("{} finished lap {} in {:.3}s", racer.name(), racer.current_lap(), lap_time);
            if self.best_lap.offer(racer, lap_time) {
                log::info!(
                    "new best lap on {}: {:.3}s by {}",
                    self.track_name,
                    lap_time,
                    racer.name()
                );
            }
            if racer.current_lap() == self.lap_total {
                let race_time = racer.race_time();
                log::info!("{} finished the race in {:.3}s", racer.name(), race_time);
                if self.best_race.offer(racer, race_time) {
                    log::info!(
                        "new best race on {}: {:.3}s by {}",
                        self.track_name,
                        race_time,
                        racer.name()
                    );
                }
            }
        }
        racer.hit_start_finish_line();
        RaceUpdate::StartFinish {
            lap: racer.current_lap(),
            lap_time,
        }
    }

    /// The checkpoint `kart` passed most recently, used as its reposition target.
    pub fn last_checkpoint(&self, kart: KartId) -> Option<&Checkpoint> {
        let entry = self.racers.get(&kart)?;
        let count = self.checkpoints.len();
        if count == 0 {
            return None;
        }
        self.checkpoints.get((entry.next + count - 1) % count)
    }

    pub fn session_best_lap(&self) -> Option<&TrackRecord> {
        Some(&self.best_lap).filter(|r| r.is_set())
    }

    pub fn session_best_race(&self) -> Option<&TrackRecord> {
        Some(&self.best_race).filter(|r| r.is_set())
    }
}

use crate::scene_config::RobotConfig;
use crate::wrap_angle;
use glam::Vec3;
use std::f64::consts::PI;

/// Heading changes smaller than this skip the rotating phase.
pub const ROTATION_THRESHOLD: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DronePhase {
    Paused,
    Rotating,
    Moving,
}

impl DronePhase {
    pub fn label(self) -> &'static str {
        match self {
            DronePhase::Paused => "paused",
            DronePhase::Rotating => "rotating",
            DronePhase::Moving => "moving",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DronePose {
    pub position: Vec3,
    pub yaw: f32,
}

/// Waypoint follower cycling paused -> rotating -> moving -> paused. Timing is driven
/// entirely by the timestamps passed to `update`.
#[derive(Debug, Clone)]
pub struct ScriptedMover {
    waypoints: Vec<Vec3>,
    speed: f32,
    pause_ms: f64,
    rotation_ms: f64,
    phase: DronePhase,
    index: usize,
    phase_start: Option<f64>,
    start_position: Vec3,
    target_position: Vec3,
    start_yaw: f32,
    target_yaw: f32,
    pose: DronePose,
}

impl ScriptedMover {
    pub fn new(config: &RobotConfig, initial_yaw: f32) -> Self {
        let waypoints: Vec<Vec3> = config.waypoints.iter().copied().map(Vec3::from).collect();
        let start = waypoints.first().copied().unwrap_or(Vec3::ZERO);
        Self {
            waypoints,
            speed: config.movement_speed,
            pause_ms: config.pause_duration.max(0.0),
            rotation_ms: config.rotation_duration.max(0.0),
            phase: DronePhase::Paused,
            index: 0,
            phase_start: None,
            start_position: start,
            target_position: start,
            start_yaw: initial_yaw,
            target_yaw: initial_yaw,
            pose: DronePose { position: start, yaw: initial_yaw },
        }
    }

    pub fn phase(&self) -> DronePhase {
        self.phase
    }

    pub fn waypoint_index(&self) -> usize {
        self.index
    }

    pub fn pose(&self) -> DronePose {
        self.pose
    }

    fn next_index(&self) -> usize {
        (self.index + 1) % self.waypoints.len()
    }

    /// Advance to `now_ms`. At most one phase transition happens per call.
    pub fn update(&mut self, now_ms: f64) -> DronePose {
        if self.waypoints.len() < 2 {
            return self.pose;
        }
        let Some(phase_start) = self.phase_start else {
            self.phase_start = Some(now_ms);
            return self.pose;
        };
        let elapsed = (now_ms - phase_start).max(0.0);
        match self.phase {
            DronePhase::Paused => {
                if elapsed >= self.pause_ms {
                    self.leave_pause(now_ms);
                }
            }
            DronePhase::Rotating => {
                let t = progress(elapsed, self.rotation_ms);
                self.pose.yaw = self.start_yaw + (self.target_yaw - self.start_yaw) * ease(t);
                if t >= 1.0 {
                    self.pose.yaw = wrap_angle(self.target_yaw);
                    self.begin_move(now_ms);
                }
            }
            DronePhase::Moving => {
                let distance = self.start_position.distance(self.target_position);
                let duration = f64::from(distance) / f64::from(self.speed.max(1.0e-3)) * 1000.0;
                let t = progress(elapsed, duration);
                self.pose.position = self.start_position.lerp(self.target_position, ease(t));
                if t >= 1.0 {
                    self.pose.position = self.target_position;
                    self.index = self.next_index();
                    self.phase = DronePhase::Paused;
                    self.phase_start = Some(now_ms);
                }
            }
        }
        self.pose
    }

    fn leave_pause(&mut self, now_ms: f64) {
        let target = self.waypoints[self.next_index()];
        let offset = target - self.pose.position;
        let heading = if offset.x.abs() + offset.z.abs() > f32::EPSILON {
            (-offset.x).atan2(-offset.z)
        } else {
            self.pose.yaw
        };
        let delta = wrap_angle(heading - self.pose.yaw);
        if delta.abs() > ROTATION_THRESHOLD {
            self.start_yaw = self.pose.yaw;
            self.target_yaw = self.pose.yaw + delta;
            self.phase = DronePhase::Rotating;
            self.phase_start = Some(now_ms);
        } else {
            self.begin_move(now_ms);
        }
    }

    fn begin_move(&mut self, now_ms: f64) {
        self.start_position = self.waypoints[self.index];
        self.target_position = self.waypoints[self.next_index()];
        self.phase = DronePhase::Moving;
        self.phase_start = Some(now_ms);
    }
}

fn progress(elapsed: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        1.0
    } else {
        (elapsed / duration).clamp(0.0, 1.0)
    }
}

/// Cosine ease-in-out on [0, 1].
fn ease(t: f64) -> f32 {
    ((1.0 - (PI * t).cos()) * 0.5) as f32
}

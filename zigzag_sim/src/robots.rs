//! Built-in robot logic.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use zigzag_core::{RobotController, RobotLogic, SensorReading};

/// Moves forward, then turns clockwise, every tick.
#[derive(Debug, Default)]
pub struct ForwardRotate;

impl RobotLogic for ForwardRotate {
    fn init(&mut self, _rc: &mut RobotController) {}

    fn periodic(&mut self, rc: &mut RobotController) {
        rc.move_forward();
        rc.rotate_clockwise();
    }
}

/// Right-hand wall follower. Stops once it stands on the goal.
///
/// Solves any maze whose goal is on the same wall component as the start,
/// which covers every perfect maze.
#[derive(Debug, Default)]
pub struct RightHandFollower;

impl RobotLogic for RightHandFollower {
    fn init(&mut self, _rc: &mut RobotController) {}

    fn periodic(&mut self, rc: &mut RobotController) {
        if rc.on_goal() {
            return;
        }
        if rc.query_right_sensor().is_open() {
            rc.rotate_clockwise();
            rc.move_forward();
        } else if rc.query_front_sensor().is_open() {
            rc.move_forward();
        } else {
            rc.rotate_counter_clockwise();
        }
    }
}

/// Does nothing; the trace holds only the starting state.
#[derive(Debug, Default)]
pub struct Idle;

impl RobotLogic for Idle {
    fn init(&mut self, _rc: &mut RobotController) {}

    fn periodic(&mut self, _rc: &mut RobotController) {}
}

/// Seeded random walk that heads for a visible goal.
#[derive(Debug)]
pub struct RandomWalk {
    rng: ChaCha8Rng,
}

impl RandomWalk {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RobotLogic for RandomWalk {
    fn init(&mut self, _rc: &mut RobotController) {}

    fn periodic(&mut self, rc: &mut RobotController) {
        if rc.on_goal() {
            return;
        }
        match rc.query_front_sensor() {
            SensorReading::Goal => {
                rc.move_forward();
            }
            SensorReading::Space if self.rng.gen_bool(0.7) => {
                rc.move_forward();
            }
            _ => {
                if self.rng.gen_bool(0.5) {
                    rc.rotate_clockwise();
                } else {
                    rc.rotate_counter_clockwise();
                }
            }
        }
    }
}

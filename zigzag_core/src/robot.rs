//! Entry-point contract for user-authored robot logic.

use crate::controller::RobotController;

/// Robot logic driven by the harness.
///
/// `init` runs once after the controller is bound; `periodic` runs once per
/// tick until the tick cap, the deadline, or a violation ends the run. Both
/// hooks reach the maze only through the controller they are handed.
///
/// # Example
///
/// ```
/// use zigzag_core::{RobotController, RobotLogic, SensorReading};
///
/// struct Wanderer;
///
/// impl RobotLogic for Wanderer {
///     fn init(&mut self, _rc: &mut RobotController) {}
///
///     fn periodic(&mut self, rc: &mut RobotController) {
///         if rc.query_front_sensor() == SensorReading::Wall {
///             rc.rotate_clockwise();
///         } else {
///             rc.move_forward();
///         }
///     }
/// }
/// ```
pub trait RobotLogic: Send {
    fn init(&mut self, rc: &mut RobotController);

    fn periodic(&mut self, rc: &mut RobotController);
}

impl<T: RobotLogic + ?Sized> RobotLogic for Box<T> {
    fn init(&mut self, rc: &mut RobotController) {
        (**self).init(rc)
    }

    fn periodic(&mut self, rc: &mut RobotController) {
        (**self).periodic(rc)
    }
}

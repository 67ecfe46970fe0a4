use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use brain::{ActuationService, CommandAccepted, DispatchError, PreconditionError};
use edgefirst_schemas::builtin_interfaces::Time;
use edgefirst_schemas::std_msgs::Header;
use kinematics::{GripperCommand, Joint, JointCommand};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zenoh::Session;

use crate::config::RobotSection;
use crate::error::AppError;

/// `EstopStatus::stop_level` when no estop is asserted.
pub const ESTOP_LEVEL_NONE: i32 = 4;

const FRAME_ID: &str = "arm0";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JointState {
    pub header: Header,
    pub name: Vec<String>,
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub effort: Vec<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GripperOpenFraction {
    pub header: Header,
    pub open_fraction: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NamedPose {
    pub header: Header,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstopStatus {
    pub stop_level: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseStatus {
    pub held: bool,
}

/// Key expressions under `rt/<robot>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotKeys {
    pub joint_command: String,
    pub gripper_command: String,
    pub named_pose: String,
    pub estop_status: String,
    pub lease_status: String,
}

impl RobotKeys {
    pub fn new(robot: &str) -> Self {
        Self {
            joint_command: format!("rt/{robot}/arm/joint_command"),
            gripper_command: format!("rt/{robot}/gripper/command"),
            named_pose: format!("rt/{robot}/arm/named_pose"),
            estop_status: format!("rt/{robot}/estop/status"),
            lease_status: format!("rt/{robot}/lease/status"),
        }
    }
}

/// Actuation over zenoh. Payloads are CDR little endian with the ROS 2
/// encapsulation header.
pub struct CommunicationLayer {
    session: Session,
    keys: RobotKeys,
    query_timeout: Duration,
    sequence: AtomicU64,
}

impl CommunicationLayer {
    pub async fn new(robot: &RobotSection) -> Result<Self, AppError> {
        let mut config = zenoh::config::Config::default();
        if !robot.connect.is_empty() {
            let endpoints = serde_json::to_string(&robot.connect)
                .map_err(|e| AppError::Session(e.to_string()))?;
            config
                .insert_json5("connect/endpoints", &endpoints)
                .map_err(|e| AppError::Session(e.to_string()))?;
        }
        let session = zenoh::open(config)
            .await
            .map_err(|e| AppError::Session(e.to_string()))?;
        info!("Zenoh session open for robot '{}'", robot.name);

        Ok(Self {
            session,
            keys: RobotKeys::new(&robot.name),
            query_timeout: robot.query_timeout(),
            sequence: AtomicU64::new(0),
        })
    }

    async fn publish<T: Serialize>(
        &self,
        key: &str,
        msg: &T,
    ) -> Result<CommandAccepted, DispatchError> {
        let payload = encode(msg)?;
        self.session
            .put(key, payload)
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        Ok(CommandAccepted {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// First decodable reply on `key`, within the query timeout.
    async fn query<T: DeserializeOwned>(&self, key: &str) -> Result<T, PreconditionError> {
        let replies = self
            .session
            .get(key)
            .timeout(self.query_timeout)
            .await
            .map_err(|e| PreconditionError::Session(e.to_string()))?;

        while let Ok(reply) = replies.recv_async().await {
            match reply.result() {
                Ok(sample) => {
                    let payload = sample.payload().to_bytes();
                    match decode::<T>(&payload) {
                        Ok(msg) => return Ok(msg),
                        Err(e) => warn!("Undecodable reply on {}: {}", key, e),
                    }
                }
                Err(err) => warn!("Error reply on {}: {:?}", key, err),
            }
        }
        Err(PreconditionError::NoResponse(key.to_string()))
    }
}

#[async_trait]
impl ActuationService for CommunicationLayer {
    async fn verify_preconditions(&self) -> Result<(), PreconditionError> {
        let estop: EstopStatus = self.query(&self.keys.estop_status).await?;
        if estop.stop_level != ESTOP_LEVEL_NONE {
            return Err(PreconditionError::EstopEngaged(estop.stop_level));
        }
        let lease: LeaseStatus = self.query(&self.keys.lease_status).await?;
        if !lease.held {
            return Err(PreconditionError::LeaseUnavailable);
        }
        Ok(())
    }

    async fn submit_joint_command(
        &self,
        command: &JointCommand,
    ) -> Result<CommandAccepted, DispatchError> {
        let msg = joint_state_message(command, stamp_now());
        self.publish(&self.keys.joint_command, &msg).await
    }

    async fn submit_gripper_command(
        &self,
        command: GripperCommand,
    ) -> Result<CommandAccepted, DispatchError> {
        let msg = GripperOpenFraction {
            header: header(stamp_now()),
            open_fraction: command.open_fraction(),
        };
        self.publish(&self.keys.gripper_command, &msg).await
    }

    async fn move_to_ready_pose(&self) -> Result<CommandAccepted, DispatchError> {
        debug!("Commanding ready pose");
        let msg = NamedPose {
            header: header(stamp_now()),
            name: "ready".to_string(),
        };
        self.publish(&self.keys.named_pose, &msg).await
    }
}

/// CDR body prefixed with its encapsulation header.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, DispatchError> {
    cdr::serialize::<_, _, cdr::CdrLe>(msg, cdr::Infinite)
        .map_err(|e| DispatchError::Encode(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, cdr::Error> {
    cdr::deserialize(payload)
}

pub fn joint_state_message(command: &JointCommand, stamp: Time) -> JointState {
    JointState {
        header: header(stamp),
        name: Joint::ALL.iter().map(|j| j.name().to_string()).collect(),
        position: command.as_slice().to_vec(),
        velocity: Vec::new(),
        effort: Vec::new(),
    }
}

fn header(stamp: Time) -> Header {
    Header {
        stamp,
        frame_id: FRAME_ID.to_string(),
    }
}

fn stamp_now() -> Time {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    Time::new(stamp_secs(now), now.subsec_nanos())
}

/// Whole seconds for a `Time` stamp, saturating past 2038.
fn stamp_secs(since_epoch: Duration) -> i32 {
    i32::try_from(since_epoch.as_secs()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_use_robot_prefix() {
        let keys = RobotKeys::new("spot");
        assert_eq!(keys.joint_command, "rt/spot/arm/joint_command");
        assert_eq!(keys.gripper_command, "rt/spot/gripper/command");
        assert_eq!(keys.named_pose, "rt/spot/arm/named_pose");
        assert_eq!(keys.estop_status, "rt/spot/estop/status");
        assert_eq!(keys.lease_status, "rt/spot/lease/status");
    }

    #[test]
    fn test_joint_state_layout() {
        let command = JointCommand::new([0.1, -1.0, 1.8, 0.0, -0.5, 0.1]);
        let msg = joint_state_message(&command, Time::new(12, 34));

        assert_eq!(
            msg.name,
            ["arm0.sh0", "arm0.sh1", "arm0.el0", "arm0.el1", "arm0.wr0", "arm0.wr1"]
        );
        assert_eq!(msg.position, command.as_slice());
        assert!(msg.velocity.is_empty());
        assert_eq!(msg.header.frame_id, FRAME_ID);
    }

    #[test]
    fn test_payload_carries_encapsulation_header() {
        let command = JointCommand::new([0.0, -1.0, 1.8, 0.0, -0.5, 0.1]);
        let payload = encode(&joint_state_message(&command, Time::new(1, 2))).unwrap();
        assert_eq!(&payload[..4], &[0x00, 0x01, 0x00, 0x00]);

        let decoded: JointState = decode(&payload).unwrap();
        assert_eq!(decoded.position, command.as_slice());
        assert_eq!(decoded.name.len(), 6);
    }

    #[test]
    fn test_stamp_seconds_saturate() {
        assert_eq!(stamp_secs(Duration::from_secs(1_700_000_000)), 1_700_000_000);
        assert_eq!(stamp_secs(Duration::from_secs(u64::from(u32::MAX))), i32::MAX);
        assert_eq!(stamp_secs(Duration::MAX), i32::MAX);
    }

    #[test]
    fn test_estop_status_decodes() {
        let payload = encode(&EstopStatus { stop_level: ESTOP_LEVEL_NONE }).unwrap();
        let status: EstopStatus = decode(&payload).unwrap();
        assert_eq!(status.stop_level, ESTOP_LEVEL_NONE);

        assert!(decode::<LeaseStatus>(&[0x00, 0x01]).is_err());
    }
}

//! Remapping of parsed .bvh motion onto the fixed DeepMimic humanoid joint list.

use crate::error::{Error, Result};
use crate::rig::RigMapping;
use crate::types::{BvhMetadata, Channel, Index, Joint, MotionData, Quaternion};

/////////////////////////////////////////////////////////////////////////////////////////////////

/// How a slot of the output layout is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Frame duration in seconds.
    Time,
    /// Root world position, three scalars.
    RootPosition,
    /// Single-axis joint emitting one angle in radians.
    Hinge,
    /// Three-axis joint emitting a unit quaternion.
    Ball,
}

/// One slot of the fixed output layout.
#[derive(Debug, Clone, Copy)]
pub struct JointTarget {
    pub name: &'static str,
    pub arity: usize,
    pub kind: SlotKind,
}

const fn target(name: &'static str, arity: usize, kind: SlotKind) -> JointTarget {
    JointTarget { name, arity, kind }
}

/// The DeepMimic humanoid joint list. Order is significant: it defines the
/// scalar layout of every output frame.
pub const JOINT_TARGETS: [JointTarget; 15] = [
    target("seconds", 1, SlotKind::Time),
    target("hip", 3, SlotKind::RootPosition),
    target("hip", 4, SlotKind::Ball),
    target("chest", 4, SlotKind::Ball),
    target("neck", 4, SlotKind::Ball),
    target("right hip", 4, SlotKind::Ball),
    target("right knee", 1, SlotKind::Hinge),
    target("right ankle", 4, SlotKind::Ball),
    target("right shoulder", 4, SlotKind::Ball),
    target("right elbow", 1, SlotKind::Hinge),
    target("left hip", 4, SlotKind::Ball),
    target("left knee", 1, SlotKind::Hinge),
    target("left ankle", 4, SlotKind::Ball),
    target("left shoulder", 4, SlotKind::Ball),
    target("left elbow", 1, SlotKind::Hinge),
];

/// Scalars per output key frame: 1+3+4+4+4+4+1+4+4+1+4+1+4+4+1.
pub const FRAME_LEN: usize = 44;

/// Emitted in the root-position slot when the root pose is locked.
pub const ROOT_POSITION_PLACEHOLDER: [f64; 3] = [2.0, 2.0, 2.0];

/// The slot whose rotation collapses to identity when the root pose is locked.
const ROOT_JOINT: &str = "hip";

/// Check the joint table for internal consistency. Cheap, run per conversion setup.
fn validate_joint_targets() -> Result<()> {
    let arity_sum: usize = JOINT_TARGETS.iter().map(|t| t.arity).sum();
    if arity_sum != FRAME_LEN {
        return Err(Error::Config(format!(
            "joint table arities sum to {arity_sum}, expected {FRAME_LEN}"
        )));
    }
    for (slot, target) in JOINT_TARGETS.iter().enumerate() {
        let expected = match target.kind {
            SlotKind::Time | SlotKind::Hinge => 1,
            SlotKind::RootPosition => 3,
            SlotKind::Ball => 4,
        };
        if target.arity != expected {
            return Err(Error::Config(format!(
                "joint table slot {slot} ({}) has arity {}, its kind requires {expected}",
                target.name, target.arity
            )));
        }
    }
    let time_slots = JOINT_TARGETS.iter().filter(|t| t.kind == SlotKind::Time).count();
    let root_slots = JOINT_TARGETS
        .iter()
        .filter(|t| t.kind == SlotKind::RootPosition)
        .count();
    if time_slots != 1 || JOINT_TARGETS[0].kind != SlotKind::Time || root_slots != 1 {
        return Err(Error::Config(
            "joint table must lead with its single time slot and hold a single root-position slot"
                .into(),
        ));
    }
    Ok(())
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Axis of the corrected rotation triple a hinge joint emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X = 0,
    Y = 1,
}

/// Sign convention and emitted axis for a hinge joint, in degrees-space.
#[derive(Debug, Clone, Copy)]
struct HingeFix {
    sign_x: f64,
    sign_y: f64,
    sign_z: f64,
    axis: Axis,
}

const HINGE_FIXES: [(&str, HingeFix); 2] = [
    ("right elbow", HingeFix { sign_x: -1.0, sign_y: 1.0, sign_z: -1.0, axis: Axis::Y }),
    ("left elbow", HingeFix { sign_x: -1.0, sign_y: -1.0, sign_z: -1.0, axis: Axis::Y }),
];

const HINGE_FIX_DEFAULT: HingeFix =
    HingeFix { sign_x: -1.0, sign_y: -1.0, sign_z: -1.0, axis: Axis::X };

fn hinge_fix(joint: &str) -> HingeFix {
    HINGE_FIXES
        .iter()
        .find(|(name, _)| *name == joint)
        .map(|(_, fix)| *fix)
        .unwrap_or(HINGE_FIX_DEFAULT)
}

/// Euler offsets for a ball joint, calibrated against the DeepMimic humanoid
/// rig: pitch = pitch_sign·x + pitch_offset, yaw = y, roll = z + roll_offset,
/// all in degrees. Pitch is negated after the fix is applied.
#[derive(Debug, Clone, Copy)]
struct BallFix {
    pitch_sign: f64,
    pitch_offset: f64,
    roll_offset: f64,
}

const BALL_FIXES: [(&str, BallFix); 4] = [
    ("right shoulder", BallFix { pitch_sign: -1.0, pitch_offset: 30.0, roll_offset: -90.0 }),
    ("left shoulder", BallFix { pitch_sign: -1.0, pitch_offset: 30.0, roll_offset: 90.0 }),
    ("right hip", BallFix { pitch_sign: 1.0, pitch_offset: 0.0, roll_offset: -21.0 }),
    ("left hip", BallFix { pitch_sign: 1.0, pitch_offset: 0.0, roll_offset: 21.0 }),
];

const BALL_FIX_DEFAULT: BallFix =
    BallFix { pitch_sign: 1.0, pitch_offset: 0.0, roll_offset: 0.0 };

fn ball_fix(joint: &str) -> BallFix {
    BALL_FIXES
        .iter()
        .find(|(name, _)| *name == joint)
        .map(|(_, fix)| *fix)
        .unwrap_or(BALL_FIX_DEFAULT)
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Convert heading/attitude/bank angles (radians) to a unit quaternion.
pub fn euler_to_quaternion(heading: f64, attitude: f64, bank: f64) -> Quaternion {
    let c1 = (heading / 2.0).cos();
    let s1 = (heading / 2.0).sin();
    let c2 = (attitude / 2.0).cos();
    let s2 = (attitude / 2.0).sin();
    let c3 = (bank / 2.0).cos();
    let s3 = (bank / 2.0).sin();
    let c1c2 = c1 * c2;
    let s1s2 = s1 * s2;
    Quaternion::new(
        c1c2 * c3 - s1s2 * s3,
        c1c2 * s3 + s1s2 * c3,
        s1 * c2 * c3 + c1 * s2 * s3,
        c1 * s2 * c3 - s1 * c2 * s3,
    )
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Conversion options.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Replace the root position and rotation with fixed placeholder values.
    pub lock_root_pose: bool,
}

/// Resolved motion-row columns for one slot of the joint table.
#[derive(Debug)]
enum SlotBinding {
    Time,
    /// `None` when the root pose is locked and no channels are read.
    RootPosition(Option<[Index; 3]>),
    Hinge {
        fix: HingeFix,
        rotation: [Index; 3],
    },
    Ball {
        fix: BallFix,
        rotation: [Index; 3],
        zero_when_locked: bool,
    },
}

/// Converts frames of one parsed .bvh file into the flat DeepMimic layout.
///
/// Construction resolves every slot of the joint table against the skeleton
/// up front, so binding problems surface before any output is written.
#[derive(Debug)]
pub struct Retargeter {
    frame_time: f64,
    options: Options,
    bindings: Vec<SlotBinding>,
}

impl Retargeter {
    pub fn new(bvh: &BvhMetadata, rig: &RigMapping, options: Options) -> Result<Retargeter> {
        validate_joint_targets()?;

        let mut bindings = Vec::with_capacity(JOINT_TARGETS.len());
        let mut failures: Vec<(&str, Error)> = Vec::new();
        for target in &JOINT_TARGETS {
            match bind_slot(target, bvh, rig, options) {
                Ok(binding) => bindings.push(binding),
                Err(e) => failures.push((target.name, e)),
            }
        }
        match failures.len() {
            0 => Ok(Retargeter { frame_time: bvh.frame_time, options, bindings }),
            1 => Err(failures.remove(0).1),
            n => {
                let joined = failures
                    .iter()
                    .map(|(joint, e)| format!("{joint:?} ({e})"))
                    .collect::<Vec<String>>()
                    .join("; ");
                Err(Error::MissingChannel(format!("cannot bind {n} joints: {joined}")))
            }
        }
    }

    /// Convert one frame into the flat 44-scalar layout. Pure and
    /// deterministic: the same frame always yields the same key frame.
    pub fn convert(&self, motion: &MotionData, frame: Index) -> Result<Vec<f64>> {
        let mut key_frame = Vec::with_capacity(FRAME_LEN);
        for binding in &self.bindings {
            match binding {
                SlotBinding::Time => key_frame.push(self.frame_time),
                SlotBinding::RootPosition(None) => {
                    key_frame.extend_from_slice(&ROOT_POSITION_PLACEHOLDER)
                }
                SlotBinding::RootPosition(Some(columns)) => {
                    for &column in columns {
                        key_frame.push(read(motion, frame, column)?);
                    }
                }
                SlotBinding::Hinge { fix, rotation } => {
                    let [x, y, z] = read_rotation(motion, frame, rotation)?;
                    let corrected = [fix.sign_x * x, fix.sign_y * y, fix.sign_z * z];
                    key_frame.push(corrected[fix.axis as usize].to_radians());
                }
                SlotBinding::Ball { fix, rotation, zero_when_locked } => {
                    if *zero_when_locked && self.options.lock_root_pose {
                        key_frame.extend_from_slice(&[1.0, 0.0, 0.0, 0.0]);
                        continue;
                    }
                    let [x, y, z] = read_rotation(motion, frame, rotation)?;
                    let (pitch, yaw, roll) =
                        (fix.pitch_sign * x + fix.pitch_offset, y, z + fix.roll_offset);
                    // DeepMimic interprets pitch mirrored relative to the source channels
                    let pitch = -pitch;
                    let q = euler_to_quaternion(
                        yaw.to_radians(),
                        pitch.to_radians(),
                        roll.to_radians(),
                    );
                    key_frame.extend_from_slice(&[q.s, q.v.x, q.v.y, q.v.z]);
                }
            }
        }
        debug_assert_eq!(key_frame.len(), FRAME_LEN);
        Ok(key_frame)
    }

    /// Motion-row columns of the rotation channels bound for an abstract
    /// joint, if that joint has any.
    pub fn rotation_columns(&self, joint: &str) -> Option<[Index; 3]> {
        JOINT_TARGETS
            .iter()
            .zip(&self.bindings)
            .find_map(|(target, binding)| {
                if target.name != joint {
                    return None;
                }
                match binding {
                    SlotBinding::Hinge { rotation, .. } | SlotBinding::Ball { rotation, .. } => {
                        Some(*rotation)
                    }
                    _ => None,
                }
            })
    }

    /// Raw X/Y/Z rotation of an abstract joint at one frame, for diagnostics.
    pub fn raw_rotation(
        &self,
        motion: &MotionData,
        frame: Index,
        joint: &str,
    ) -> Option<(f64, f64, f64)> {
        let [x, y, z] = self.rotation_columns(joint)?;
        Some((
            motion.value(frame, x)?,
            motion.value(frame, y)?,
            motion.value(frame, z)?,
        ))
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

fn mapped_joint<'a>(bvh: &'a BvhMetadata, rig: &RigMapping, joint: &str) -> Result<&'a Joint> {
    let bone = rig.bone(joint)?;
    bvh.find_joint(bone).ok_or_else(|| {
        Error::MissingChannel(format!("bone {bone:?} is not present in the skeleton"))
    })
}

fn require_channel(joint: &Joint, channel: Channel) -> Result<Index> {
    joint.channel_column(channel).ok_or_else(|| {
        Error::MissingChannel(format!(
            "bone {:?} has no {} channel",
            joint.name,
            channel.name()
        ))
    })
}

fn rotation_channels(joint: &Joint) -> Result<[Index; 3]> {
    Ok([
        require_channel(joint, Channel::Xrotation)?,
        require_channel(joint, Channel::Yrotation)?,
        require_channel(joint, Channel::Zrotation)?,
    ])
}

fn bind_slot(
    target: &JointTarget,
    bvh: &BvhMetadata,
    rig: &RigMapping,
    options: Options,
) -> Result<SlotBinding> {
    match target.kind {
        SlotKind::Time => Ok(SlotBinding::Time),
        SlotKind::RootPosition => {
            if options.lock_root_pose {
                return Ok(SlotBinding::RootPosition(None));
            }
            let joint = mapped_joint(bvh, rig, target.name)?;
            let columns = [
                require_channel(joint, Channel::Xposition)?,
                require_channel(joint, Channel::Yposition)?,
                require_channel(joint, Channel::Zposition)?,
            ];
            Ok(SlotBinding::RootPosition(Some(columns)))
        }
        SlotKind::Hinge => Ok(SlotBinding::Hinge {
            fix: hinge_fix(target.name),
            rotation: rotation_channels(mapped_joint(bvh, rig, target.name)?)?,
        }),
        SlotKind::Ball => Ok(SlotBinding::Ball {
            fix: ball_fix(target.name),
            rotation: rotation_channels(mapped_joint(bvh, rig, target.name)?)?,
            zero_when_locked: target.name == ROOT_JOINT,
        }),
    }
}

fn read(motion: &MotionData, frame: Index, column: Index) -> Result<f64> {
    motion.value(frame, column).ok_or_else(|| {
        Error::MissingChannel(format!("no motion value at frame {frame}, column {column}"))
    })
}

fn read_rotation(motion: &MotionData, frame: Index, columns: &[Index; 3]) -> Result<[f64; 3]> {
    Ok([
        read(motion, frame, columns[0])?,
        read(motion, frame, columns[1])?,
        read(motion, frame, columns[2])?,
    ])
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    #[test]
    fn joint_table_is_consistent() {
        validate_joint_targets().unwrap();
        assert_eq!(JOINT_TARGETS.iter().map(|t| t.arity).sum::<usize>(), FRAME_LEN);
    }

    #[test]
    fn zero_angles_give_the_identity_quaternion() {
        let q = euler_to_quaternion(0.0, 0.0, 0.0);
        assert_eq!((q.s, q.v.x, q.v.y, q.v.z), (1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn heading_rotates_about_y() {
        let q = euler_to_quaternion(std::f64::consts::FRAC_PI_2, 0.0, 0.0);
        let half = std::f64::consts::FRAC_PI_4;
        assert!((q.s - half.cos()).abs() < 1e-12);
        assert!(q.v.x.abs() < 1e-12);
        assert!((q.v.y - half.sin()).abs() < 1e-12);
        assert!(q.v.z.abs() < 1e-12);
    }

    #[test]
    fn quaternions_are_unit_length() {
        for (h, a, b) in [
            (0.3, -1.2, 2.9),
            (-2.0, 0.7, -0.1),
            (1.5707, 1.5707, 1.5707),
            (6.1, -3.3, 0.0),
        ] {
            let q = euler_to_quaternion(h, a, b);
            assert!((q.magnitude() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn elbow_fixes_differ_only_in_y_sign() {
        let right = hinge_fix("right elbow");
        let left = hinge_fix("left elbow");
        assert_eq!(right.axis, Axis::Y);
        assert_eq!(left.axis, Axis::Y);
        assert_eq!(right.sign_y, 1.0);
        assert_eq!(left.sign_y, -1.0);
        assert_eq!((right.sign_x, right.sign_z), (left.sign_x, left.sign_z));
    }

    #[test]
    fn knees_fall_back_to_the_default_hinge_fix() {
        let fix = hinge_fix("right knee");
        assert_eq!(fix.axis, Axis::X);
        assert_eq!((fix.sign_x, fix.sign_y, fix.sign_z), (-1.0, -1.0, -1.0));
    }

    #[test]
    fn ball_fix_offsets_match_the_calibration() {
        assert_eq!(ball_fix("right shoulder").roll_offset, -90.0);
        assert_eq!(ball_fix("left shoulder").roll_offset, 90.0);
        assert_eq!(ball_fix("right shoulder").pitch_offset, 30.0);
        assert_eq!(ball_fix("right hip").roll_offset, -21.0);
        assert_eq!(ball_fix("left hip").roll_offset, 21.0);
        assert_eq!(ball_fix("chest").roll_offset, 0.0);
        assert_eq!(ball_fix("neck").pitch_sign, 1.0);
    }
}

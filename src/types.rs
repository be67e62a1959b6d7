use cgmath::{Quaternion as CgQuaternion, Vector3};

/////////////////////////////////////////////////////////////////////////////////////////////////

pub type Index = usize;
pub type ParentIndex = isize; // can be -1 if joint has no parent
pub type Depth = usize;
pub type Quaternion = CgQuaternion<f64>;
pub type Position = Vector3<f64>;

/////////////////////////////////////////////////////////////////////////////////////////////////

/// One of the six motion channels a .bvh joint can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Xposition,
    Yposition,
    Zposition,
    Xrotation,
    Yrotation,
    Zrotation,
}

impl Channel {
    pub fn from_name(name: &str) -> Option<Channel> {
        match name {
            "Xposition" => Some(Channel::Xposition),
            "Yposition" => Some(Channel::Yposition),
            "Zposition" => Some(Channel::Zposition),
            "Xrotation" => Some(Channel::Xrotation),
            "Yrotation" => Some(Channel::Yrotation),
            "Zrotation" => Some(Channel::Zrotation),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Xposition => "Xposition",
            Channel::Yposition => "Yposition",
            Channel::Zposition => "Zposition",
            Channel::Xrotation => "Xrotation",
            Channel::Yrotation => "Yrotation",
            Channel::Zrotation => "Zrotation",
        }
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug)]
pub struct Joint {
    pub name: String,
    pub index: Index,
    pub parent_index: ParentIndex,
    pub depth: Depth,
    pub children: Vec<Index>,
    pub is_leaf: bool,
    pub offset: Position,
    pub endsite: Option<Endsite>,
    /// Each channel the joint declares, paired with its column in a motion row.
    pub channels: Vec<(Channel, Index)>,
}

impl Joint {
    /// Motion-row column of one of this joint's channels.
    pub fn channel_column(&self, channel: Channel) -> Option<Index> {
        self.channels
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, column)| *column)
    }
}

#[derive(Debug)]
pub struct Endsite {
    pub offset: Position,
}

#[derive(Debug)]
pub struct BvhMetadata {
    pub joints: Vec<Joint>,
    pub num_frames: usize,
    pub frame_time: f64,
    pub fps: u32,
}

impl BvhMetadata {
    pub fn find_joint(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|joint| joint.name == name)
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Per-frame channel values, one row per frame in channel declaration order.
#[derive(Debug)]
pub struct MotionData {
    pub rows: Vec<Vec<f64>>,
}

impl MotionData {
    pub fn value(&self, frame: Index, column: Index) -> Option<f64> {
        self.rows.get(frame).and_then(|row| row.get(column)).copied()
    }
}

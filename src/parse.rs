//! Line-by-line parsing of the .bvh text format.

use crate::error::{Error, Result};
use crate::types::{BvhMetadata, Channel, Depth, Endsite, Index, Joint, MotionData, ParentIndex, Position};
use regex::Regex;
use std::path::Path;
use std::str::Lines;

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Used during joint creation to fill in its parent index.
/// Searches backwards for the joint with depth one less than the current joint's depth.
fn find_parent_joint_index_by_depth(
    joint_depth: Depth,
    joint_index: ParentIndex,
    joints: &[Joint],
) -> Result<ParentIndex> {
    // root joint
    if joint_depth == 0 || joints.is_empty() {
        return Ok(-1);
    }
    let mut i = joint_index - 1;
    while i >= 0 {
        if joints[i as Index].depth == joint_depth - 1 {
            return Ok(i);
        }
        i -= 1;
    }
    Err(Error::Parse(
        "joint nesting is inconsistent, parent joint not found".into(),
    ))
}

fn parse_f64(s: &str, what: &str) -> Result<f64> {
    s.parse::<f64>()
        .map_err(|_| Error::Parse(format!("invalid number {s:?} in {what}")))
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn parse_bvh(lines: Lines) -> Result<(BvhMetadata, MotionData)> {
    let mut joints: Vec<Joint> = Vec::new();
    let mut num_frames: usize = 0;
    let mut frame_time: f64 = 0.0;

    let mut parsing_endsite = false;
    let mut channels_index: Index = 0;
    let mut depth: Depth = 0;

    let re_joint = Regex::new(r"(ROOT|JOINT)\s+(\w+)").unwrap();
    let re_offset = Regex::new(r"OFFSET\s+(.+)").unwrap();
    let re_channels = Regex::new(r"CHANNELS\s+(\d+)\s+(.+)").unwrap();

    //// PARSING THE HIERARCHY LINE BY LINE
    let mut it = lines.into_iter();
    loop {
        let line = it
            .next()
            .ok_or_else(|| Error::Parse("unexpected end of file before motion data".into()))?;
        let line = line.trim();

        if line.starts_with("HIERARCHY") || line.is_empty() {
            continue;
        } else if line.starts_with("ROOT") || line.starts_with("JOINT") {
            //// Create joint
            let captures = re_joint
                .captures(line)
                .ok_or_else(|| Error::Parse(format!("joint name not found in {line:?}")))?;
            let name = captures.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
            let joint_index = joints.len() as Index;
            let parent_index =
                find_parent_joint_index_by_depth(depth, joint_index as ParentIndex, &joints)?;
            let joint = Joint {
                name,
                index: joint_index,
                parent_index,
                depth,
                children: Vec::new(),
                is_leaf: false,
                offset: Position::new(0.0, 0.0, 0.0),
                endsite: None,
                channels: Vec::new(),
            };
            //// If joint has a parent, add this joint to its parent's children
            if joint.parent_index != -1 {
                if let Some(parent) = joints.get_mut(joint.parent_index as Index) {
                    parent.children.push(joint.index);
                }
            }
            joints.push(joint);
        } else if line.to_lowercase().starts_with("end") {
            parsing_endsite = true;
        } else if line == "{" {
            depth += 1;
        } else if line == "}" {
            if depth == 0 {
                return Err(Error::Parse("unbalanced closing brace in hierarchy".into()));
            }
            depth -= 1;
        } else if line.starts_with("OFFSET") {
            //// Parse offset
            let captures = re_offset
                .captures(line)
                .ok_or_else(|| Error::Parse(format!("offset values not found in {line:?}")))?;
            let values = captures
                .get(1)
                .map(|m| m.as_str())
                .unwrap_or_default()
                .split_whitespace()
                .map(|s| parse_f64(s, "OFFSET"))
                .collect::<Result<Vec<f64>>>()?;
            if values.len() != 3 {
                return Err(Error::Parse(format!(
                    "OFFSET has {} values, expected 3",
                    values.len()
                )));
            }
            let offset = Position::new(values[0], values[1], values[2]);
            if let Some(joint) = joints.last_mut() {
                if parsing_endsite {
                    joint.endsite = Some(Endsite { offset });
                    joint.is_leaf = true;
                    parsing_endsite = false;
                } else {
                    joint.offset = offset;
                }
            }
        } else if line.starts_with("CHANNELS") {
            //// Parse channels; each recognized channel claims the next motion-row column
            let captures = re_channels
                .captures(line)
                .ok_or_else(|| Error::Parse(format!("channel names not found in {line:?}")))?;
            let declared = captures
                .get(1)
                .map(|m| m.as_str())
                .unwrap_or_default()
                .parse::<usize>()
                .map_err(|_| Error::Parse(format!("invalid channel count in {line:?}")))?;
            let channel_names = captures
                .get(2)
                .map(|m| m.as_str())
                .unwrap_or_default()
                .split_whitespace()
                .collect::<Vec<&str>>();
            if channel_names.len() != declared {
                return Err(Error::Parse(format!(
                    "CHANNELS declares {declared} channels but names {}",
                    channel_names.len()
                )));
            }
            if let Some(joint) = joints.last_mut() {
                for channel_name in channel_names {
                    let channel = Channel::from_name(channel_name).ok_or_else(|| {
                        Error::Parse(format!("unknown channel name {channel_name:?}"))
                    })?;
                    joint.channels.push((channel, channels_index));
                    channels_index += 1;
                }
            }
        } else if line.starts_with("Frames:") {
            num_frames = line
                .split_whitespace()
                .nth(1)
                .ok_or_else(|| Error::Parse("frame count not found after \"Frames:\"".into()))?
                .parse::<usize>()
                .map_err(|_| Error::Parse("invalid frame count".into()))?;
        } else if line.starts_with("Frame Time:") {
            let value = line
                .split_whitespace()
                .nth(2)
                .ok_or_else(|| Error::Parse("frame time not found after \"Frame Time:\"".into()))?;
            frame_time = parse_f64(value, "Frame Time")?;
            if frame_time <= 0.0 {
                return Err(Error::Parse(format!("non-positive frame time {frame_time}")));
            }
            break; // jump to parsing Motion
        }
    }

    if joints.is_empty() {
        return Err(Error::Parse("hierarchy declares no joints".into()));
    }
    let fps = (1.0 / frame_time) as u32;

    /////////////////////////////////// PARSING MOTION ///////////////////////////////////

    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(num_frames);
    for line in it {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if rows.len() == num_frames {
            break; // surplus rows beyond the declared frame count
        }
        let row = line
            .split_whitespace()
            .map(|s| parse_f64(s, "motion data"))
            .collect::<Result<Vec<f64>>>()?;
        if row.len() != channels_index {
            return Err(Error::Parse(format!(
                "motion row {} has {} values, skeleton declares {} channels",
                rows.len(),
                row.len(),
                channels_index
            )));
        }
        rows.push(row);
    }
    if rows.len() < num_frames {
        return Err(Error::Parse(format!(
            "motion data ends after {} of {} declared frames",
            rows.len(),
            num_frames
        )));
    }

    let metadata = BvhMetadata {
        joints,
        num_frames,
        frame_time,
        fps,
    };
    Ok((metadata, MotionData { rows }))
}

//////////////////////////////////////////////////////////////// PUBLIC ////////////////////////////////////////////////////////////////

/// Load a .bvh file from a file path.
pub fn load_bvh_from_file(file_path: impl AsRef<Path>) -> Result<(BvhMetadata, MotionData)> {
    let contents = std::fs::read_to_string(file_path)?;
    parse_bvh(contents.lines())
}

/// Load a .bvh file from a string.
pub fn load_bvh_from_string(bvh_string: &str) -> Result<(BvhMetadata, MotionData)> {
    parse_bvh(bvh_string.lines())
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::Channel;

    const TWO_JOINT_BVH: &str = "\
HIERARCHY
ROOT Hips
{
\tOFFSET 0.0 0.0 0.0
\tCHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
\tJOINT Spine
\t{
\t\tOFFSET 0.0 5.0 0.0
\t\tCHANNELS 3 Zrotation Xrotation Yrotation
\t\tEnd Site
\t\t{
\t\t\tOFFSET 0.0 2.5 0.0
\t\t}
\t}
}
MOTION
Frames: 2
Frame Time: 0.0333
1 2 3 0 0 0 10 20 30
4 5 6 0 0 0 40 50 60
";

    #[test]
    fn parses_hierarchy_and_motion() {
        let (metadata, motion) = load_bvh_from_string(TWO_JOINT_BVH).unwrap();

        assert_eq!(metadata.joints.len(), 2);
        assert_eq!(metadata.num_frames, 2);
        assert_eq!(metadata.frame_time, 0.0333);
        assert_eq!(metadata.fps, 30);

        let hips = &metadata.joints[0];
        assert_eq!(hips.name, "Hips");
        assert_eq!(hips.parent_index, -1);
        assert_eq!(hips.depth, 0);
        assert_eq!(hips.children, vec![1]);
        assert_eq!(hips.channels.len(), 6);
        assert_eq!(hips.channel_column(Channel::Xposition), Some(0));
        assert_eq!(hips.channel_column(Channel::Yrotation), Some(5));

        let spine = &metadata.joints[1];
        assert_eq!(spine.name, "Spine");
        assert_eq!(spine.parent_index, 0);
        assert_eq!(spine.depth, 1);
        assert!(spine.is_leaf);
        assert_eq!(spine.offset.y, 5.0);
        assert_eq!(spine.endsite.as_ref().map(|e| e.offset.y), Some(2.5));
        assert_eq!(spine.channel_column(Channel::Xrotation), Some(7));

        assert_eq!(motion.rows.len(), 2);
        assert_eq!(motion.value(0, 6), Some(10.0));
        assert_eq!(motion.value(1, 8), Some(60.0));
        assert_eq!(motion.value(2, 0), None);
    }

    #[test]
    fn find_joint_by_name() {
        let (metadata, _) = load_bvh_from_string(TWO_JOINT_BVH).unwrap();
        assert_eq!(metadata.find_joint("Spine").map(|j| j.index), Some(1));
        assert!(metadata.find_joint("Pelvis").is_none());
    }

    #[test]
    fn truncated_file_is_a_parse_error() {
        let truncated = &TWO_JOINT_BVH[..TWO_JOINT_BVH.find("MOTION").unwrap()];
        assert!(matches!(
            load_bvh_from_string(truncated),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn missing_motion_rows_is_a_parse_error() {
        let one_row = TWO_JOINT_BVH.replacen("4 5 6 0 0 0 40 50 60\n", "", 1);
        match load_bvh_from_string(&one_row) {
            Err(Error::Parse(message)) => assert!(message.contains("1 of 2")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn garbled_motion_value_is_a_parse_error() {
        let garbled = TWO_JOINT_BVH.replacen("40 50 60", "40 fifty 60", 1);
        assert!(matches!(
            load_bvh_from_string(&garbled),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn short_motion_row_is_a_parse_error() {
        let short = TWO_JOINT_BVH.replacen("1 2 3 0 0 0 10 20 30", "1 2 3", 1);
        match load_bvh_from_string(&short) {
            Err(Error::Parse(message)) => assert!(message.contains("channels")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_channel_name_is_a_parse_error() {
        let unknown = TWO_JOINT_BVH.replacen("Zrotation Xrotation Yrotation\n\t\tEnd", "Zrotation Wrotation Yrotation\n\t\tEnd", 1);
        assert!(matches!(
            load_bvh_from_string(&unknown),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn surplus_motion_rows_are_ignored() {
        let surplus = format!("{TWO_JOINT_BVH}7 8 9 0 0 0 70 80 90\n");
        let (metadata, motion) = load_bvh_from_string(&surplus).unwrap();
        assert_eq!(metadata.num_frames, 2);
        assert_eq!(motion.rows.len(), 2);
    }
}

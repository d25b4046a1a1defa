use super::pose::KEYPOINT_COUNT;

/// One joint of the SMPL skeleton, named the way the coaching overlay labels it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointSpec {
    pub name: &'static str,
    pub parent: Option<&'static str>,
    pub smpl_index: usize,
}

const fn joint(name: &'static str, parent: Option<&'static str>, smpl_index: usize) -> JointSpec {
    JointSpec {
        name,
        parent,
        smpl_index,
    }
}

pub const SKELETON: [JointSpec; KEYPOINT_COUNT] = [
    joint("jaw", Some("neck"), 15),
    joint("neck", Some("upper chest"), 12),
    joint("upper chest", Some("lower chest"), 9),
    joint("lower chest", Some("abdomen"), 6),
    joint("abdomen", Some("pelvis"), 3),
    joint("pelvis", None, 0),
    joint("left upper chest", Some("upper chest"), 13),
    joint("left shoulder", Some("left upper chest"), 16),
    joint("left elbow", Some("left shoulder"), 18),
    joint("left wrist", Some("left elbow"), 20),
    joint("left palm", Some("left wrist"), 22),
    joint("left hip", Some("pelvis"), 1),
    joint("left knee", Some("left hip"), 4),
    joint("left ankle", Some("left knee"), 7),
    joint("left toe", Some("left ankle"), 10),
    joint("right upper chest", Some("upper chest"), 14),
    joint("right shoulder", Some("right upper chest"), 17),
    joint("right elbow", Some("right shoulder"), 19),
    joint("right wrist", Some("right elbow"), 21),
    joint("right palm", Some("right wrist"), 23),
    joint("right hip", Some("pelvis"), 2),
    joint("right knee", Some("right hip"), 5),
    joint("right ankle", Some("right knee"), 8),
    joint("right toe", Some("right ankle"), 11),
];

/// Looks up a joint by the position it occupies in a keypoint array.
pub fn joint_for_index(smpl_index: usize) -> Option<&'static JointSpec> {
    SKELETON.iter().find(|joint| joint.smpl_index == smpl_index)
}

pub fn joint_name(smpl_index: usize) -> &'static str {
    joint_for_index(smpl_index)
        .map(|joint| joint.name)
        .unwrap_or("unknown")
}

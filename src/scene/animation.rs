//! Keyframe clip playback.
//!
//! The mixer advances every clip by the frame's elapsed time and writes the
//! sampled values into node local transforms; callers recompute global
//! transforms afterwards. All clips loop over their own duration.

use glam::{Quat, Vec3};

use crate::scene::Model;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValues {
    Translations(Vec<Vec3>),
    Rotations(Vec<Quat>),
    Scales(Vec<Vec3>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Index of the targeted node in the model arena.
    pub node: usize,
    pub times: Vec<f32>,
    pub values: ChannelValues,
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub name: String,
    pub channels: Vec<Channel>,
    pub duration: f32,
}

impl Clip {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|channel| channel.times.last().copied())
            .fold(0.0_f32, f32::max);
        Self {
            name: name.into(),
            channels,
            duration,
        }
    }
}

/// Playback state for all clips of one model. Plays everything, looping.
#[derive(Debug, Default)]
pub struct Mixer {
    clips: Vec<Clip>,
    time: f32,
}

impl Mixer {
    pub fn new(clips: Vec<Clip>) -> Self {
        Self { clips, time: 0.0 }
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Advance playback and write sampled transforms into the model. No-op
    /// when there are no clips.
    pub fn advance(&mut self, model: &mut Model, dt: f32) {
        if self.clips.is_empty() {
            return;
        }
        self.time += dt.max(0.0);
        for clip in &self.clips {
            let t = if clip.duration > 0.0 {
                self.time % clip.duration
            } else {
                0.0
            };
            for channel in &clip.channels {
                let Some(node) = model.nodes.get_mut(channel.node) else {
                    continue;
                };
                let (a, b, alpha) = keyframe_span(&channel.times, t);
                let alpha = match channel.interpolation {
                    Interpolation::Linear => alpha,
                    Interpolation::Step => 0.0,
                };
                match &channel.values {
                    ChannelValues::Translations(values) => {
                        if let Some(value) = sample_vec3(values, a, b, alpha) {
                            node.local.translation = value;
                        }
                    }
                    ChannelValues::Rotations(values) => {
                        if let Some(value) = sample_quat(values, a, b, alpha) {
                            node.local.rotation = value;
                        }
                    }
                    ChannelValues::Scales(values) => {
                        if let Some(value) = sample_vec3(values, a, b, alpha) {
                            node.local.scale = value;
                        }
                    }
                }
            }
        }
    }
}

/// Surrounding keyframe indices and the interpolation factor for time `t`.
fn keyframe_span(times: &[f32], t: f32) -> (usize, usize, f32) {
    if times.is_empty() {
        return (0, 0, 0.0);
    }
    if t <= times[0] {
        return (0, 0, 0.0);
    }
    let last = times.len() - 1;
    if t >= times[last] {
        return (last, last, 0.0);
    }
    let next = times.partition_point(|&time| time <= t);
    let prev = next - 1;
    let span = times[next] - times[prev];
    let alpha = if span > 0.0 { (t - times[prev]) / span } else { 0.0 };
    (prev, next, alpha)
}

fn sample_vec3(values: &[Vec3], a: usize, b: usize, alpha: f32) -> Option<Vec3> {
    let va = *values.get(a)?;
    let vb = *values.get(b)?;
    Some(va.lerp(vb, alpha))
}

fn sample_quat(values: &[Quat], a: usize, b: usize, alpha: f32) -> Option<Quat> {
    let va = *values.get(a)?;
    let vb = *values.get(b)?;
    Some(va.slerp(vb, alpha).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Node, NodeKind};

    fn model_with_node() -> Model {
        let mut model = Model {
            nodes: vec![Node::new("Animated", NodeKind::Group)],
            roots: vec![0],
            clips: Vec::new(),
        };
        model.update_global_transforms();
        model
    }

    fn translation_clip(interpolation: Interpolation) -> Clip {
        Clip::new(
            "move",
            vec![Channel {
                node: 0,
                times: vec![0.0, 1.0],
                values: ChannelValues::Translations(vec![
                    Vec3::ZERO,
                    Vec3::new(2.0, 0.0, 0.0),
                ]),
                interpolation,
            }],
        )
    }

    #[test]
    fn linear_channel_interpolates_midpoint() {
        let mut model = model_with_node();
        let mut mixer = Mixer::new(vec![translation_clip(Interpolation::Linear)]);
        mixer.advance(&mut model, 0.5);
        assert!((model.nodes[0].local.translation.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn step_channel_holds_previous_key() {
        let mut model = model_with_node();
        let mut mixer = Mixer::new(vec![translation_clip(Interpolation::Step)]);
        mixer.advance(&mut model, 0.5);
        assert_eq!(model.nodes[0].local.translation.x, 0.0);
    }

    #[test]
    fn playback_loops_over_duration() {
        let mut model = model_with_node();
        let mut mixer = Mixer::new(vec![translation_clip(Interpolation::Linear)]);
        mixer.advance(&mut model, 1.25);
        assert!((model.nodes[0].local.translation.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_node_index_is_skipped() {
        let mut model = model_with_node();
        let mut clip = translation_clip(Interpolation::Linear);
        clip.channels[0].node = 42;
        let mut mixer = Mixer::new(vec![clip]);
        mixer.advance(&mut model, 0.5);
        assert_eq!(model.nodes[0].local.translation, Vec3::ZERO);
    }

    #[test]
    fn empty_mixer_is_a_no_op() {
        let mut model = model_with_node();
        let mut mixer = Mixer::default();
        mixer.advance(&mut model, 1.0);
        assert_eq!(model.nodes[0].local.translation, Vec3::ZERO);
    }

    #[test]
    fn span_lookup_clamps_to_ends() {
        let times = [0.0, 1.0, 2.0];
        assert_eq!(keyframe_span(&times, -1.0), (0, 0, 0.0));
        assert_eq!(keyframe_span(&times, 5.0), (2, 2, 0.0));
        let (a, b, alpha) = keyframe_span(&times, 1.5);
        assert_eq!((a, b), (1, 2));
        assert!((alpha - 0.5).abs() < 1e-6);
    }
}

//! Sampling of FBX animation curves onto a shared time axis.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use crate::document::{AnimationCurve, RotationOrder};
use crate::scene::{QuatKey, VectorKey};

use super::ticks_to_seconds;
use super::transform_chain::euler_to_quat;

/// Keys outside the stack's range by more than this are dropped.
const KEY_WINDOW_MARGIN: i64 = 10_000;

/// Curves of one curve node keyed by channel name.
pub type CurveMap<'a> = BTreeMap<String, &'a AnimationCurve>;

/// Keys of one axis of a curve node.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeList {
    pub times: Vec<i64>,
    pub values: Vec<f32>,
    pub axis: usize,
}

fn axis_of(channel: &str) -> Option<usize> {
    match channel {
        "d|X" => Some(0),
        "d|Y" => Some(1),
        "d|Z" => Some(2),
        _ => None,
    }
}

struct Window {
    start: i64,
    stop: i64,
}

impl Window {
    fn new(start: i64, stop: i64) -> Self {
        Self {
            start: start.saturating_sub(KEY_WINDOW_MARGIN),
            stop: stop.saturating_add(KEY_WINDOW_MARGIN),
        }
    }

    fn contains(&self, time: i64) -> bool {
        time >= self.start && time <= self.stop
    }
}

/// Per-axis key lists of all curves in `nodes`, limited to the stack's time range.
pub fn keyframe_list(nodes: &[&CurveMap], start: i64, stop: i64) -> Vec<KeyframeList> {
    let window = Window::new(start, stop);
    let mut out = vec![];
    for curves in nodes {
        for (channel, curve) in curves.iter() {
            let Some(axis) = axis_of(channel) else {
                log::warn!("ignoring animation curve, did not recognize target component {channel}");
                continue;
            };
            let (times, values) = curve
                .keys()
                .iter()
                .zip(curve.values())
                .filter(|(t, _)| window.contains(**t))
                .map(|(t, v)| (*t, *v))
                .unzip();
            out.push(KeyframeList { times, values, axis });
        }
    }
    out
}

/// Like [`keyframe_list`], but inserts keys so that no two consecutive keys
/// differ by 180 degrees or more, keeping the interpolation on the short arc.
pub fn rotation_keyframe_list(nodes: &[&CurveMap], start: i64, stop: i64) -> Vec<KeyframeList> {
    let window = Window::new(start, stop);
    let mut out = vec![];
    for curves in nodes {
        for (channel, curve) in curves.iter() {
            let Some(axis) = axis_of(channel) else {
                log::warn!("ignoring rotation animation curve, did not recognize target component {channel}");
                continue;
            };
            let keys = curve.keys();
            let values = curve.values();
            if keys.is_empty() {
                continue;
            }

            let (mut times, mut out_values) = (vec![], vec![]);
            if window.contains(keys[0]) {
                times.push(keys[0]);
                out_values.push(values[0]);
            }
            let (mut tp, mut vp) = (keys[0], values[0]);
            for (&tc, &vc) in keys.iter().zip(values).skip(1) {
                while (vc - vp).abs() >= 180.0 {
                    if tc <= tp {
                        break;
                    }
                    let span = (tc - tp) as f64;
                    let step = (span / (vc - vp).abs() as f64 * 179.0).floor();
                    if step <= 0.0 {
                        break;
                    }
                    let tnew = tp + step as i64;
                    let vnew = vp + (vc - vp) * (step / span) as f32;
                    if !window.contains(tnew) {
                        break;
                    }
                    times.push(tnew);
                    out_values.push(vnew);
                    tp = tnew;
                    vp = vnew;
                }
                if window.contains(tc) {
                    times.push(tc);
                    out_values.push(vc);
                }
                tp = tc;
                vp = vc;
            }
            out.push(KeyframeList {
                times,
                values: out_values,
                axis,
            });
        }
    }
    out
}

/// Sorted union of the key times of all inputs.
pub fn key_time_list<'a>(inputs: impl IntoIterator<Item = &'a KeyframeList>) -> Vec<i64> {
    let mut times: Vec<i64> = inputs.into_iter().flat_map(|k| k.times.iter().copied()).collect();
    times.sort_unstable();
    times.dedup();
    times
}

/// Running bounds of the emitted key times, in frames.
#[derive(Debug, Clone, Copy)]
pub struct TimeRange {
    pub min: f64,
    pub max: f64,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self { min: 1e10, max: -1e10 }
    }
}

impl TimeRange {
    pub fn update(&mut self, time: f64) {
        self.min = self.min.min(time);
        self.max = self.max.max(time);
    }
}

/// Samples every input at each of `times`, linearly interpolating between
/// neighbouring keys. Axes without input keep `default`.
pub fn interpolate_keys(
    times: &[i64],
    inputs: &[KeyframeList],
    default: Vec3,
    fps: f64,
    range: &mut TimeRange,
) -> Vec<VectorKey> {
    let mut next = vec![0usize; inputs.len()];
    let mut out = Vec::with_capacity(times.len());
    for &time in times {
        let mut value = default;
        for (input, next) in inputs.iter().zip(next.iter_mut()) {
            let count = input.times.len();
            if count == 0 {
                continue;
            }
            if *next < count && input.times[*next] == time {
                *next += 1;
            }
            let id0 = next.saturating_sub(1);
            let id1 = (*next).min(count - 1);
            let (ta, tb) = (input.times[id0], input.times[id1]);
            let factor = if ta == tb {
                0.0
            } else {
                ((time - ta) as f64 / (tb - ta) as f64) as f32
            };
            let (va, vb) = (input.values[id0], input.values[id1]);
            value[input.axis] = va + (vb - va) * factor;
        }
        let time = ticks_to_seconds(time) * fps;
        range.update(time);
        out.push(VectorKey { time, value });
    }
    out
}

/// Euler keys sampled like [`interpolate_keys`] and converted to quaternions
/// that stay in the same hemisphere as their predecessor.
pub fn interpolate_rotation_keys(
    times: &[i64],
    inputs: &[KeyframeList],
    default: Vec3,
    order: RotationOrder,
    fps: f64,
    range: &mut TimeRange,
) -> Vec<QuatKey> {
    let mut last = Quat::IDENTITY;
    interpolate_keys(times, inputs, default, fps, range)
        .into_iter()
        .map(|key| {
            let mut value = euler_to_quat(order, key.value);
            if value.dot(last) < 0.0 {
                value = -value;
            }
            last = value;
            QuatKey { time: key.time, value }
        })
        .collect()
}

//! Per-channel display adjustments carried in every header.
//!
//! The viewer applies `value * gain + bias` per channel for display; the
//! client only stores and transmits the factors.

use bitflags::bitflags;

/// Number of adjustable channels (R, G, B, A).
pub const CHANNEL_COUNT: usize = 4;

bitflags! {
    /// Auxiliary viewer flags sent in the header.
    ///
    /// Undefined bits are kept as-is so newer viewers can receive them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AuxFlags: u32 {
        /// Ask the viewer to pick gain and bias from the image range.
        const AUTO_GAIN_BIAS = 0x01;
    }
}

/// Color channel addressed by an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red = 0,
    Green = 1,
    Blue = 2,
    Alpha = 3,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] =
        [Channel::Red, Channel::Green, Channel::Blue, Channel::Alpha];

    /// Slot index of this channel.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Channel for a slot index, `None` outside `0..4`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Gain/bias per channel plus auxiliary flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelAdjustments {
    gain: [f32; CHANNEL_COUNT],
    bias: [f32; CHANNEL_COUNT],
    flags: AuxFlags,
}

impl Default for ChannelAdjustments {
    fn default() -> Self {
        Self {
            gain: [1.0; CHANNEL_COUNT],
            bias: [0.0; CHANNEL_COUNT],
            flags: AuxFlags::empty(),
        }
    }
}

impl ChannelAdjustments {
    /// Set the gain of slot `channel`. Indices outside `0..4` are ignored.
    pub fn set_gain(&mut self, channel: usize, value: f32) {
        if let Some(slot) = self.gain.get_mut(channel) {
            *slot = value;
        }
    }

    /// Set the bias of slot `channel`. Indices outside `0..4` are ignored.
    pub fn set_bias(&mut self, channel: usize, value: f32) {
        if let Some(slot) = self.bias.get_mut(channel) {
            *slot = value;
        }
    }

    pub fn set_channel_gain(&mut self, channel: Channel, value: f32) {
        self.gain[channel.index()] = value;
    }

    pub fn set_channel_bias(&mut self, channel: Channel, value: f32) {
        self.bias[channel.index()] = value;
    }

    /// Replace the auxiliary flags.
    pub fn set_flags(&mut self, flags: AuxFlags) {
        self.flags = flags;
    }

    pub fn gain(&self, channel: usize) -> Option<f32> {
        self.gain.get(channel).copied()
    }

    pub fn bias(&self, channel: usize) -> Option<f32> {
        self.bias.get(channel).copied()
    }

    pub fn gains(&self) -> [f32; CHANNEL_COUNT] {
        self.gain
    }

    pub fn biases(&self) -> [f32; CHANNEL_COUNT] {
        self.bias
    }

    pub fn flags(&self) -> AuxFlags {
        self.flags
    }
}

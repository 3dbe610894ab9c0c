//! Table bindings for `schema/mnist_prot.fbs`.
//!
//! Laid out like `flatc --rust` output: each table wraps a
//! `flatbuffers::Table` and is only ever reached through `flatbuffers::root`,
//! which verifies the whole buffer before the first accessor runs.

use flatbuffers::{
    FlatBufferBuilder, Follow, ForwardsUOffset, InvalidFlatbuffer, Table, VOffsetT, Vector,
    Verifiable, Verifier, WIPOffset,
};

#[derive(Clone, Copy)]
pub struct Stats<'a> {
    tab: Table<'a>,
}

impl<'a> Follow<'a> for Stats<'a> {
    type Inner = Stats<'a>;

    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        // SAFETY: the caller guarantees a verified table at `loc`.
        Self {
            tab: unsafe { Table::new(buf, loc) },
        }
    }
}

impl Stats<'_> {
    pub const VT_VERSION: VOffsetT = 4;
    pub const VT_FREQ: VOffsetT = 6;
    pub const VT_MODE: VOffsetT = 8;

    pub fn version(&self) -> u8 {
        // SAFETY: verified as `u8` by `run_verifier`.
        unsafe { self.tab.get::<u8>(Self::VT_VERSION, Some(0)) }.unwrap_or(0)
    }

    pub fn freq(&self) -> u32 {
        // SAFETY: verified as `u32` by `run_verifier`.
        unsafe { self.tab.get::<u32>(Self::VT_FREQ, Some(0)) }.unwrap_or(0)
    }

    pub fn mode(&self) -> i8 {
        // SAFETY: verified as `i8` by `run_verifier`.
        unsafe { self.tab.get::<i8>(Self::VT_MODE, Some(0)) }.unwrap_or(0)
    }
}

impl Verifiable for Stats<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<u8>("version", Self::VT_VERSION, false)?
            .visit_field::<u32>("freq", Self::VT_FREQ, false)?
            .visit_field::<i8>("mode", Self::VT_MODE, false)?
            .finish();
        Ok(())
    }
}

#[derive(Clone, Copy)]
pub struct InferenceInput<'a> {
    tab: Table<'a>,
}

impl<'a> Follow<'a> for InferenceInput<'a> {
    type Inner = InferenceInput<'a>;

    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        // SAFETY: the caller guarantees a verified table at `loc`.
        Self {
            tab: unsafe { Table::new(buf, loc) },
        }
    }
}

impl<'a> InferenceInput<'a> {
    pub const VT_DIGIT: VOffsetT = 4;

    pub fn digit(&self) -> Option<Vector<'a, f32>> {
        // SAFETY: verified as a vector of `f32` by `run_verifier`.
        unsafe {
            self.tab
                .get::<ForwardsUOffset<Vector<'a, f32>>>(Self::VT_DIGIT, None)
        }
    }
}

impl Verifiable for InferenceInput<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, f32>>>("digit", Self::VT_DIGIT, false)?
            .finish();
        Ok(())
    }
}

#[derive(Clone, Copy)]
pub struct InferenceOutput<'a> {
    tab: Table<'a>,
}

impl<'a> Follow<'a> for InferenceOutput<'a> {
    type Inner = InferenceOutput<'a>;

    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        // SAFETY: the caller guarantees a verified table at `loc`.
        Self {
            tab: unsafe { Table::new(buf, loc) },
        }
    }
}

impl<'a> InferenceOutput<'a> {
    pub const VT_OUTPUT_F: VOffsetT = 4;
    pub const VT_OUTPUT_N: VOffsetT = 6;
    pub const VT_TIMER_MS: VOffsetT = 8;

    pub fn output_f(&self) -> Option<Vector<'a, f32>> {
        // SAFETY: verified as a vector of `f32` by `run_verifier`.
        unsafe {
            self.tab
                .get::<ForwardsUOffset<Vector<'a, f32>>>(Self::VT_OUTPUT_F, None)
        }
    }

    pub fn output_n(&self) -> u8 {
        // SAFETY: verified as `u8` by `run_verifier`.
        unsafe { self.tab.get::<u8>(Self::VT_OUTPUT_N, Some(0)) }.unwrap_or(0)
    }

    pub fn timer_ms(&self) -> f32 {
        // SAFETY: verified as `f32` by `run_verifier`.
        unsafe { self.tab.get::<f32>(Self::VT_TIMER_MS, Some(0.0)) }.unwrap_or(0.0)
    }
}

impl Verifiable for InferenceOutput<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, f32>>>("output_f", Self::VT_OUTPUT_F, false)?
            .visit_field::<u8>("output_n", Self::VT_OUTPUT_N, false)?
            .visit_field::<f32>("timer_ms", Self::VT_TIMER_MS, false)?
            .finish();
        Ok(())
    }
}

/// The root table of every message.
#[derive(Clone, Copy)]
pub struct Commands<'a> {
    tab: Table<'a>,
}

impl<'a> Follow<'a> for Commands<'a> {
    type Inner = Commands<'a>;

    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        // SAFETY: the caller guarantees a verified table at `loc`.
        Self {
            tab: unsafe { Table::new(buf, loc) },
        }
    }
}

impl<'a> Commands<'a> {
    pub const VT_CMD: VOffsetT = 4;
    pub const VT_STATS: VOffsetT = 6;
    pub const VT_INPUT: VOffsetT = 8;
    pub const VT_OUPUT: VOffsetT = 10;

    /// The raw command tag, `0` when absent.
    pub fn cmd(&self) -> i8 {
        // SAFETY: verified as `i8` by `run_verifier`.
        unsafe { self.tab.get::<i8>(Self::VT_CMD, Some(0)) }.unwrap_or(0)
    }

    pub fn stats(&self) -> Option<Stats<'a>> {
        // SAFETY: verified as a `Stats` table by `run_verifier`.
        unsafe { self.tab.get::<ForwardsUOffset<Stats<'a>>>(Self::VT_STATS, None) }
    }

    pub fn input(&self) -> Option<InferenceInput<'a>> {
        // SAFETY: verified as an `InferenceInput` table by `run_verifier`.
        unsafe {
            self.tab
                .get::<ForwardsUOffset<InferenceInput<'a>>>(Self::VT_INPUT, None)
        }
    }

    pub fn ouput(&self) -> Option<InferenceOutput<'a>> {
        // SAFETY: verified as an `InferenceOutput` table by `run_verifier`.
        unsafe {
            self.tab
                .get::<ForwardsUOffset<InferenceOutput<'a>>>(Self::VT_OUPUT, None)
        }
    }
}

impl Verifiable for Commands<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i8>("cmd", Self::VT_CMD, false)?
            .visit_field::<ForwardsUOffset<Stats<'_>>>("stats", Self::VT_STATS, false)?
            .visit_field::<ForwardsUOffset<InferenceInput<'_>>>("input", Self::VT_INPUT, false)?
            .visit_field::<ForwardsUOffset<InferenceOutput<'_>>>("ouput", Self::VT_OUPUT, false)?
            .finish();
        Ok(())
    }
}

/// Verifies `buf` and returns its root `Commands` table.
pub fn root_as_commands(buf: &[u8]) -> Result<Commands<'_>, InvalidFlatbuffer> {
    flatbuffers::root::<Commands>(buf)
}

pub fn create_stats<'fbb>(
    fbb: &mut FlatBufferBuilder<'fbb>,
    version: u8,
    freq: u32,
    mode: i8,
) -> WIPOffset<Stats<'fbb>> {
    let start = fbb.start_table();
    fbb.push_slot::<u32>(Stats::VT_FREQ, freq, 0);
    fbb.push_slot::<u8>(Stats::VT_VERSION, version, 0);
    fbb.push_slot::<i8>(Stats::VT_MODE, mode, 0);
    WIPOffset::new(fbb.end_table(start).value())
}

pub fn create_inference_input<'fbb>(
    fbb: &mut FlatBufferBuilder<'fbb>,
    digit: &[f32],
) -> WIPOffset<InferenceInput<'fbb>> {
    let digit = fbb.create_vector(digit);
    let start = fbb.start_table();
    fbb.push_slot_always::<WIPOffset<_>>(InferenceInput::VT_DIGIT, digit);
    WIPOffset::new(fbb.end_table(start).value())
}

/// Fields go in as the peers add them: timer, count, then the scores.
pub fn create_inference_output<'fbb>(
    fbb: &mut FlatBufferBuilder<'fbb>,
    output_f: &[f32],
    timer_ms: f32,
) -> WIPOffset<InferenceOutput<'fbb>> {
    let scores = fbb.create_vector(output_f);
    let start = fbb.start_table();
    fbb.push_slot::<f32>(InferenceOutput::VT_TIMER_MS, timer_ms, 0.0);
    fbb.push_slot::<u8>(InferenceOutput::VT_OUTPUT_N, output_f.len() as u8, 0);
    fbb.push_slot_always::<WIPOffset<_>>(InferenceOutput::VT_OUTPUT_F, scores);
    WIPOffset::new(fbb.end_table(start).value())
}

/// A root `Commands` table referencing at most one payload table.
pub enum Payload<'fbb> {
    None,
    Stats(WIPOffset<Stats<'fbb>>),
    Input(WIPOffset<InferenceInput<'fbb>>),
    Output(WIPOffset<InferenceOutput<'fbb>>),
}

pub fn finish_commands<'fbb>(fbb: &mut FlatBufferBuilder<'fbb>, cmd: i8, payload: Payload<'fbb>) {
    let start = fbb.start_table();
    fbb.push_slot::<i8>(Commands::VT_CMD, cmd, 0);
    match payload {
        Payload::None => {}
        Payload::Stats(off) => fbb.push_slot_always::<WIPOffset<_>>(Commands::VT_STATS, off),
        Payload::Input(off) => fbb.push_slot_always::<WIPOffset<_>>(Commands::VT_INPUT, off),
        Payload::Output(off) => fbb.push_slot_always::<WIPOffset<_>>(Commands::VT_OUPUT, off),
    }
    let root = fbb.end_table(start);
    fbb.finish(root, None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scalars_are_left_out() {
        let mut fbb = FlatBufferBuilder::with_capacity(64);
        let stats = create_stats(&mut fbb, 0, 0, 0);
        finish_commands(&mut fbb, 0, Payload::Stats(stats));

        let root = root_as_commands(fbb.finished_data()).unwrap();
        let stats = root.stats().unwrap();

        assert_eq!(root.cmd(), 0);
        assert_eq!((stats.version(), stats.freq(), stats.mode()), (0, 0, 0));
        assert!(root.input().is_none());
        assert!(root.ouput().is_none());
    }

    #[test]
    fn output_reads_back() {
        let mut fbb = FlatBufferBuilder::with_capacity(128);
        let out = create_inference_output(&mut fbb, &[1.0, 2.0, 3.0], 7.25);
        finish_commands(&mut fbb, 2, Payload::Output(out));

        let root = root_as_commands(fbb.finished_data()).unwrap();
        let out = root.ouput().unwrap();

        assert_eq!(root.cmd(), 2);
        assert_eq!(out.timer_ms(), 7.25);
        assert_eq!(out.output_n(), 3);
        assert_eq!(
            out.output_f().unwrap().iter().collect::<Vec<_>>(),
            vec![1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn empty_buffer_fails_verification() {
        assert!(root_as_commands(&[]).is_err());
    }

    #[test]
    fn root_offset_out_of_bounds_fails_verification() {
        let mut fbb = FlatBufferBuilder::with_capacity(64);
        finish_commands(&mut fbb, 1, Payload::None);
        let mut buf = fbb.finished_data().to_vec();
        buf[..4].copy_from_slice(&1000_u32.to_le_bytes());

        assert!(root_as_commands(&buf).is_err());
    }
}

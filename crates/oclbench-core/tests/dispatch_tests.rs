//! Tests for the dispatch primitives: `execute_kernel` and `execute`.

use oclbench_core::{
    Command, Executor, ExecutorError, KernelArg, KernelSource, NdRange, PerGroupLatency,
    ProfilingCounter, ReferenceBuffer, ReferenceDevice,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn vadd() -> KernelSource {
    KernelSource::new(
        "__kernel void vadd(__global float* a, __global float* b) { }",
        "vadd",
        "-cl-fast-relaxed-math",
    )
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn index_of(journal: &[Command], pred: impl Fn(&Command) -> bool) -> usize {
    journal
        .iter()
        .position(pred)
        .unwrap_or_else(|| panic!("command not found in journal: {journal:?}"))
}

// ── Timing record ────────────────────────────────────────────────────────────

#[test]
fn execute_reports_marker_spans_and_kernel_window() {
    let device = ReferenceDevice::new()
        .with_marker_ns(1_000)
        .with_transfer_ns_per_byte(0.1)
        .with_latency(PerGroupLatency { ms_per_group: 0.01 });
    let mut exec = Executor::new(device);

    let mut a = ReferenceBuffer::zeroed("a", 1000);
    let mut b = ReferenceBuffer::zeroed("b", 1000);
    let range = NdRange::linear(64, 640);

    let time = exec.execute(&vadd(), &range, &mut [&mut a, &mut b]).unwrap();

    // Upload span: one marker plus two 100 ns transfers.
    assert!(approx(time.upload, 0.0012), "upload = {}", time.upload);
    // Ten work-groups at 0.01 ms each.
    assert!(approx(time.launch, 0.1), "launch = {}", time.launch);
    assert!(approx(time.download, 0.0012), "download = {}", time.download);
    assert!(approx(time.total, 0.1054), "total = {}", time.total);
    assert!(time.total >= time.upload + time.launch + time.download);
}

#[test]
fn execute_enqueues_six_markers_and_one_launch() {
    let mut exec = Executor::new(ReferenceDevice::new());
    let mut a = ReferenceBuffer::zeroed("a", 16);

    exec.execute(&vadd(), &NdRange::linear(1, 4), &mut [&mut a]).unwrap();

    let journal = exec.device().journal();
    let markers = journal.iter().filter(|c| matches!(c, Command::Marker { .. })).count();
    assert_eq!(markers, 6);
    assert_eq!(exec.device().launches().len(), 1);
    assert_eq!(a.uploads(), 1);
    assert_eq!(a.downloads(), 1);
}

#[test]
fn execute_recompiles_on_every_call() {
    let mut exec = Executor::new(ReferenceDevice::new());
    let range = NdRange::linear(1, 1);
    for _ in 0..3 {
        exec.execute(&vadd(), &range, &mut []).unwrap();
    }
    let compiles = exec
        .device()
        .journal()
        .iter()
        .filter(|c| matches!(c, Command::Compile { .. }))
        .count();
    assert_eq!(compiles, 3);
}

#[test]
fn precompiled_kernel_is_reused_by_execute_kernel() {
    let mut exec = Executor::new(ReferenceDevice::new());
    let kernel = exec.compile(&vadd()).unwrap();
    let range = NdRange::linear(1, 1);
    exec.execute_kernel(&kernel, &range, &mut []).unwrap();
    exec.execute_kernel(&kernel, &range, &mut []).unwrap();

    let journal = exec.device().journal();
    assert_eq!(journal.iter().filter(|c| matches!(c, Command::Compile { .. })).count(), 1);
    assert_eq!(exec.device().launches().len(), 2);
}

// ── Ordering ─────────────────────────────────────────────────────────────────

#[test]
fn each_argument_is_uploaded_before_it_is_bound() {
    let mut exec = Executor::new(ReferenceDevice::new());
    let mut a = ReferenceBuffer::zeroed("a", 8);
    let mut b = ReferenceBuffer::zeroed("b", 8);
    let mut c = ReferenceBuffer::zeroed("c", 8);

    exec.execute(&vadd(), &NdRange::linear(1, 1), &mut [&mut a, &mut b, &mut c])
        .unwrap();

    let journal = exec.device().journal();
    for (i, label) in ["a", "b", "c"].iter().enumerate() {
        let upload = index_of(&journal, |cmd| {
            matches!(cmd, Command::Upload { arg, .. } if arg == label)
        });
        let bind = index_of(&journal, |cmd| {
            matches!(cmd, Command::Bind { index, arg, .. } if *index == i as u32 && arg == label)
        });
        assert!(upload < bind, "argument {i} bound before upload");
    }
}

#[test]
fn launch_sits_between_uploads_and_downloads() {
    let mut exec = Executor::new(ReferenceDevice::new());
    let mut a = ReferenceBuffer::zeroed("a", 8);
    exec.execute(&vadd(), &NdRange::linear(1, 1), &mut [&mut a]).unwrap();

    let journal = exec.device().journal();
    let upload = index_of(&journal, |c| matches!(c, Command::Upload { .. }));
    let launch = index_of(&journal, |c| matches!(c, Command::Launch { .. }));
    let download = index_of(&journal, |c| matches!(c, Command::Download { .. }));
    assert!(upload < launch && launch < download);
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[test]
fn missing_profiling_is_an_error_not_a_zero() {
    let mut exec = Executor::new(ReferenceDevice::new().without_profiling());
    let err = exec.execute(&vadd(), &NdRange::linear(1, 1), &mut []).unwrap_err();
    assert!(matches!(
        err,
        ExecutorError::Profiling { counter: ProfilingCounter::Submit, .. }
    ));
}

#[test]
fn build_failure_propagates_from_execute() {
    let mut exec = Executor::new(ReferenceDevice::new().with_failing_builds());
    let err = exec.execute(&vadd(), &NdRange::linear(1, 1), &mut []).unwrap_err();
    assert!(matches!(err, ExecutorError::Build { ref name, .. } if name == "vadd"));
}

#[test]
fn zero_work_size_is_rejected() {
    let mut exec = Executor::new(ReferenceDevice::new());
    let err = exec
        .execute(&vadd(), &NdRange::linear(0, 16), &mut [])
        .unwrap_err();
    assert!(matches!(err, ExecutorError::InvalidArgument(_)));
}

/// An argument whose upload always fails.
struct BrokenArg;

impl KernelArg<ReferenceDevice> for BrokenArg {
    fn upload(&mut self, _: &ReferenceDevice) -> oclbench_core::Result<()> {
        Err(ExecutorError::Enqueue("out of device memory".into()))
    }
    fn download(&mut self, _: &ReferenceDevice) -> oclbench_core::Result<()> {
        Ok(())
    }
    fn clear(&mut self) {}
    fn bind(
        &self,
        _: &oclbench_core::reference::ReferenceKernel,
        _: u32,
    ) -> oclbench_core::Result<()> {
        Ok(())
    }
}

#[test]
fn argument_failure_names_the_position() {
    let mut exec = Executor::new(ReferenceDevice::new());
    let mut ok = ReferenceBuffer::zeroed("ok", 4);
    let mut broken = BrokenArg;
    let err = exec
        .execute(&vadd(), &NdRange::linear(1, 1), &mut [&mut ok, &mut broken])
        .unwrap_err();
    match err {
        ExecutorError::Argument { index, op, .. } => {
            assert_eq!(index, 1);
            assert_eq!(op, "upload");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn session_hands_device_back() {
    let exec = Executor::new(ReferenceDevice::new().with_max_work_group_size(128));
    assert_eq!(exec.device_info().max_work_group_size, 128);
    let device = exec.into_device();
    assert!(device.journal().is_empty());
}

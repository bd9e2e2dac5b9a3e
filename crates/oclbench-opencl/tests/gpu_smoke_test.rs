//! Real-hardware tests for the OpenCL backend.
//!
//! Run with `--features opencl-runtime -- --ignored` on a machine with an
//! OpenCL ICD. The device is picked from `OCLBENCH_*` variables.
#![cfg(feature = "opencl-runtime")]

use anyhow::Result;
use oclbench_core::{Evaluation, Executor, KernelArg, KernelSource, NdRange, Timeout};
use oclbench_opencl::{ClDevice, GlobalArg, LocalArg, ValueArg};
use serial_test::serial;

const VADD: &str = r#"
__kernel void vadd(__global const float* a, __global const float* b,
                   __global float* c, int n) {
    int i = get_global_id(0);
    if (i < n) c[i] = a[i] + b[i];
}
"#;

const GUARDED_FILL: &str = r#"
#ifndef WORKGROUP_GUARD
#define WORKGROUP_GUARD
#endif
__kernel void fill(__global int* out, __local int* scratch) {
    WORKGROUP_GUARD
    scratch[get_local_id(0)] = 1;
    barrier(CLK_LOCAL_MEM_FENCE);
    out[get_global_id(0)] = scratch[get_local_id(0)];
}
"#;

fn open() -> Option<Executor<ClDevice>> {
    match ClDevice::from_env() {
        Ok(device) => Some(Executor::new(device)),
        Err(e) => {
            eprintln!("skipped: {e}");
            None
        }
    }
}

#[test]
#[ignore = "requires OpenCL runtime - run with --ignored on GPU machine"]
#[serial]
fn vector_add_executes_and_times() -> Result<()> {
    let Some(mut exec) = open() else { return Ok(()) };
    let n = 4096usize;
    let mut a = GlobalArg::input((0..n).map(|i| i as f32).collect::<Vec<_>>());
    let mut b = GlobalArg::input(vec![1.0f32; n]);
    let mut c = GlobalArg::<f32>::output(n);
    let mut len = ValueArg::new(n as i32);

    let kernel = KernelSource::new(VADD, "vadd", "");
    let time = exec.execute(
        &kernel,
        &NdRange::linear(64, n),
        &mut [&mut a, &mut b, &mut c, &mut len],
    )?;

    assert!(time.launch > 0.0);
    assert!(time.total >= time.launch);
    assert_eq!(c.at(10), Some(11.0));
    Ok(())
}

#[test]
#[ignore = "requires OpenCL runtime - run with --ignored on GPU machine"]
#[serial]
fn evaluate_rejects_work_group_beyond_device_limit() -> Result<()> {
    let Some(mut exec) = open() else { return Ok(()) };
    let max = exec.device_info().max_work_group_size;
    let mut out = GlobalArg::<i32>::output(max * 2);
    let mut scratch = LocalArg::of::<i32>(max * 2);

    let outcome = exec.evaluate(
        &KernelSource::new(GUARDED_FILL, "fill", ""),
        &NdRange::linear(max * 2, max * 2),
        &mut [&mut out, &mut scratch],
        3,
        Timeout::NONE,
    )?;
    assert_eq!(outcome, Evaluation::Rejected);
    Ok(())
}

#[test]
#[ignore = "requires OpenCL runtime - run with --ignored on GPU machine"]
#[serial]
fn evaluate_succeeds_for_small_work_group() -> Result<()> {
    let Some(mut exec) = open() else { return Ok(()) };
    let mut out = GlobalArg::<i32>::output(1024);
    let mut scratch = LocalArg::of::<i32>(16);

    let outcome = exec.evaluate(
        &KernelSource::new(GUARDED_FILL, "fill", ""),
        &NdRange::linear(16, 1024),
        &mut [&mut out, &mut scratch],
        5,
        Timeout::NONE,
    )?;
    assert!(outcome.is_success(), "got {outcome}");
    // The unguarded build writes every group.
    assert_eq!(out.at(0), Some(1));
    assert_eq!(out.at(1023), Some(1));
    Ok(())
}

#[test]
#[ignore = "requires OpenCL runtime - run with --ignored on GPU machine"]
#[serial]
fn clear_releases_device_buffer() -> Result<()> {
    let Some(exec) = open() else { return Ok(()) };
    let mut out = GlobalArg::<i32>::output(64);
    out.upload(exec.device())?;
    out.clear();
    out.clear();
    assert!(out.host().iter().all(|&v| v == 0));
    assert!(format!("{out:?}").contains("resident: false"));
    Ok(())
}
